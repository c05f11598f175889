use mlo_core::{Mac48, Tid};

/// Request from the harness to an associated MLD: deliver one traffic unit
/// to the destination MLD (or to the broadcast address).
#[derive(Debug)]
pub struct TrafficDataReq {
    pub dst: Mac48,
    pub tid: Tid,
    pub payload: Vec<u8>,
}

/// Indication to the harness: one traffic unit arrived at this device.
#[derive(Debug)]
pub struct TrafficDataInd {
    /// MLD address of the originator
    pub src: Mac48,
    /// Final destination: this device's MLD address or the broadcast address
    pub dst: Mac48,
    pub tid: Tid,
    pub payload: Vec<u8>,
}
