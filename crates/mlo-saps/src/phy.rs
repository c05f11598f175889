use mlo_core::{LinkId, OperatingChannel};

/// Request from a MAC to the medium: transmit one encoded PPDU on the
/// operating channel of the given link.
#[derive(Debug)]
pub struct PhyTxReq {
    /// Link of the transmitting MLD the PPDU leaves on
    pub link_id: LinkId,
    pub channel: OperatingChannel,
    pub ppdu: Vec<u8>,
}

/// Indication from the medium: one PPDU was transmitted on the given channel.
/// Every device decides for itself whether one of its enabled links is tuned
/// to that channel.
#[derive(Debug)]
pub struct PhyRxInd {
    pub channel: OperatingChannel,
    pub ppdu: Vec<u8>,
}
