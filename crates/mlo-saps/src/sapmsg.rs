use core::fmt::Display;

use mlo_core::{MloEntity, Sap, SimTime};

use crate::data::{TrafficDataInd, TrafficDataReq};
use crate::mlme::{MlmeAssocConf, MlmeAssocInd, MlmeDisassocReq, MlmeJoinReq};
use crate::phy::{PhyRxInd, PhyTxReq};

/// Exhaustive list of primitive structs for use in the SapMsg struct
#[derive(Debug)]
pub enum SapMsgInner {
    // PHY-SAP
    PhyTxReq(PhyTxReq),
    PhyRxInd(PhyRxInd),

    // MLME-SAP
    MlmeJoinReq(MlmeJoinReq),
    MlmeAssocInd(MlmeAssocInd),
    MlmeAssocConf(MlmeAssocConf),
    MlmeDisassocReq(MlmeDisassocReq),

    // DATA-SAP
    TrafficDataReq(TrafficDataReq),
    TrafficDataInd(TrafficDataInd),
}

impl Display for SapMsgInner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SapMsgInner::PhyTxReq(_) => write!(f, "PhyTxReq"),
            SapMsgInner::PhyRxInd(_) => write!(f, "PhyRxInd"),
            SapMsgInner::MlmeJoinReq(_) => write!(f, "MlmeJoinReq"),
            SapMsgInner::MlmeAssocInd(_) => write!(f, "MlmeAssocInd"),
            SapMsgInner::MlmeAssocConf(_) => write!(f, "MlmeAssocConf"),
            SapMsgInner::MlmeDisassocReq(_) => write!(f, "MlmeDisassocReq"),
            SapMsgInner::TrafficDataReq(_) => write!(f, "TrafficDataReq"),
            SapMsgInner::TrafficDataInd(_) => write!(f, "TrafficDataInd"),
        }
    }
}

#[derive(Debug)]
pub struct SapMsg {
    pub sap: Sap,
    pub src: MloEntity,
    pub dest: MloEntity,
    /// Virtual time at which the message was created
    pub at: SimTime,

    pub msg: SapMsgInner,
}

impl SapMsg {
    pub fn new(sap: Sap, src: MloEntity, dest: MloEntity, at: SimTime, msg: SapMsgInner) -> Self {
        Self { sap, src, dest, at, msg }
    }

    pub fn get_source(&self) -> &MloEntity {
        &self.src
    }
    pub fn get_dest(&self) -> &MloEntity {
        &self.dest
    }
    pub fn get_sap(&self) -> &Sap {
        &self.sap
    }
}
