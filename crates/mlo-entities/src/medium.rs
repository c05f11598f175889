use mlo_core::{LinkId, MloEntity, OperatingChannel, Sap, SimTime};
use mlo_pdus::frames::Frame;
use mlo_saps::phy::{PhyRxInd, PhyTxReq};
use mlo_saps::{SapMsg, SapMsgInner};

use crate::{MessageQueue, MloEntityTrait};

/// One forwarded PPDU, kept for outside inspection
pub struct TxRecord {
    pub at: SimTime,
    pub src: MloEntity,
    pub link_id: LinkId,
    pub channel: OperatingChannel,
    pub frame: Frame,
    pub corrupted: bool,
}

/// Stand-in for the shared radio medium: forwards every transmitted PPDU to
/// all other devices on the same operating channel, records a transmit log,
/// and can corrupt selected frames once to exercise the retry paths.
///
/// This is the external PHY collaborator of the core, not part of it; the
/// MAC entities never see whether a frame was dropped here.
pub struct Medium {
    devices: Vec<MloEntity>,
    now: SimTime,
    txlog: Vec<TxRecord>,
    /// One-shot rules: drop the first QoS data frame with this sequence number
    corrupt_data_seqs: Vec<u16>,
    /// One-shot rules: drop the nth Block-Ack frame seen (1-based)
    corrupt_ba_nth: Vec<usize>,
    ba_count: usize,
}

impl Medium {
    pub fn new(devices: Vec<MloEntity>) -> Self {
        Self {
            devices,
            now: SimTime::default(),
            txlog: Vec::new(),
            corrupt_data_seqs: Vec::new(),
            corrupt_ba_nth: Vec::new(),
            ba_count: 0,
        }
    }

    /// Drop the next QoS data frame carrying this sequence number
    pub fn corrupt_data_seq_once(&mut self, seq: u16) {
        self.corrupt_data_seqs.push(seq);
    }

    /// Drop the nth Block-Ack frame crossing the medium (1-based)
    pub fn corrupt_nth_block_ack(&mut self, nth: usize) {
        self.corrupt_ba_nth.push(nth);
    }

    pub fn txlog(&self) -> &[TxRecord] {
        &self.txlog
    }

    fn check_corrupt(&mut self, frame: &Frame) -> bool {
        match frame {
            Frame::QosData(data) => {
                if let Some(pos) = self.corrupt_data_seqs.iter().position(|s| *s == data.seq_no) {
                    self.corrupt_data_seqs.remove(pos);
                    return true;
                }
            }
            Frame::BlockAck(_) => {
                self.ba_count += 1;
                if let Some(pos) = self.corrupt_ba_nth.iter().position(|n| *n == self.ba_count) {
                    self.corrupt_ba_nth.remove(pos);
                    return true;
                }
            }
            _ => {}
        }
        false
    }

    fn forward(&mut self, queue: &mut MessageQueue, src: MloEntity, req: PhyTxReq) {
        let corrupted = match Frame::from_bytes(&req.ppdu) {
            Ok(frame) => {
                let corrupted = self.check_corrupt(&frame);
                if corrupted {
                    tracing::info!("CORRUPTED {} from {:?} link {}", frame.type_name(), src, req.link_id);
                }
                self.txlog.push(TxRecord {
                    at: self.now,
                    src,
                    link_id: req.link_id,
                    channel: req.channel,
                    frame,
                    corrupted,
                });
                corrupted
            }
            Err(e) => {
                tracing::warn!("medium saw an unparseable ppdu from {:?}: {:?}", src, e);
                false
            }
        };
        if corrupted {
            return;
        }

        for dev in &self.devices {
            if *dev == src {
                continue;
            }
            queue.push_back(SapMsg {
                sap: Sap::PhySap,
                src: MloEntity::Medium,
                dest: *dev,
                at: self.now,
                msg: SapMsgInner::PhyRxInd(PhyRxInd { channel: req.channel, ppdu: req.ppdu.clone() }),
            });
        }
    }
}

impl MloEntityTrait for Medium {
    fn entity(&self) -> MloEntity {
        MloEntity::Medium
    }

    fn rx_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        let src = message.src;
        match message.msg {
            SapMsgInner::PhyTxReq(req) => {
                self.forward(queue, src, req);
            }
            other => {
                tracing::warn!("unexpected primitive at medium: {}", other);
            }
        }
    }

    fn tick_start(&mut self, _queue: &mut MessageQueue, ts: SimTime) {
        self.now = ts;
    }
}
