use mlo_config::SharedConfig;
use mlo_core::{LinkId, Mac48, MloEntity, Sap, SimTime};
use mlo_pdus::elements::mle::EmbeddedFrame;
use mlo_pdus::elements::{
    MldParameters, MultiLinkElement, NeighborApInfo, PerStaProfile, ReducedNeighborReport, TbttInfo,
};
use mlo_pdus::frames::mgmt::STATUS_SUCCESS;
use mlo_pdus::frames::{
    AssocRequestBody, AssocResponseBody, BeaconBody, Frame, MgmtHdr, QosDataFrame,
};
use mlo_saps::data::TrafficDataInd;
use mlo_saps::mlme::MlmeAssocInd;
use mlo_saps::phy::PhyTxReq;
use mlo_saps::{SapMsg, SapMsgInner};

use crate::data_plane::DataPlane;
use crate::links::LinkSet;
use crate::peers::MldPeerStore;
use crate::{MessageQueue, MloEntityTrait};

/// MAC entity of the AP-side MLD: advertises the affiliated links in its
/// beacons, answers multi-link association requests, and runs the downlink
/// side of the data plane, including forwarding between its stations.
pub struct ApMac {
    config: SharedConfig,
    now: SimTime,
    links: LinkSet,
    peers: MldPeerStore,
    data: DataPlane,
    next_aid: u16,
}

impl ApMac {
    pub fn new(config: SharedConfig) -> Self {
        let cfg = config.config();
        let links = LinkSet::new(cfg.mld_address, &cfg.links);
        let data = DataPlane::new(cfg.mld_address, true, cfg.nmax_inflight, cfg.ack_timeout_ticks, cfg.rng_seed);
        Self {
            config,
            now: SimTime::default(),
            links,
            peers: Default::default(),
            data,
            next_aid: 1,
        }
    }

    pub fn mld_address(&self) -> Mac48 {
        self.config.config().mld_address
    }

    fn is_multi_link(&self) -> bool {
        self.links.len() > 1
    }

    pub fn links(&self) -> &LinkSet {
        &self.links
    }

    pub fn peers(&self) -> &MldPeerStore {
        &self.peers
    }

    pub fn data_plane(&self) -> &DataPlane {
        &self.data
    }

    fn tx_frame(&self, queue: &mut MessageQueue, link_id: LinkId, frame: &Frame) {
        let link = self.links.get(link_id).expect("transmit on unknown link");
        queue.push_back(SapMsg {
            sap: Sap::PhySap,
            src: MloEntity::Ap,
            dest: MloEntity::Medium,
            at: self.now,
            msg: SapMsgInner::PhyTxReq(PhyTxReq {
                link_id,
                channel: link.channel,
                ppdu: frame.to_bytes(),
            }),
        });
    }

    /// Beacon for one link. Every other affiliated link is reported in its
    /// own Neighbor AP Info field; single-link APs advertise neither the
    /// report nor the Multi-Link element.
    fn build_beacon(&self, link_id: LinkId) -> Frame {
        let cfg = self.config.config();
        let link = self.links.get(link_id).expect("beacon on unknown link");

        let (rnr, mle) = if self.is_multi_link() {
            let nbr_ap_infos = self
                .links
                .iter()
                .filter(|other| other.enabled && other.id != link_id)
                .map(|other| NeighborApInfo {
                    op_class: other.channel.op_class(),
                    channel: other.channel.number,
                    tbtts: vec![TbttInfo {
                        tbtt_offset: 0,
                        bssid: other.address,
                        mld_params: Some(MldParameters {
                            ap_mld_id: 0,
                            link_id: other.id,
                            bss_params_change_count: 0,
                        }),
                    }],
                })
                .collect();
            let mle = MultiLinkElement {
                mld_mac_address: Some(self.mld_address()),
                link_id_info: Some(link_id),
                profiles: vec![],
            };
            (Some(ReducedNeighborReport { nbr_ap_infos }), Some(mle))
        } else {
            (None, None)
        };

        Frame::Beacon {
            hdr: MgmtHdr { addr1: Mac48::BROADCAST, addr2: link.address, addr3: link.address },
            body: BeaconBody { ssid: cfg.ssid.clone(), rnr, mle },
        }
    }

    fn rx_ppdu(&mut self, queue: &mut MessageQueue, channel: mlo_core::OperatingChannel, ppdu: &[u8]) {
        let Some(link_id) = self.links.enabled_link_on(&channel).map(|l| l.id) else {
            return;
        };
        let link_addr = self.links.address_of(link_id).unwrap();

        let frame = match Frame::from_bytes(ppdu) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("undecodable frame on link {}: {:?}", link_id, e);
                return;
            }
        };

        match frame {
            Frame::AssocRequest { hdr, body } if hdr.addr1 == link_addr => {
                self.handle_assoc_request(queue, link_id, hdr, body);
            }
            Frame::QosData(data) if data.addr1 == link_addr => {
                self.handle_data(queue, link_id, data);
            }
            Frame::BlockAck(ba) if ba.addr1 == link_addr => {
                self.data.rx_block_ack(&ba, link_id, &self.peers);
            }
            Frame::Disassoc { hdr, body } if hdr.addr1 == link_addr => {
                let peer_mld = self.peers.resolve(hdr.addr2);
                tracing::info!("<- Disassoc from {} (reason {})", peer_mld, body.reason_code);
                self.teardown_peer(peer_mld);
            }
            other => {
                tracing::trace!("ignoring {} on link {}", other.type_name(), link_id);
            }
        }
    }

    fn handle_assoc_request(
        &mut self,
        queue: &mut MessageQueue,
        link_id: LinkId,
        hdr: MgmtHdr,
        body: AssocRequestBody,
    ) {
        let cfg = self.config.config();
        if body.ssid != cfg.ssid {
            tracing::debug!("assoc request for foreign ssid {:?}, ignoring", body.ssid);
            return;
        }

        let sta_exchange_addr = hdr.addr2;
        let multi_both = self.is_multi_link() && body.mle.is_some();
        let sta_mld = body
            .mle
            .as_ref()
            .and_then(|mle| mle.mld_mac_address)
            .unwrap_or(sta_exchange_addr);

        tracing::info!("<- AssocRequest from {} on link {}", sta_mld, link_id);

        // Validate each requested additional link against the own inventory.
        // A bad profile downgrades that one link, never the whole exchange.
        let mut accepted: Vec<(LinkId, Mac48)> = Vec::new();
        if multi_both {
            for profile in &body.mle.as_ref().unwrap().profiles {
                if profile.link_id == link_id {
                    tracing::warn!("profile repeats the exchange link {}, rejecting", link_id);
                    continue;
                }
                if self.links.get(profile.link_id).map(|l| l.enabled) != Some(true) {
                    tracing::warn!("profile requests unknown link {}, rejecting", profile.link_id);
                    continue;
                }
                let Some(sta_mac) = profile.sta_mac else {
                    tracing::warn!("profile for link {} lacks a STA address, rejecting", profile.link_id);
                    continue;
                };
                if !profile.has_assoc_request() {
                    tracing::warn!("profile for link {} lacks the embedded request, rejecting", profile.link_id);
                    continue;
                }
                accepted.push((profile.link_id, sta_mac));
            }
        }

        // Record the pair symmetrically: exchange link first
        self.peers.bind_link(sta_mld, link_id, sta_exchange_addr);
        for (ap_link, sta_mac) in &accepted {
            self.peers.bind_link(sta_mld, *ap_link, *sta_mac);
        }

        let aid = self.next_aid;
        self.next_aid += 1;
        self.peers.set_aid(sta_mld, aid);
        self.config.state_write().assoc_count += 1;

        let mle = if multi_both {
            let sub_response = AssocResponseBody { status_code: STATUS_SUCCESS, aid, mle: None };
            Some(MultiLinkElement {
                mld_mac_address: Some(self.mld_address()),
                link_id_info: Some(link_id),
                profiles: accepted
                    .iter()
                    .map(|(ap_link, _)| PerStaProfile {
                        link_id: *ap_link,
                        sta_mac: Some(self.links.address_of(*ap_link).unwrap()),
                        embedded: Some(EmbeddedFrame::AssocResponse(sub_response.to_bytes())),
                    })
                    .collect(),
            })
        } else {
            None
        };

        let link_addr = self.links.address_of(link_id).unwrap();
        let response = Frame::AssocResponse {
            hdr: MgmtHdr { addr1: sta_exchange_addr, addr2: link_addr, addr3: link_addr },
            body: AssocResponseBody { status_code: STATUS_SUCCESS, aid, mle },
        };
        tracing::info!("-> AssocResponse aid={} ({} links)", aid, accepted.len() + 1);
        self.tx_frame(queue, link_id, &response);

        queue.push_back(SapMsg {
            sap: Sap::MlmeSap,
            src: MloEntity::Ap,
            dest: MloEntity::Harness,
            at: self.now,
            msg: SapMsgInner::MlmeAssocInd(MlmeAssocInd { aid, sta_mld_address: sta_mld }),
        });
    }

    fn handle_data(&mut self, queue: &mut MessageQueue, link_id: LinkId, frame: QosDataFrame) {
        let is_new = self.data.rx_data(&frame, link_id, &self.peers);
        if !is_new {
            return;
        }

        let src_mld = self.peers.resolve(frame.addr2);
        let final_dst = frame.addr3;

        if final_dst == self.mld_address() || final_dst.is_group() {
            self.deliver_up(queue, src_mld, final_dst, frame.tid, frame.payload.clone());
        }

        // Distribution-system side: re-originate toward the final receiver
        if final_dst.is_group() {
            for (out_link, out_frame) in self.data.broadcast_frames(&self.links, frame.tid, src_mld, &frame.payload) {
                self.tx_frame(queue, out_link, &Frame::QosData(out_frame));
            }
        } else if final_dst != self.mld_address() {
            if self.peers.is_associated(final_dst) {
                tracing::debug!("forwarding unit from {} to {}", src_mld, final_dst);
                self.data
                    .enqueue(final_dst, frame.tid, final_dst, src_mld, frame.payload, self.now);
            } else {
                tracing::warn!("dropping unit for unassociated destination {}", final_dst);
            }
        }
    }

    fn deliver_up(&self, queue: &mut MessageQueue, src: Mac48, dst: Mac48, tid: u8, payload: Vec<u8>) {
        queue.push_back(SapMsg {
            sap: Sap::DataSap,
            src: MloEntity::Ap,
            dest: MloEntity::Harness,
            at: self.now,
            msg: SapMsgInner::TrafficDataInd(TrafficDataInd { src, dst, tid, payload }),
        });
    }

    fn handle_traffic_req(&mut self, queue: &mut MessageQueue, dst: Mac48, tid: u8, payload: Vec<u8>) {
        if dst.is_group() {
            for (link_id, frame) in self.data.broadcast_frames(&self.links, tid, self.mld_address(), &payload) {
                self.tx_frame(queue, link_id, &Frame::QosData(frame));
            }
            return;
        }
        if !self.peers.is_associated(dst) {
            tracing::warn!("traffic for unassociated peer {}, dropping", dst);
            return;
        }
        self.data.enqueue(dst, tid, dst, self.mld_address(), payload, self.now);
    }

    fn teardown_peer(&mut self, peer_mld: Mac48) {
        if self.peers.remove_peer(peer_mld) {
            self.data.teardown_peer(peer_mld);
            let mut state = self.config.state_write();
            state.assoc_count = state.assoc_count.saturating_sub(1);
        }
    }
}

impl MloEntityTrait for ApMac {
    fn entity(&self) -> MloEntity {
        MloEntity::Ap
    }

    fn rx_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        match message.msg {
            SapMsgInner::PhyRxInd(ind) => {
                self.rx_ppdu(queue, ind.channel, &ind.ppdu);
            }
            SapMsgInner::TrafficDataReq(req) => {
                self.handle_traffic_req(queue, req.dst, req.tid, req.payload);
            }
            other => {
                tracing::warn!("unexpected primitive at AP MAC: {}", other);
            }
        }
    }

    fn tick_start(&mut self, queue: &mut MessageQueue, ts: SimTime) {
        self.now = ts;
        self.data.check_timeouts(ts);

        if ts.tick % self.config.config().beacon_period_ticks == 0 {
            let beacon_links: Vec<LinkId> =
                self.links.iter().filter(|l| l.enabled).map(|l| l.id).collect();
            for link_id in beacon_links {
                let beacon = self.build_beacon(link_id);
                self.tx_frame(queue, link_id, &beacon);
            }
        }
    }

    fn tick_end(&mut self, queue: &mut MessageQueue, ts: SimTime) -> bool {
        let mut busy = false;
        for (link_id, frame) in self.data.pull_data_frames(ts, &self.links, &self.peers) {
            self.tx_frame(queue, link_id, &Frame::QosData(frame));
            busy = true;
        }
        for (link_id, ba) in self.data.pull_ack_frames(&self.links) {
            self.tx_frame(queue, link_id, &Frame::BlockAck(ba));
            busy = true;
        }
        busy
    }
}
