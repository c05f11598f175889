use mlo_config::SharedConfig;
use mlo_core::{LinkId, Mac48, MloEntity, OperatingChannel, Sap, SimTime};
use mlo_pdus::elements::mle::EmbeddedFrame;
use mlo_pdus::elements::{MultiLinkElement, PerStaProfile};
use mlo_pdus::frames::mgmt::STATUS_SUCCESS;
use mlo_pdus::frames::{AssocRequestBody, AssocResponseBody, BeaconBody, DisassocBody, Frame, MgmtHdr};
use mlo_saps::data::TrafficDataInd;
use mlo_saps::mlme::MlmeAssocConf;
use mlo_saps::phy::PhyTxReq;
use mlo_saps::{SapMsg, SapMsgInner};

use crate::assoc::{all_affiliated_aps, plan_setup, Candidate, SetupPair};
use crate::data_plane::DataPlane;
use crate::links::LinkSet;
use crate::peers::MldPeerStore;
use crate::{MessageQueue, MloEntityTrait};

/// Link-setup states of one (non-AP MLD, AP MLD) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupState {
    /// No target network configured
    Idle,
    /// Waiting for a beacon of the target network to build the candidate set
    Discovering,
    /// Association request sent on the exchange link, awaiting the response
    NegotiatingOnFirstLink,
    /// Pairs recorded, links switched, data plane running
    Active,
    /// Pair removed after disassociation
    TornDown,
}

/// Negotiation state kept between the association request and the response
struct PendingSetup {
    ap_mld: Mac48,
    exchange_sta_link: LinkId,
    pairs: Vec<SetupPair>,
}

/// MAC entity of a non-AP MLD: discovers which advertised APs belong to one
/// AP MLD, negotiates the link set over the first link, binds the addresses
/// of every accepted pair and then runs the uplink side of the data plane.
pub struct StaMac {
    index: u8,
    config: SharedConfig,
    now: SimTime,
    links: LinkSet,
    peers: MldPeerStore,
    data: DataPlane,
    state: SetupState,
    target_ssid: Option<String>,
    pending: Option<PendingSetup>,
    ap_mld: Option<Mac48>,
    setup_pairs: Vec<(LinkId, LinkId)>,
    aid: Option<u16>,
}

impl StaMac {
    pub fn new(index: u8, config: SharedConfig) -> Self {
        let cfg = config.config();
        let links = LinkSet::new(cfg.mld_address, &cfg.links);
        let data = DataPlane::new(cfg.mld_address, false, cfg.nmax_inflight, cfg.ack_timeout_ticks, cfg.rng_seed);
        Self {
            index,
            config,
            now: SimTime::default(),
            links,
            peers: Default::default(),
            data,
            state: SetupState::Idle,
            target_ssid: None,
            pending: None,
            ap_mld: None,
            setup_pairs: Vec::new(),
            aid: None,
        }
    }

    pub fn mld_address(&self) -> Mac48 {
        self.config.config().mld_address
    }

    pub fn state(&self) -> SetupState {
        self.state
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

    /// Accepted (own link, AP link) pairs of the active association
    pub fn setup_pairs(&self) -> &[(LinkId, LinkId)] {
        &self.setup_pairs
    }

    pub fn aid(&self) -> Option<u16> {
        self.aid
    }

    fn is_multi_link(&self) -> bool {
        self.links.len() > 1
    }

    fn tx_frame(&self, queue: &mut MessageQueue, link_id: LinkId, frame: &Frame) {
        let link = self.links.get(link_id).expect("transmit on unknown link");
        queue.push_back(SapMsg {
            sap: Sap::PhySap,
            src: MloEntity::Sta(self.index),
            dest: MloEntity::Medium,
            at: self.now,
            msg: SapMsgInner::PhyTxReq(PhyTxReq {
                link_id,
                channel: link.channel,
                ppdu: frame.to_bytes(),
            }),
        });
    }

    fn rx_ppdu(&mut self, queue: &mut MessageQueue, channel: OperatingChannel, ppdu: &[u8]) {
        let Some(link_id) = self.links.enabled_link_on(&channel).map(|l| l.id) else {
            return;
        };
        let link_addr = self.links.address_of(link_id).unwrap();

        let frame = match Frame::from_bytes(ppdu) {
            Ok(frame) => frame,
            Err(e) => {
                // An undecodable responder reply abandons the whole attempt;
                // any retry is up to the outside
                if self.state == SetupState::NegotiatingOnFirstLink
                    && self.pending.as_ref().is_some_and(|p| p.exchange_sta_link == link_id)
                {
                    tracing::error!("undecodable reply during negotiation: {:?}, abandoning setup", e);
                    self.abandon_setup(queue);
                } else {
                    tracing::warn!("undecodable frame on link {}: {:?}", link_id, e);
                }
                return;
            }
        };

        match frame {
            Frame::Beacon { hdr, body } => {
                if self.state == SetupState::Discovering
                    && self.target_ssid.as_deref() == Some(body.ssid.as_str())
                {
                    self.handle_beacon(queue, link_id, channel, hdr, body);
                }
            }
            Frame::AssocResponse { hdr, body }
                if self.state == SetupState::NegotiatingOnFirstLink && hdr.addr1 == link_addr =>
            {
                self.handle_assoc_response(queue, link_id, hdr, body);
            }
            Frame::QosData(data) if self.state == SetupState::Active => {
                if data.addr1 == link_addr {
                    let is_new = self.data.rx_data(&data, link_id, &self.peers);
                    if is_new {
                        self.deliver_up(queue, data.addr3, self.mld_address(), data.tid, data.payload);
                    }
                } else if data.addr1.is_group() {
                    // Group-addressed copies are delivered per receiving link
                    self.deliver_up(queue, data.addr3, Mac48::BROADCAST, data.tid, data.payload);
                }
            }
            Frame::BlockAck(ba) if ba.addr1 == link_addr => {
                self.data.rx_block_ack(&ba, link_id, &self.peers);
            }
            Frame::Disassoc { hdr, body } if hdr.addr1 == link_addr => {
                tracing::info!("<- Disassoc (reason {})", body.reason_code);
                self.teardown_local();
            }
            other => {
                tracing::trace!("ignoring {} on link {}", other.type_name(), link_id);
            }
        }
    }

    /// Discovery: resolve the affiliated APs out of the neighbor report,
    /// match them against the own link inventory and move to negotiation on
    /// the link the beacon arrived on.
    fn handle_beacon(
        &mut self,
        queue: &mut MessageQueue,
        link_id: LinkId,
        channel: OperatingChannel,
        hdr: MgmtHdr,
        body: BeaconBody,
    ) {
        let cfg = self.config.config();
        let ap_multi = body.mle.is_some();
        let ap_mld = body
            .mle
            .as_ref()
            .and_then(|mle| mle.mld_mac_address)
            .unwrap_or(hdr.addr2);
        let exchange = Candidate {
            ap_link_id: body.mle.as_ref().and_then(|mle| mle.link_id_info).unwrap_or(0),
            bssid: hdr.addr2,
            channel,
        };

        // A beacon with neither report nor Multi-Link element comes from a
        // single-link peer; the candidate set is just the exchange link
        let mut others = Vec::new();
        if let Some(rnr) = &body.rnr {
            for ap_ref in all_affiliated_aps(rnr) {
                let nbr = &rnr.nbr_ap_infos[ap_ref.nbr_ap_info_id];
                let tbtt = &nbr.tbtts[ap_ref.tbtt_info_id];
                let Some(channel) = OperatingChannel::from_op_class(nbr.op_class, nbr.channel) else {
                    tracing::warn!("unknown operating class {} in neighbor report", nbr.op_class);
                    continue;
                };
                others.push(Candidate {
                    ap_link_id: tbtt.mld_params.as_ref().unwrap().link_id,
                    bssid: tbtt.bssid,
                    channel,
                });
            }
        }

        let pairs = plan_setup(&self.links, link_id, exchange, &others);
        tracing::info!(
            "discovery on link {}: AP MLD {} offers {} candidate(s), requesting {} pair(s)",
            link_id,
            ap_mld,
            others.len() + 1,
            pairs.len()
        );

        let mle = if ap_multi && self.is_multi_link() {
            let sub_request = AssocRequestBody { ssid: cfg.ssid.clone(), mle: None };
            Some(MultiLinkElement {
                mld_mac_address: Some(self.mld_address()),
                link_id_info: Some(link_id),
                profiles: pairs[1..]
                    .iter()
                    .map(|pair| PerStaProfile {
                        link_id: pair.ap_link,
                        sta_mac: Some(self.links.address_of(pair.sta_link).unwrap()),
                        embedded: Some(EmbeddedFrame::AssocRequest(sub_request.to_bytes())),
                    })
                    .collect(),
            })
        } else {
            None
        };

        let own_addr = self.links.address_of(link_id).unwrap();
        let request = Frame::AssocRequest {
            hdr: MgmtHdr { addr1: hdr.addr2, addr2: own_addr, addr3: hdr.addr2 },
            body: AssocRequestBody { ssid: cfg.ssid.clone(), mle },
        };
        tracing::info!("-> AssocRequest on link {}", link_id);
        self.tx_frame(queue, link_id, &request);

        self.pending = Some(PendingSetup { ap_mld, exchange_sta_link: link_id, pairs });
        self.state = SetupState::NegotiatingOnFirstLink;
    }

    fn handle_assoc_response(
        &mut self,
        queue: &mut MessageQueue,
        link_id: LinkId,
        hdr: MgmtHdr,
        body: AssocResponseBody,
    ) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if pending.exchange_sta_link != link_id || hdr.addr2 != pending.pairs[0].bssid {
            tracing::warn!("assoc response from unexpected responder {}, ignoring", hdr.addr2);
            self.pending = Some(pending);
            return;
        }

        if body.status_code != STATUS_SUCCESS {
            tracing::warn!("association refused with status {}", body.status_code);
            self.abandon_setup(queue);
            return;
        }

        // The exchange pair is implicit; every other accepted pair must be
        // mirrored in a profile whose link id and address match what the
        // responder advertised for that link
        let mut accepted = vec![pending.pairs[0]];
        if let Some(mle) = &body.mle {
            if mle.mld_mac_address.is_some_and(|mld| mld != pending.ap_mld) {
                tracing::error!("responder MLD address changed mid-negotiation, abandoning setup");
                self.abandon_setup(queue);
                return;
            }
            for profile in &mle.profiles {
                let Some(pair) = pending.pairs[1..].iter().find(|p| p.ap_link == profile.link_id) else {
                    tracing::error!("response accepts unrequested AP link {}, abandoning setup", profile.link_id);
                    self.abandon_setup(queue);
                    return;
                };
                if profile.sta_mac != Some(pair.bssid) {
                    tracing::error!(
                        "profile address {:?} does not match the advertised inventory of AP link {}, abandoning setup",
                        profile.sta_mac,
                        profile.link_id
                    );
                    self.abandon_setup(queue);
                    return;
                }
                if !profile.has_assoc_response() {
                    tracing::warn!("profile for AP link {} lacks the embedded response", profile.link_id);
                }
                accepted.push(*pair);
            }
        }

        // Accepted links adopt the AP link's operating channel and the
        // address bindings are recorded; everything else is disabled
        for pair in &accepted {
            self.links.set_channel(pair.sta_link, pair.channel);
            self.links.set_enabled(pair.sta_link, true);
            self.peers.bind_link(pending.ap_mld, pair.sta_link, pair.bssid);
        }
        let accepted_ids: Vec<LinkId> = accepted.iter().map(|p| p.sta_link).collect();
        let all_ids: Vec<LinkId> = self.links.iter().map(|l| l.id).collect();
        for id in all_ids {
            if !accepted_ids.contains(&id) {
                self.links.set_enabled(id, false);
            }
        }

        self.setup_pairs = accepted.iter().map(|p| (p.sta_link, p.ap_link)).collect();
        self.ap_mld = Some(pending.ap_mld);
        self.aid = Some(body.aid);
        self.state = SetupState::Active;
        tracing::info!("setup complete: aid={} pairs={:?}", body.aid, self.setup_pairs);

        queue.push_back(SapMsg {
            sap: Sap::MlmeSap,
            src: MloEntity::Sta(self.index),
            dest: MloEntity::Harness,
            at: self.now,
            msg: SapMsgInner::MlmeAssocConf(MlmeAssocConf {
                success: true,
                setup_links: self.setup_pairs.clone(),
            }),
        });
    }

    /// Protocol error or undecodable reply: report the failure and fall back
    /// to Idle. Retrying is the outside collaborator's decision.
    fn abandon_setup(&mut self, queue: &mut MessageQueue) {
        self.pending = None;
        self.target_ssid = None;
        self.state = SetupState::Idle;
        queue.push_back(SapMsg {
            sap: Sap::MlmeSap,
            src: MloEntity::Sta(self.index),
            dest: MloEntity::Harness,
            at: self.now,
            msg: SapMsgInner::MlmeAssocConf(MlmeAssocConf { success: false, setup_links: vec![] }),
        });
    }

    fn deliver_up(&self, queue: &mut MessageQueue, src: Mac48, dst: Mac48, tid: u8, payload: Vec<u8>) {
        queue.push_back(SapMsg {
            sap: Sap::DataSap,
            src: MloEntity::Sta(self.index),
            dest: MloEntity::Harness,
            at: self.now,
            msg: SapMsgInner::TrafficDataInd(TrafficDataInd { src, dst, tid, payload }),
        });
    }

    /// All uplink traffic travels to the associated AP; the final
    /// destination (another station, or the broadcast address) rides in the
    /// frame's third address and is resolved by the AP.
    fn handle_traffic_req(&mut self, dst: Mac48, tid: u8, payload: Vec<u8>) {
        let Some(ap_mld) = self.ap_mld else {
            tracing::warn!("traffic request while not associated, dropping");
            return;
        };
        self.data.enqueue(ap_mld, tid, dst, self.mld_address(), payload, self.now);
    }

    fn send_disassoc(&mut self, queue: &mut MessageQueue, reason_code: u16) {
        if let Some(&(sta_link, _)) = self.setup_pairs.first() {
            if let Some(ap_mld) = self.ap_mld {
                if let Some(peer_addr) = self.peers.affiliated_address(ap_mld, sta_link) {
                    let own_addr = self.links.address_of(sta_link).unwrap();
                    let frame = Frame::Disassoc {
                        hdr: MgmtHdr { addr1: peer_addr, addr2: own_addr, addr3: peer_addr },
                        body: DisassocBody { reason_code },
                    };
                    tracing::info!("-> Disassoc (reason {})", reason_code);
                    self.tx_frame(queue, sta_link, &frame);
                }
            }
        }
        self.teardown_local();
    }

    /// Remove all pairs of the MLD pair and disable the associated links.
    /// Pending sequencing state between the two MLD addresses is dropped.
    fn teardown_local(&mut self) {
        if let Some(ap_mld) = self.ap_mld.take() {
            self.peers.remove_peer(ap_mld);
            self.data.teardown_peer(ap_mld);
        }
        for &(sta_link, _) in &self.setup_pairs {
            self.links.set_enabled(sta_link, false);
        }
        self.setup_pairs.clear();
        self.aid = None;
        self.pending = None;
        self.state = SetupState::TornDown;
    }
}

impl MloEntityTrait for StaMac {
    fn entity(&self) -> MloEntity {
        MloEntity::Sta(self.index)
    }

    fn rx_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        match message.msg {
            SapMsgInner::PhyRxInd(ind) => {
                self.rx_ppdu(queue, ind.channel, &ind.ppdu);
            }
            SapMsgInner::MlmeJoinReq(req) => {
                tracing::info!("join requested for ssid {:?}", req.ssid);
                // Discovery listens on every configured link
                let all_ids: Vec<_> = self.links.iter().map(|l| l.id).collect();
                for id in all_ids {
                    self.links.set_enabled(id, true);
                }
                self.target_ssid = Some(req.ssid);
                self.state = SetupState::Discovering;
            }
            SapMsgInner::MlmeDisassocReq(req) => {
                self.send_disassoc(queue, req.reason_code);
            }
            SapMsgInner::TrafficDataReq(req) => {
                self.handle_traffic_req(req.dst, req.tid, req.payload);
            }
            other => {
                tracing::warn!("unexpected primitive at STA MAC: {}", other);
            }
        }
    }

    fn tick_start(&mut self, _queue: &mut MessageQueue, ts: SimTime) {
        self.now = ts;
        self.data.check_timeouts(ts);
    }

    fn tick_end(&mut self, queue: &mut MessageQueue, ts: SimTime) -> bool {
        if self.state != SetupState::Active {
            return false;
        }
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
