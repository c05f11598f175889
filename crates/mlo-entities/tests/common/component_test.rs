use as_any::Downcast;

use mlo_config::{CfgLink, DeviceRole, SharedConfig, StackConfig};
use mlo_core::{LinkId, Mac48, MloEntity, Sap, SimTime, WifiBand};
use mlo_entities::ap_mac::ApMac;
use mlo_entities::medium::Medium;
use mlo_entities::sta_mac::StaMac;
use mlo_entities::MessageRouter;
use mlo_saps::data::TrafficDataReq;
use mlo_saps::mlme::{MlmeDisassocReq, MlmeJoinReq};
use mlo_saps::{SapMsg, SapMsgInner};

use super::sink::Sink;

pub const SSID: &str = "mlo-net";

/// Channel tuple used by the test scenarios: number, band, fixed-band flag
pub type StaChannel = (u8, WifiBand, bool);

pub fn ap_config(channels: &[(u8, WifiBand)]) -> StackConfig {
    let links = channels
        .iter()
        .map(|(number, band)| CfgLink::new(*number, 20, *band, 0))
        .collect();
    StackConfig::new(DeviceRole::Ap, SSID, Mac48([0x00, 0xC0, 0x00, 0xA0, 0x00, 0x10]), links)
}

pub fn sta_config(index: u8, channels: &[StaChannel]) -> StackConfig {
    let links = channels
        .iter()
        .map(|(number, band, fixed)| {
            let link = CfgLink::new(*number, 20, *band, 0);
            if *fixed { link.fixed() } else { link }
        })
        .collect();
    let mld = Mac48([0x00, 0xC0, 0x00, 0xB0 + index, 0x00, 0x10]);
    StackConfig::new(DeviceRole::Sta, SSID, mld, links)
}

/// Infrastructure for testing the MLO stack
/// Quick setup of an AP MLD, a number of non-AP MLDs, the shared medium and
/// a harness sink for collecting primitives for later inspection
pub struct ComponentTest {
    pub router: MessageRouter,
    pub ap_mld: Mac48,
    pub sta_mlds: Vec<Mac48>,
}

impl ComponentTest {
    pub fn new(ap_cfg: StackConfig, sta_cfgs: Vec<StackConfig>) -> Self {
        let ap_mld = ap_cfg.mld_address;
        let sta_mlds: Vec<Mac48> = sta_cfgs.iter().map(|c| c.mld_address).collect();

        let mut router = MessageRouter::new();
        let mut devices = vec![MloEntity::Ap];

        router.register_entity(Box::new(ApMac::new(SharedConfig::from_config(ap_cfg))));
        for (i, cfg) in sta_cfgs.into_iter().enumerate() {
            devices.push(MloEntity::Sta(i as u8));
            router.register_entity(Box::new(StaMac::new(i as u8, SharedConfig::from_config(cfg))));
        }
        router.register_entity(Box::new(Medium::new(devices)));
        router.register_entity(Box::new(Sink::new(MloEntity::Harness)));

        Self { router, ap_mld, sta_mlds }
    }

    pub fn run_ticks(&mut self, num: usize) {
        self.router.run_stack(Some(num));
    }

    pub fn submit(&mut self, dest: MloEntity, sap: Sap, msg: SapMsgInner) {
        let at = self.router.now();
        self.router.submit_message(SapMsg { sap, src: MloEntity::Harness, dest, at, msg });
    }

    pub fn sink_msgs(&mut self) -> Vec<SapMsg> {
        let sink = self
            .router
            .get_entity(MloEntity::Harness)
            .and_then(|e| e.downcast_mut::<Sink>())
            .expect("harness sink registered");
        sink.take_msgqueue()
    }

    pub fn ap(&mut self) -> &mut ApMac {
        self.router
            .get_entity(MloEntity::Ap)
            .and_then(|e| e.downcast_mut::<ApMac>())
            .expect("AP registered")
    }

    pub fn sta(&mut self, index: u8) -> &mut StaMac {
        self.router
            .get_entity(MloEntity::Sta(index))
            .and_then(|e| e.downcast_mut::<StaMac>())
            .expect("STA registered")
    }

    pub fn medium(&mut self) -> &mut Medium {
        self.router
            .get_entity(MloEntity::Medium)
            .and_then(|e| e.downcast_mut::<Medium>())
            .expect("medium registered")
    }

    /// Drive one station through discovery and setup. Panics when the
    /// confirmation does not arrive within a few beacon periods; returns the
    /// accepted (STA link, AP link) pairs.
    pub fn associate(&mut self, index: u8) -> Vec<(LinkId, LinkId)> {
        self.submit(
            MloEntity::Sta(index),
            Sap::MlmeSap,
            SapMsgInner::MlmeJoinReq(MlmeJoinReq { ssid: SSID.to_string() }),
        );

        for _ in 0..40 {
            self.run_ticks(1);
            for msg in self.sink_msgs() {
                if let SapMsgInner::MlmeAssocConf(conf) = msg.msg {
                    if msg.src == MloEntity::Sta(index) {
                        assert!(conf.success, "setup attempt failed for STA {}", index);
                        return conf.setup_links;
                    }
                }
            }
        }
        panic!("STA {} did not associate in time", index);
    }

    pub fn associate_all(&mut self) -> Vec<Vec<(LinkId, LinkId)>> {
        (0..self.sta_mlds.len() as u8).map(|i| self.associate(i)).collect()
    }

    pub fn send_traffic(&mut self, src: MloEntity, dst: Mac48, tid: u8, count: usize) {
        for i in 0..count {
            self.submit(
                src,
                Sap::DataSap,
                SapMsgInner::TrafficDataReq(TrafficDataReq { dst, tid, payload: vec![i as u8; 8] }),
            );
        }
    }

    pub fn disassociate(&mut self, index: u8, reason_code: u16) {
        self.submit(
            MloEntity::Sta(index),
            Sap::MlmeSap,
            SapMsgInner::MlmeDisassocReq(MlmeDisassocReq { reason_code }),
        );
        self.run_ticks(1);
    }

    /// Traffic units delivered to the harness by `entity` since the last
    /// sink drain
    pub fn count_rx(msgs: &[SapMsg], entity: MloEntity) -> usize {
        msgs.iter()
            .filter(|m| m.src == entity && matches!(m.msg, SapMsgInner::TrafficDataInd(_)))
            .count()
    }

    pub fn sim_time(&self) -> SimTime {
        self.router.now()
    }
}
