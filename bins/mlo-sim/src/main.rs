use as_any::Downcast;
use clap::Parser;

use mlo_config::{toml_config, DeviceRole, SharedConfig};
use mlo_core::{debug, MloEntity, Sap};
use mlo_entities::ap_mac::ApMac;
use mlo_entities::medium::Medium;
use mlo_entities::sta_mac::StaMac;
use mlo_entities::{MessageQueue, MessageRouter, MloEntityTrait};
use mlo_saps::data::TrafficDataReq;
use mlo_saps::mlme::MlmeJoinReq;
use mlo_saps::{SapMsg, SapMsgInner};

/// Collects the primitives the stack addresses to the surrounding harness
struct HarnessSink {
    assoc_confs: usize,
    assoc_failures: usize,
    rx_units: usize,
}

impl HarnessSink {
    fn new() -> Self {
        Self { assoc_confs: 0, assoc_failures: 0, rx_units: 0 }
    }
}

impl MloEntityTrait for HarnessSink {
    fn entity(&self) -> MloEntity {
        MloEntity::Harness
    }

    fn rx_prim(&mut self, _queue: &mut MessageQueue, message: SapMsg) {
        match message.msg {
            SapMsgInner::MlmeAssocConf(conf) => {
                if conf.success {
                    tracing::info!("setup complete: pairs {:?}", conf.setup_links);
                    self.assoc_confs += 1;
                } else {
                    tracing::warn!("setup attempt failed");
                    self.assoc_failures += 1;
                }
            }
            SapMsgInner::MlmeAssocInd(ind) => {
                tracing::info!("AP associated {} (aid {})", ind.sta_mld_address, ind.aid);
            }
            SapMsgInner::TrafficDataInd(ind) => {
                tracing::info!("unit delivered: {} -> {} ({} bytes)", ind.src, ind.dst, ind.payload.len());
                self.rx_units += 1;
            }
            other => {
                tracing::debug!("harness ignoring {}", other);
            }
        }
    }
}

/// Load configuration file
fn load_config_from_toml(cfg_path: &str) -> SharedConfig {
    match toml_config::from_file(cfg_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", cfg_path, e);
            std::process::exit(1);
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Multi-link station simulator",
    long_about = "Runs an AP MLD and one or more non-AP MLDs over a simulated \
                  medium: multi-link discovery, setup and a traffic exchange"
)]
struct Args {
    /// TOML config of the AP MLD
    ap_config: String,

    /// TOML config(s) of the non-AP MLD(s)
    #[arg(required = true)]
    sta_configs: Vec<String>,

    /// Number of ticks to run after setup
    #[arg(long, default_value_t = 60)]
    ticks: usize,

    /// Number of uplink units the first station generates
    #[arg(long, default_value_t = 8)]
    packets: usize,
}

fn main() {
    let args = Args::parse();

    let ap_cfg = load_config_from_toml(&args.ap_config);
    let _log_guard = debug::setup_logging_default(ap_cfg.config().debug_log.clone());

    if ap_cfg.config().role != DeviceRole::Ap {
        eprintln!("{} does not configure an AP MLD", args.ap_config);
        std::process::exit(1);
    }
    let ap_mld = ap_cfg.config().mld_address;
    let ssid = ap_cfg.config().ssid.clone();
    let beacon_period = ap_cfg.config().beacon_period_ticks as usize;

    // Assemble the stack: AP, stations, medium and the harness sink
    let mut router = MessageRouter::new();
    let mut devices = vec![MloEntity::Ap];
    router.register_entity(Box::new(ApMac::new(ap_cfg)));

    for (i, path) in args.sta_configs.iter().enumerate() {
        let sta_cfg = load_config_from_toml(path);
        if sta_cfg.config().role != DeviceRole::Sta {
            eprintln!("{} does not configure a non-AP MLD", path);
            std::process::exit(1);
        }
        devices.push(MloEntity::Sta(i as u8));
        router.register_entity(Box::new(StaMac::new(i as u8, sta_cfg)));
    }
    router.register_entity(Box::new(Medium::new(devices)));
    router.register_entity(Box::new(HarnessSink::new()));

    // Multi-link discovery & setup
    for i in 0..args.sta_configs.len() {
        router.submit_message(SapMsg {
            sap: Sap::MlmeSap,
            src: MloEntity::Harness,
            dest: MloEntity::Sta(i as u8),
            at: router.now(),
            msg: SapMsgInner::MlmeJoinReq(MlmeJoinReq { ssid: ssid.clone() }),
        });
    }
    router.run_stack(Some(beacon_period + 2));

    // Uplink traffic from the first station toward the AP
    for n in 0..args.packets {
        router.submit_message(SapMsg {
            sap: Sap::DataSap,
            src: MloEntity::Harness,
            dest: MloEntity::Sta(0),
            at: router.now(),
            msg: SapMsgInner::TrafficDataReq(TrafficDataReq {
                dst: ap_mld,
                tid: 0,
                payload: vec![n as u8; 64],
            }),
        });
    }
    router.run_stack(Some(args.ticks));

    print_summary(&mut router, args.sta_configs.len());
}

fn print_summary(router: &mut MessageRouter, n_stas: usize) {
    for i in 0..n_stas {
        if let Some(sta) = router
            .get_entity(MloEntity::Sta(i as u8))
            .and_then(|e| e.downcast_mut::<StaMac>())
        {
            println!("STA {}: state {:?}, pairs {:?}", i, sta.state(), sta.setup_pairs());
            for link in sta.links().iter() {
                println!(
                    "  link {}: {} {} {}",
                    link.id,
                    link.address,
                    link.channel,
                    if link.enabled { "up" } else { "down" }
                );
            }
        }
    }

    let medium = router
        .get_entity(MloEntity::Medium)
        .and_then(|e| e.downcast_mut::<Medium>())
        .expect("medium registered");
    println!("frames on the medium: {}", medium.txlog().len());

    let sink = router
        .get_entity(MloEntity::Harness)
        .and_then(|e| e.downcast_mut::<HarnessSink>())
        .expect("harness sink registered");
    println!(
        "setups: {} ok / {} failed, units delivered: {}",
        sink.assoc_confs, sink.assoc_failures, sink.rx_units
    );
}
