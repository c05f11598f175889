use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use toml::Value;

use mlo_core::{Mac48, WifiBand};

use super::stack_config::{CfgLink, DeviceRole, SharedConfig, StackConfig, StackState};

/// Build `SharedConfig` from a TOML configuration file
pub fn from_toml_str(toml_str: &str) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let root: TomlConfigRoot = toml::from_str(toml_str)?;

    // Various sanity checks
    let expected_config_version = "0.3";
    if !root.config_version.eq(expected_config_version) {
        return Err(format!(
            "Unrecognized config_version: {}, expect {}",
            root.config_version, expected_config_version
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("Unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }
    for (i, link) in root.links.iter().enumerate() {
        if !link.extra.is_empty() {
            return Err(format!("Unrecognized fields: links[{}]::{:?}", i, sorted_keys(&link.extra)).into());
        }
    }
    if let Some(ref tx) = root.tx {
        if !tx.extra.is_empty() {
            return Err(format!("Unrecognized fields: tx::{:?}", sorted_keys(&tx.extra)).into());
        }
    }

    let mld_address: Mac48 = root.mld_address.parse()?;

    // Build config from required and optional values
    let mut cfg = StackConfig::new(root.role, &root.ssid, mld_address, vec![]);
    cfg.debug_log = root.debug_log;

    for link in root.links {
        let mut cfg_link = CfgLink::new(
            link.channel,
            link.width_mhz.unwrap_or(20),
            link.band,
            link.primary20_index.unwrap_or(0),
        );
        if link.fixed_band.unwrap_or(false) {
            cfg_link = cfg_link.fixed();
        }
        cfg.links.push(cfg_link);
    }

    if let Some(tx) = root.tx {
        if let Some(v) = tx.nmax_inflight {
            cfg.nmax_inflight = v;
        }
        if let Some(v) = tx.beacon_period_ticks {
            cfg.beacon_period_ticks = v;
        }
        if let Some(v) = tx.ack_timeout_ticks {
            cfg.ack_timeout_ticks = v;
        }
        if let Some(v) = tx.rng_seed {
            cfg.rng_seed = v;
        }
    }

    Ok(SharedConfig::from_parts(cfg, StackState::default()))
}

/// Build `SharedConfig` from any reader.
pub fn from_reader<R: Read>(reader: R) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let mut contents = String::new();
    let mut reader = BufReader::new(reader);
    reader.read_to_string(&mut contents)?;
    from_toml_str(&contents)
}

/// Build `SharedConfig` from a file path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let f = File::open(path)?;
    let r = BufReader::new(f);
    let cfg = from_reader(r)?;
    Ok(cfg)
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&String> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    keys
}

#[derive(Debug, Deserialize)]
struct TomlConfigRoot {
    config_version: String,
    role: DeviceRole,
    ssid: String,
    mld_address: String,
    debug_log: Option<String>,

    #[serde(default)]
    links: Vec<LinkDto>,
    tx: Option<TxDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct LinkDto {
    channel: u8,
    width_mhz: Option<u16>,
    band: WifiBand,
    primary20_index: Option<u8>,
    fixed_band: Option<bool>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TxDto {
    nmax_inflight: Option<usize>,
    beacon_period_ticks: Option<u64>,
    ack_timeout_ticks: Option<u64>,
    rng_seed: Option<u64>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        config_version = "0.3"
        role = "Ap"
        ssid = "mlo-net"
        mld_address = "00:c0:11:00:00:10"

        [[links]]
        channel = 36
        band = "Band5GHz"

        [[links]]
        channel = 1
        band = "Band6GHz"
        fixed_band = true

        [tx]
        nmax_inflight = 2
    "#;

    #[test]
    fn test_parse_sample() {
        let shared = from_toml_str(SAMPLE).unwrap();
        let cfg = shared.config();
        assert_eq!(cfg.role, DeviceRole::Ap);
        assert_eq!(cfg.links.len(), 2);
        assert_eq!(cfg.links[0].width_mhz, 20);
        assert!(cfg.links[1].fixed_band);
        assert_eq!(cfg.nmax_inflight, 2);
    }

    #[test]
    fn test_reject_wrong_version() {
        let s = SAMPLE.replace("0.3", "9.9");
        assert!(from_toml_str(&s).is_err());
    }

    #[test]
    fn test_reject_unknown_field() {
        let s = format!("{}\nbogus_field = 1\n", SAMPLE);
        assert!(from_toml_str(&s).is_err());
    }
}
