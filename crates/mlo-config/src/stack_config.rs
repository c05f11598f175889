use serde::Deserialize;
use std::sync::{Arc, RwLock};

use mlo_core::{Mac48, OperatingChannel, WifiBand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DeviceRole {
    Ap,
    Sta,
}

/// Configuration of one link of the MLD
#[derive(Debug, Clone)]
pub struct CfgLink {
    /// Primary channel number
    pub number: u8,
    /// Channel width in MHz (20, 40 or 80)
    pub width_mhz: u16,
    pub band: WifiBand,
    /// Index of the primary 20 MHz subchannel
    pub primary20_index: u8,
    /// A fixed-band link may only be matched to an AP link on the same band.
    /// A link without this flag may switch band during setup.
    pub fixed_band: bool,
}

impl CfgLink {
    pub fn new(number: u8, width_mhz: u16, band: WifiBand, primary20_index: u8) -> Self {
        Self { number, width_mhz, band, primary20_index, fixed_band: false }
    }

    pub fn fixed(mut self) -> Self {
        self.fixed_band = true;
        self
    }

    pub fn channel(&self) -> OperatingChannel {
        OperatingChannel::new(self.number, self.width_mhz, self.band, self.primary20_index)
    }
}

#[derive(Debug, Clone)]
pub struct StackConfig {
    pub role: DeviceRole,
    /// Network name used to pair STAs with the AP during discovery
    pub ssid: String,
    /// Logical address of the whole MLD. Per-link addresses are derived from
    /// it unless the device has a single link, which reuses it directly.
    pub mld_address: Mac48,
    pub links: Vec<CfgLink>,
    /// Bound on how many links may simultaneously carry the same
    /// unacknowledged unit
    pub nmax_inflight: usize,
    pub beacon_period_ticks: u64,
    /// Ticks after which an unacknowledged in-flight unit is declared lost
    pub ack_timeout_ticks: u64,
    /// Seed for the per-device scheduler RNG, for reproducible runs
    pub rng_seed: u64,
    pub debug_log: Option<String>,
}

impl StackConfig {
    pub fn new(role: DeviceRole, ssid: &str, mld_address: Mac48, links: Vec<CfgLink>) -> Self {
        Self {
            role,
            ssid: ssid.to_string(),
            mld_address,
            links,
            nmax_inflight: 1,
            beacon_period_ticks: 10,
            ack_timeout_ticks: 8,
            rng_seed: 1,
            debug_log: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.links.is_empty() {
            return Err("at least one link must be configured".to_string());
        }
        // Link ids are carried in 4-bit wire fields
        if self.links.len() > 16 {
            return Err(format!("too many links: {} (max 16)", self.links.len()));
        }
        if self.nmax_inflight < 1 || self.nmax_inflight > 15 {
            return Err(format!("nmax_inflight out of range: {}", self.nmax_inflight));
        }
        if self.ssid.is_empty() || self.ssid.len() > 32 {
            return Err(format!("invalid ssid length: {}", self.ssid.len()));
        }
        if self.ack_timeout_ticks == 0 || self.beacon_period_ticks == 0 {
            return Err("timeouts must be nonzero".to_string());
        }
        for link in &self.links {
            if ![20, 40, 80].contains(&link.width_mhz) {
                return Err(format!("unsupported channel width: {} MHz", link.width_mhz));
            }
        }
        Ok(())
    }
}

/// Mutable runtime state, shared between the stack and outside observers
#[derive(Debug, Default)]
pub struct StackState {
    /// Number of stations currently associated (AP role)
    pub assoc_count: u16,
}

#[derive(Clone)]
pub struct SharedConfig {
    /// Read-only configuration (immutable after construction).
    cfg: Arc<StackConfig>,
    /// Mutable state guarded with RwLock (write by the stack, read by others).
    state: Arc<RwLock<StackState>>,
}

impl SharedConfig {
    pub fn from_config(cfg: StackConfig) -> Self {
        Self::from_parts(cfg, StackState::default())
    }

    pub fn from_parts(cfg: StackConfig, state: StackState) -> Self {
        // Check config for validity before returning the SharedConfig object
        match cfg.validate() {
            Ok(_) => {}
            Err(e) => panic!("Invalid stack configuration: {}", e),
        }

        Self {
            cfg: Arc::new(cfg),
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Access immutable config.
    pub fn config(&self) -> Arc<StackConfig> {
        Arc::clone(&self.cfg)
    }

    /// Read guard for mutable state.
    pub fn state_read(&self) -> std::sync::RwLockReadGuard<'_, StackState> {
        self.state.read().expect("StackState RwLock blocked")
    }

    /// Write guard for mutable state.
    pub fn state_write(&self) -> std::sync::RwLockWriteGuard<'_, StackState> {
        self.state.write().expect("StackState RwLock blocked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> StackConfig {
        StackConfig::new(
            DeviceRole::Ap,
            "mlo-net",
            Mac48([0x00, 0xC0, 0x11, 0x00, 0x00, 0x10]),
            vec![CfgLink::new(36, 20, WifiBand::Band5GHz, 0)],
        )
    }

    #[test]
    fn test_valid_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let mut cfg = base_config();
        cfg.links.clear();
        assert!(cfg.validate().is_err());

        let mut cfg = base_config();
        cfg.nmax_inflight = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = base_config();
        cfg.ssid = String::new();
        assert!(cfg.validate().is_err());
    }
}
