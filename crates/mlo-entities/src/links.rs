use mlo_config::CfgLink;
use mlo_core::{LinkId, Mac48, OperatingChannel};

/// Endpoint of one MLD on one physical link. Owned exclusively by the MLD it
/// belongs to; only the owning MAC entity flips the enabled state.
#[derive(Debug, Clone)]
pub struct Link {
    pub id: LinkId,
    /// Per-link MAC-layer address, distinct from the MLD's logical address
    /// (except for single-link devices, which reuse it)
    pub address: Mac48,
    pub channel: OperatingChannel,
    pub fixed_band: bool,
    pub enabled: bool,
}

/// The link inventory of one MLD. Link ids are the indices into the
/// configured link list and stay stable for the device's lifetime.
pub struct LinkSet {
    links: Vec<Link>,
}

impl LinkSet {
    pub fn new(mld_address: Mac48, cfg_links: &[CfgLink]) -> Self {
        let single = cfg_links.len() == 1;
        let links = cfg_links
            .iter()
            .enumerate()
            .map(|(i, cfg)| Link {
                id: i as LinkId,
                address: if single { mld_address } else { mld_address.derived(i as u8) },
                channel: cfg.channel(),
                fixed_band: cfg.fixed_band,
                enabled: true,
            })
            .collect();
        Self { links }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    pub fn get(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id as usize)
    }

    pub fn address_of(&self, id: LinkId) -> Option<Mac48> {
        self.get(id).map(|l| l.address)
    }

    pub fn id_by_address(&self, address: Mac48) -> Option<LinkId> {
        self.links.iter().find(|l| l.address == address).map(|l| l.id)
    }

    /// First enabled link tuned to the given channel, if any
    pub fn enabled_link_on(&self, channel: &OperatingChannel) -> Option<&Link> {
        self.links.iter().find(|l| l.enabled && l.channel.same_freq(channel))
    }

    pub fn set_channel(&mut self, id: LinkId, channel: OperatingChannel) {
        let link = &mut self.links[id as usize];
        if link.channel != channel {
            tracing::debug!("link {} switches {} -> {}", id, link.channel, channel);
            link.channel = channel;
        }
    }

    pub fn set_enabled(&mut self, id: LinkId, enabled: bool) {
        let link = &mut self.links[id as usize];
        if link.enabled != enabled {
            tracing::debug!("link {} {}", id, if enabled { "enabled" } else { "disabled" });
            link.enabled = enabled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlo_core::WifiBand;

    #[test]
    fn test_single_link_reuses_mld_address() {
        let mld = Mac48([0, 0xC0, 0, 0, 0, 0x10]);
        let set = LinkSet::new(mld, &[CfgLink::new(36, 20, WifiBand::Band5GHz, 0)]);
        assert_eq!(set.address_of(0), Some(mld));
    }

    #[test]
    fn test_multi_link_addresses_distinct() {
        let mld = Mac48([0, 0xC0, 0, 0, 0, 0x10]);
        let set = LinkSet::new(
            mld,
            &[
                CfgLink::new(36, 20, WifiBand::Band5GHz, 0),
                CfgLink::new(1, 20, WifiBand::Band6GHz, 0),
            ],
        );
        let a0 = set.address_of(0).unwrap();
        let a1 = set.address_of(1).unwrap();
        assert_ne!(a0, mld);
        assert_ne!(a1, mld);
        assert_ne!(a0, a1);
        assert_eq!(set.id_by_address(a1), Some(1));
    }

    #[test]
    fn test_enabled_link_on_channel() {
        let mld = Mac48([0, 0xC0, 0, 0, 0, 0x10]);
        let mut set = LinkSet::new(
            mld,
            &[
                CfgLink::new(36, 20, WifiBand::Band5GHz, 0),
                CfgLink::new(1, 20, WifiBand::Band6GHz, 0),
            ],
        );
        let ch = OperatingChannel::new(1, 20, WifiBand::Band6GHz, 0);
        assert_eq!(set.enabled_link_on(&ch).unwrap().id, 1);
        set.set_enabled(1, false);
        assert!(set.enabled_link_on(&ch).is_none());
    }
}
