use std::collections::HashMap;

use mlo_core::{LinkId, Mac48};

/// Per-peer state of one side of an MLD pair: the bidirectional address
/// bindings between the peer's MLD address and its per-link addresses, the
/// set of own links on which the pair is established and the association id.
///
/// Created while the association exchange completes, mutated only by the MAC
/// entity owning this store, destroyed on disassociation.
#[derive(Default)]
pub struct MldPeerStore {
    /// peer link address -> peer MLD address
    mld_of_link: HashMap<Mac48, Mac48>,
    /// (peer MLD address, own link id) -> peer link address on that link
    affiliated: HashMap<(Mac48, LinkId), Mac48>,
    /// peer MLD address -> own link ids the pair is set up on
    setup: HashMap<Mac48, Vec<LinkId>>,
    /// peer MLD address -> association id
    aids: HashMap<Mac48, u16>,
}

impl MldPeerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one accepted link pair: on `own_link`, the peer is reachable
    /// under `peer_link_addr`.
    pub fn bind_link(&mut self, peer_mld: Mac48, own_link: LinkId, peer_link_addr: Mac48) {
        self.mld_of_link.insert(peer_link_addr, peer_mld);
        self.affiliated.insert((peer_mld, own_link), peer_link_addr);
        let links = self.setup.entry(peer_mld).or_default();
        if !links.contains(&own_link) {
            links.push(own_link);
        }
    }

    /// MLD address a per-link address belongs to, if bound
    pub fn mld_address(&self, link_addr: Mac48) -> Option<Mac48> {
        self.mld_of_link.get(&link_addr).copied()
    }

    /// Fold a per-link address to its MLD address; unbound addresses (e.g.
    /// of single-link peers addressed by their only address) pass through.
    pub fn resolve(&self, addr: Mac48) -> Mac48 {
        self.mld_address(addr).unwrap_or(addr)
    }

    /// The peer's address on the given own link
    pub fn affiliated_address(&self, peer_mld: Mac48, own_link: LinkId) -> Option<Mac48> {
        self.affiliated.get(&(peer_mld, own_link)).copied()
    }

    /// Own link ids the pair with this peer is established on
    pub fn setup_links(&self, peer_mld: Mac48) -> &[LinkId] {
        self.setup.get(&peer_mld).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_associated(&self, peer_mld: Mac48) -> bool {
        self.setup.contains_key(&peer_mld)
    }

    pub fn peer_mlds(&self) -> impl Iterator<Item = Mac48> + '_ {
        self.setup.keys().copied()
    }

    pub fn set_aid(&mut self, peer_mld: Mac48, aid: u16) {
        self.aids.insert(peer_mld, aid);
    }

    pub fn aid(&self, peer_mld: Mac48) -> Option<u16> {
        self.aids.get(&peer_mld).copied()
    }

    /// Drop all state for the pair with this peer. Returns false when the
    /// peer was not known.
    pub fn remove_peer(&mut self, peer_mld: Mac48) -> bool {
        let known = self.setup.remove(&peer_mld).is_some();
        self.aids.remove(&peer_mld);
        self.affiliated.retain(|(mld, _), _| *mld != peer_mld);
        self.mld_of_link.retain(|_, mld| *mld != peer_mld);
        known
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEER: Mac48 = Mac48([0, 0xC0, 0, 1, 0, 0x20]);
    const PEER_L0: Mac48 = Mac48([2, 0xC0, 0, 1, 0, 0x21]);
    const PEER_L1: Mac48 = Mac48([2, 0xC0, 0, 1, 0, 0x22]);

    #[test]
    fn test_bindings_both_directions() {
        let mut store = MldPeerStore::new();
        store.bind_link(PEER, 0, PEER_L0);
        store.bind_link(PEER, 2, PEER_L1);

        assert_eq!(store.mld_address(PEER_L0), Some(PEER));
        assert_eq!(store.mld_address(PEER_L1), Some(PEER));
        assert_eq!(store.affiliated_address(PEER, 0), Some(PEER_L0));
        assert_eq!(store.affiliated_address(PEER, 2), Some(PEER_L1));
        assert_eq!(store.setup_links(PEER), &[0, 2]);
        assert!(store.is_associated(PEER));
    }

    #[test]
    fn test_resolve_passthrough() {
        let store = MldPeerStore::new();
        assert_eq!(store.resolve(PEER_L0), PEER_L0);
    }

    #[test]
    fn test_remove_peer() {
        let mut store = MldPeerStore::new();
        store.bind_link(PEER, 0, PEER_L0);
        store.set_aid(PEER, 1);
        assert!(store.remove_peer(PEER));
        assert!(!store.is_associated(PEER));
        assert_eq!(store.mld_address(PEER_L0), None);
        assert_eq!(store.affiliated_address(PEER, 0), None);
        assert_eq!(store.aid(PEER), None);
        assert!(!store.remove_peer(PEER));
    }
}
