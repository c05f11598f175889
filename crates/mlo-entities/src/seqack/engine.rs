use std::collections::{BTreeMap, HashMap};

use mlo_core::{LinkId, Mac48, Tid, SEQ_MODULUS};
use mlo_pdus::elements::AckBitmap;

/// Identifies one reliable-delivery flow: all units between one originator
/// and one receiver in one traffic class share a sequence space, regardless
/// of which links carry them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowKey {
    pub originator: Mac48,
    pub receiver: Mac48,
    pub tid: Tid,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SeqAckError {
    /// The caller tried to put a unit in flight on more links than the
    /// configured bound allows. Contract violation of the caller; the engine
    /// state is unchanged.
    ConcurrencyExceeded { seq: u16, limit: usize },
}

/// Result of reconciling one acknowledgment bitmap
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AckOutcome {
    /// Units confirmed delivered and dropped from all tracking
    pub delivered: Vec<u16>,
    /// Units that were in flight on the acknowledged link and are now
    /// retry-eligible on any active link
    pub retry_flagged: Vec<u16>,
}

#[derive(Debug, Default)]
struct UnitState {
    /// Links currently carrying this unit unacknowledged
    links: Vec<LinkId>,
    retry: bool,
}

#[derive(Debug, Default)]
struct FlowState {
    next_seq: u16,
    units: BTreeMap<u16, UnitState>,
}

/// Cross-link sequencing and acknowledgment engine.
///
/// Owns, per flow, the mod-4096 sequence counter and the in-flight link set
/// of every tracked unit. Which link carries a unit next is the caller's
/// (scheduler's) choice; the engine enforces the concurrency bound and keeps
/// the tracking consistent with the acknowledgments it has observed,
/// independent of per-link message ordering.
pub struct SeqAckEngine {
    nmax_inflight: usize,
    flows: HashMap<FlowKey, FlowState>,
}

impl SeqAckEngine {
    pub fn new(nmax_inflight: usize) -> Self {
        assert!(nmax_inflight >= 1, "nmax_inflight must be at least 1");
        Self { nmax_inflight, flows: HashMap::new() }
    }

    pub fn nmax_inflight(&self) -> usize {
        self.nmax_inflight
    }

    /// Assign the next sequence number of the flow. Numbers are handed out
    /// in strict allocation order and wrap mod 4096; a number still tracked
    /// as in-flight or retry-pending is never reissued.
    pub fn allocate(&mut self, key: FlowKey) -> u16 {
        let flow = self.flows.entry(key).or_default();
        let seq = flow.next_seq;
        assert!(
            !flow.units.contains_key(&seq),
            "sequence number {} of flow {:?} still tracked at wrap-around",
            seq,
            key
        );
        flow.next_seq = (seq + 1) % SEQ_MODULUS;
        flow.units.insert(seq, UnitState::default());
        seq
    }

    pub fn is_tracked(&self, key: FlowKey, seq: u16) -> bool {
        self.flows.get(&key).is_some_and(|f| f.units.contains_key(&seq))
    }

    pub fn inflight_links(&self, key: FlowKey, seq: u16) -> usize {
        self.flows
            .get(&key)
            .and_then(|f| f.units.get(&seq))
            .map(|u| u.links.len())
            .unwrap_or(0)
    }

    pub fn is_inflight_on(&self, key: FlowKey, seq: u16, link: LinkId) -> bool {
        self.flows
            .get(&key)
            .and_then(|f| f.units.get(&seq))
            .is_some_and(|u| u.links.contains(&link))
    }

    pub fn is_retry(&self, key: FlowKey, seq: u16) -> bool {
        self.flows
            .get(&key)
            .and_then(|f| f.units.get(&seq))
            .is_some_and(|u| u.retry)
    }

    /// Add `link` to the unit's in-flight set. The caller must stay below
    /// the configured bound; exceeding it fails and changes nothing. Marking
    /// a link the unit is already in flight on is a no-op.
    pub fn mark_inflight(&mut self, key: FlowKey, seq: u16, link: LinkId) -> Result<(), SeqAckError> {
        let unit = self
            .flows
            .get_mut(&key)
            .and_then(|f| f.units.get_mut(&seq))
            .unwrap_or_else(|| panic!("mark_inflight for unallocated unit {} of flow {:?}", seq, key));

        if unit.links.contains(&link) {
            return Ok(());
        }
        if unit.links.len() >= self.nmax_inflight {
            return Err(SeqAckError::ConcurrencyExceeded { seq, limit: self.nmax_inflight });
        }
        unit.links.push(link);
        Ok(())
    }

    /// Reconcile one acknowledgment bitmap received on `link`.
    ///
    /// Every acknowledged unit is removed from the tracking of all links at
    /// once. Every unacknowledged unit that was in flight specifically on
    /// `link` has that link cleared and its retry flag set; it stays queued
    /// and may be reallocated onto any active link, including `link`.
    /// Acknowledged sequence numbers the engine does not know are logged and
    /// ignored, which also makes reapplying a bitmap idempotent.
    pub fn apply_ack(&mut self, key: FlowKey, link: LinkId, bitmap: &AckBitmap) -> AckOutcome {
        let mut outcome = AckOutcome::default();

        let Some(flow) = self.flows.get_mut(&key) else {
            for seq in bitmap.received_seqs() {
                tracing::debug!("ack reconciliation miss: unknown flow {:?}, seq {}", key, seq);
            }
            return outcome;
        };

        for seq in bitmap.received_seqs() {
            if flow.units.remove(&seq).is_some() {
                outcome.delivered.push(seq);
            } else {
                tracing::debug!("ack reconciliation miss: seq {} not tracked in flow {:?}", seq, key);
            }
        }

        for (seq, unit) in flow.units.iter_mut() {
            if let Some(pos) = unit.links.iter().position(|l| *l == link) {
                unit.links.remove(pos);
                unit.retry = true;
                outcome.retry_flagged.push(*seq);
            }
        }

        outcome
    }

    /// External timeout: the unit is considered lost on all links it was in
    /// flight on and becomes retry-eligible.
    pub fn declare_lost(&mut self, key: FlowKey, seq: u16) {
        if let Some(unit) = self.flows.get_mut(&key).and_then(|f| f.units.get_mut(&seq)) {
            tracing::debug!("unit {} of flow {:?} declared lost on {:?}", seq, key, unit.links);
            unit.links.clear();
            unit.retry = true;
        }
    }

    /// Stop tracking a unit without a delivery confirmation. Used for
    /// group-addressed units, which are never acknowledged.
    pub fn release(&mut self, key: FlowKey, seq: u16) {
        if let Some(flow) = self.flows.get_mut(&key) {
            flow.units.remove(&seq);
        }
    }

    /// Tracked sequence numbers of the flow, in sequence order
    pub fn tracked_seqs(&self, key: FlowKey) -> Vec<u16> {
        self.flows
            .get(&key)
            .map(|f| f.units.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Teardown of an MLD pair: drop all sequencing state of flows between
    /// the two addresses, in either direction. In-flight records are
    /// dropped, not flushed.
    pub fn drop_flows_between(&mut self, a: Mac48, b: Mac48) {
        self.flows.retain(|key, _| {
            !((key.originator == a && key.receiver == b) || (key.originator == b && key.receiver == a))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIG: Mac48 = Mac48([0, 0xC0, 0, 0, 0, 0x10]);
    const RECV: Mac48 = Mac48([0, 0xC0, 0, 1, 0, 0x20]);

    fn key() -> FlowKey {
        FlowKey { originator: ORIG, receiver: RECV, tid: 0 }
    }

    fn bitmap(start: u16, acked: &[u16]) -> AckBitmap {
        let mut bm = AckBitmap::new(start);
        for seq in acked {
            assert!(bm.set_received(*seq));
        }
        bm
    }

    #[test]
    fn test_allocation_monotonic() {
        let mut engine = SeqAckEngine::new(1);
        assert_eq!(engine.allocate(key()), 0);
        assert_eq!(engine.allocate(key()), 1);
        assert_eq!(engine.allocate(key()), 2);
        // Independent flows have independent counters
        let other = FlowKey { tid: 5, ..key() };
        assert_eq!(engine.allocate(other), 0);
    }

    #[test]
    fn test_concurrency_bound_enforced() {
        let mut engine = SeqAckEngine::new(1);
        let seq = engine.allocate(key());
        assert_eq!(engine.mark_inflight(key(), seq, 0), Ok(()));
        // Same link again is a no-op
        assert_eq!(engine.mark_inflight(key(), seq, 0), Ok(()));
        assert_eq!(
            engine.mark_inflight(key(), seq, 1),
            Err(SeqAckError::ConcurrencyExceeded { seq, limit: 1 })
        );
        assert_eq!(engine.inflight_links(key(), seq), 1);
    }

    #[test]
    fn test_bound_of_two() {
        let mut engine = SeqAckEngine::new(2);
        let seq = engine.allocate(key());
        assert_eq!(engine.mark_inflight(key(), seq, 0), Ok(()));
        assert_eq!(engine.mark_inflight(key(), seq, 1), Ok(()));
        assert!(engine.mark_inflight(key(), seq, 2).is_err());
    }

    #[test]
    fn test_ack_removes_from_all_links() {
        let mut engine = SeqAckEngine::new(2);
        let seq = engine.allocate(key());
        engine.mark_inflight(key(), seq, 0).unwrap();
        engine.mark_inflight(key(), seq, 1).unwrap();

        // Acknowledgment arrives on link 1; the unit leaves both links
        let outcome = engine.apply_ack(key(), 1, &bitmap(0, &[seq]));
        assert_eq!(outcome.delivered, vec![seq]);
        assert!(!engine.is_tracked(key(), seq));
    }

    #[test]
    fn test_unacked_on_link_becomes_retry() {
        let mut engine = SeqAckEngine::new(1);
        let s0 = engine.allocate(key());
        let s1 = engine.allocate(key());
        engine.mark_inflight(key(), s0, 0).unwrap();
        engine.mark_inflight(key(), s1, 1).unwrap();

        // Bitmap on link 0 acks s0 only; s1 was on link 1, stays untouched
        let outcome = engine.apply_ack(key(), 0, &bitmap(0, &[s0]));
        assert_eq!(outcome.delivered, vec![s0]);
        assert!(outcome.retry_flagged.is_empty());
        assert!(engine.is_inflight_on(key(), s1, 1));
        assert!(!engine.is_retry(key(), s1));

        // Bitmap on link 1 acks nothing; s1 becomes retry-eligible
        let outcome = engine.apply_ack(key(), 1, &bitmap(0, &[]));
        assert_eq!(outcome.retry_flagged, vec![s1]);
        assert!(engine.is_retry(key(), s1));
        assert_eq!(engine.inflight_links(key(), s1), 0);
        // Retrying on the acknowledged link itself is allowed
        assert_eq!(engine.mark_inflight(key(), s1, 1), Ok(()));
    }

    #[test]
    fn test_apply_ack_idempotent() {
        let mut engine = SeqAckEngine::new(1);
        let s0 = engine.allocate(key());
        let s1 = engine.allocate(key());
        engine.mark_inflight(key(), s0, 0).unwrap();
        engine.mark_inflight(key(), s1, 0).unwrap();

        let bm = bitmap(0, &[s0, s1]);
        let first = engine.apply_ack(key(), 0, &bm);
        assert_eq!(first.delivered, vec![s0, s1]);

        // Same bitmap again: everything already delivered, nothing changes
        let second = engine.apply_ack(key(), 0, &bm);
        assert_eq!(second, AckOutcome::default());
        assert!(engine.tracked_seqs(key()).is_empty());
    }

    #[test]
    fn test_unknown_seq_ignored() {
        let mut engine = SeqAckEngine::new(1);
        let seq = engine.allocate(key());
        engine.mark_inflight(key(), seq, 0).unwrap();

        // Acks a sequence number the engine never allocated
        let outcome = engine.apply_ack(key(), 0, &bitmap(40, &[41]));
        assert!(outcome.delivered.is_empty());
        // The tracked unit was in flight on the acked link and unacked
        assert_eq!(outcome.retry_flagged, vec![seq]);
        assert!(engine.is_tracked(key(), seq));
    }

    #[test]
    fn test_declare_lost() {
        let mut engine = SeqAckEngine::new(2);
        let seq = engine.allocate(key());
        engine.mark_inflight(key(), seq, 0).unwrap();
        engine.mark_inflight(key(), seq, 1).unwrap();

        engine.declare_lost(key(), seq);
        assert_eq!(engine.inflight_links(key(), seq), 0);
        assert!(engine.is_retry(key(), seq));
        assert!(engine.is_tracked(key(), seq));
    }

    #[test]
    fn test_teardown_drops_both_directions() {
        let mut engine = SeqAckEngine::new(1);
        let forward = key();
        let reverse = FlowKey { originator: RECV, receiver: ORIG, tid: 3 };
        let unrelated = FlowKey { originator: ORIG, receiver: Mac48([9; 6]), tid: 0 };
        engine.allocate(forward);
        engine.allocate(reverse);
        engine.allocate(unrelated);

        engine.drop_flows_between(ORIG, RECV);
        assert!(engine.tracked_seqs(forward).is_empty());
        assert!(engine.tracked_seqs(reverse).is_empty());
        assert_eq!(engine.tracked_seqs(unrelated).len(), 1);
    }

    #[test]
    fn test_release_untracks() {
        let mut engine = SeqAckEngine::new(1);
        let seq = engine.allocate(key());
        engine.release(key(), seq);
        assert!(!engine.is_tracked(key(), seq));
    }
}
