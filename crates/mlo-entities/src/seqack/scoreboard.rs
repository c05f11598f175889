use mlo_core::{seq_distance, SEQ_MODULUS};
use mlo_pdus::elements::{AckBitmap, ACK_WINDOW};

/// Distance past the window at which an arriving sequence number is treated
/// as a stale retransmission rather than as new traffic
const STALE_DISTANCE: u16 = SEQ_MODULUS - 2 * ACK_WINDOW;

/// Receive-side scoreboard of one flow. Records which sequence numbers have
/// been received within the current 64-entry window, answers duplicate
/// queries and produces the acknowledgment bitmap reported back to the
/// originator.
#[derive(Debug, Default)]
pub struct RxScoreboard {
    bitmap: Option<AckBitmap>,
}

impl RxScoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one received sequence number. Returns true when the unit is
    /// new, false for duplicates and stale retransmissions.
    pub fn record(&mut self, seq: u16) -> bool {
        let Some(bitmap) = &mut self.bitmap else {
            let mut bm = AckBitmap::new(seq);
            bm.set_received(seq);
            self.bitmap = Some(bm);
            return true;
        };

        if bitmap.is_packet_received(seq) {
            return false;
        }
        if bitmap.set_received(seq) {
            return true;
        }

        // Outside the window. Behind the start it is a stale retransmission;
        // ahead of it the window moves on, losing the oldest history.
        if seq_distance(bitmap.starting_seq(), seq) >= STALE_DISTANCE {
            tracing::debug!("stale seq {} behind scoreboard window {}", seq, bitmap.starting_seq());
            return false;
        }
        tracing::debug!("scoreboard window advances from {} to {}", bitmap.starting_seq(), seq);
        let mut bm = AckBitmap::new(seq);
        bm.set_received(seq);
        *bitmap = bm;
        true
    }

    /// Current acknowledgment bitmap, None before the first reception
    pub fn ack_bitmap(&self) -> Option<AckBitmap> {
        self.bitmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_and_dedupes() {
        let mut board = RxScoreboard::new();
        assert!(board.record(0));
        assert!(board.record(1));
        assert!(!board.record(0));
        assert!(!board.record(1));
        assert!(board.record(63));
        assert!(!board.record(63));

        let bm = board.ack_bitmap().unwrap();
        assert!(bm.is_packet_received(0));
        assert!(bm.is_packet_received(1));
        assert!(!bm.is_packet_received(2));
        assert!(bm.is_packet_received(63));
    }

    #[test]
    fn test_empty_board_has_no_bitmap() {
        assert!(RxScoreboard::new().ack_bitmap().is_none());
    }

    #[test]
    fn test_window_advance() {
        let mut board = RxScoreboard::new();
        assert!(board.record(0));
        assert!(board.record(100));
        // New window is based at 100; the old history is gone
        let bm = board.ack_bitmap().unwrap();
        assert_eq!(bm.starting_seq(), 100);
        assert!(bm.is_packet_received(100));
    }

    #[test]
    fn test_stale_seq_ignored() {
        let mut board = RxScoreboard::new();
        assert!(board.record(200));
        // 150 lies well behind the window base: stale, not a re-base
        assert!(!board.record(150));
        assert_eq!(board.ack_bitmap().unwrap().starting_seq(), 200);
    }
}
