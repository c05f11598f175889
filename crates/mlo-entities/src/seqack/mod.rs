pub mod engine;
pub mod scoreboard;

pub use engine::{AckOutcome, FlowKey, SeqAckEngine, SeqAckError};
pub use scoreboard::RxScoreboard;
