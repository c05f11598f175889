//! Protocol entities of the MLO station stack
//!
//! The AP-side and STA-side MAC entities (link-setup coordination and the
//! data plane), the cross-link sequencing/acknowledgment engine, the
//! affiliated-AP resolver and the message router that drives everything off
//! one discrete tick clock.

pub mod ap_mac;
pub mod assoc;
pub mod data_plane;
pub mod entity_trait;
pub mod links;
pub mod medium;
pub mod messagerouter;
pub mod peers;
pub mod seqack;
pub mod sta_mac;

pub use entity_trait::MloEntityTrait;
pub use messagerouter::{MessageQueue, MessageRouter};
