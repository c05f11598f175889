//! Service access point primitives of the MLO station stack
//!
//! Typed messages exchanged between the entities through the message router.

pub mod data;
pub mod mlme;
pub mod phy;
pub mod sapmsg;

pub use sapmsg::{SapMsg, SapMsgInner};
