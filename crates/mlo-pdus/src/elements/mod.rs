pub mod block_ack;
pub mod mle;
pub mod rnr;

pub use block_ack::{AckBitmap, ACK_WINDOW};
pub use mle::{MultiLinkElement, PerStaProfile};
pub use rnr::{MldParameters, NeighborApInfo, ReducedNeighborReport, TbttInfo};

/// Element IDs used by the management frame bodies
pub const ELEM_SSID: u8 = 0;
pub const ELEM_RNR: u8 = 201;
pub const ELEM_EXTENSION: u8 = 255;

/// Element ID extension of the Multi-Link element
pub const ELEM_EXT_MULTI_LINK: u8 = 107;
