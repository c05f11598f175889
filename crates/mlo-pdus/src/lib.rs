//! Wire codecs for the MLO station stack
//!
//! Elements (Reduced Neighbor Report, Multi-Link element, acknowledgment
//! bitmap) and the frame types exchanged between MLDs. All codecs are strict
//! round-trip pairs over `mlo_core::ByteBuffer`.

pub mod elements;
pub mod frames;
