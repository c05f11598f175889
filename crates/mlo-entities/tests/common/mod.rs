pub mod component_test;
pub mod sink;

pub use component_test::{ap_config, sta_config, ComponentTest};
pub use sink::Sink;
