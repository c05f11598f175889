//! MLO station configuration management
//!
//! This crate provides configuration loading and parsing for the MLO stack:
//! - TOML configuration file parsing
//! - Stack configuration structures

pub mod stack_config;
pub mod toml_config;

pub use stack_config::*;
pub use toml_config::*;
