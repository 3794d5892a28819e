//! Configuration Module
//!
//! Handles configuration loading and validation.

pub mod manager;
pub mod types;

pub use manager::{ConfigManager, ENV_PREFIX};
pub use types::*;
