//! Configuration Module
//!
//! Environment-driven settings for the inventory service.

mod settings;

pub use settings::{ConfigError, InventoryConfig};
