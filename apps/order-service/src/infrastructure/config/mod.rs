//! Configuration Module
//!
//! Environment-driven settings for the order service.

mod settings;

pub use settings::{ConfigError, OrderConfig};
