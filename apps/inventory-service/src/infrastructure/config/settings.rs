//! Inventory Service Settings
//!
//! Loaded from environment variables. Unset variables fall back to defaults;
//! set but unparseable values are rejected.

use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration for the inventory service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    /// gRPC listen port.
    pub grpc_port: u16,
    /// Health and metrics HTTP port.
    pub health_port: u16,
    /// Scan period for low-stock subscriptions.
    pub low_stock_interval: Duration,
    /// Outbound channel capacity per streaming RPC.
    pub stream_buffer: usize,
    /// Seed the ledger with the sample catalog at startup.
    pub seed_catalog: bool,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            grpc_port: 50051,
            health_port: 8081,
            low_stock_interval: Duration::from_secs(5),
            stream_buffer: 128,
            seed_catalog: true,
        }
    }
}

impl InventoryConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an empty or invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an empty or invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let interval_ms: u64 = parse_or(&lookup, "INVENTORY_LOW_STOCK_INTERVAL_MS", 5000)?;
        if interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "INVENTORY_LOW_STOCK_INTERVAL_MS".to_string(),
                value: "0".to_string(),
            });
        }

        let stream_buffer = parse_or(&lookup, "INVENTORY_STREAM_BUFFER", defaults.stream_buffer)?;
        if stream_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "INVENTORY_STREAM_BUFFER".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(Self {
            grpc_port: parse_or(&lookup, "INVENTORY_GRPC_PORT", defaults.grpc_port)?,
            health_port: parse_or(&lookup, "INVENTORY_HEALTH_PORT", defaults.health_port)?,
            low_stock_interval: Duration::from_millis(interval_ms),
            stream_buffer,
            seed_catalog: parse_or(&lookup, "INVENTORY_SEED_CATALOG", defaults.seed_catalog)?,
        })
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Rejected value.
        value: String,
    },
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyValue(key.to_string()));
    }
    trimmed.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.clone(),
    })
}
