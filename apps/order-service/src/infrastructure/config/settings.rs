//! Order Service Settings
//!
//! Loaded from environment variables. `INVENTORY_SERVICE_URL` is required;
//! everything else has a default.

use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration for the order service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfig {
    /// gRPC listen port.
    pub grpc_port: u16,
    /// Health and metrics HTTP port.
    pub health_port: u16,
    /// Inventory service endpoint, e.g. `http://localhost:50051`.
    pub inventory_url: String,
    /// Per-call timeout for inventory requests.
    pub inventory_timeout: Duration,
    /// Outbound channel capacity per streaming RPC.
    pub stream_buffer: usize,
}

impl OrderConfig {
    /// Default gRPC port.
    pub const DEFAULT_GRPC_PORT: u16 = 50052;
    /// Default health port.
    pub const DEFAULT_HEALTH_PORT: u16 = 8082;
    /// Default inventory call timeout.
    pub const DEFAULT_INVENTORY_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default stream buffer.
    pub const DEFAULT_STREAM_BUFFER: usize = 128;

    /// Configuration with defaults for everything except the inventory URL.
    #[must_use]
    pub fn with_inventory_url(inventory_url: impl Into<String>) -> Self {
        Self {
            grpc_port: Self::DEFAULT_GRPC_PORT,
            health_port: Self::DEFAULT_HEALTH_PORT,
            inventory_url: inventory_url.into(),
            inventory_timeout: Self::DEFAULT_INVENTORY_TIMEOUT,
            stream_buffer: Self::DEFAULT_STREAM_BUFFER,
        }
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `INVENTORY_SERVICE_URL` is missing or
    /// malformed, or another variable is set to an empty or invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`OrderConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let inventory_url = lookup("INVENTORY_SERVICE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("INVENTORY_SERVICE_URL".to_string()))?;
        let inventory_url = inventory_url.trim().to_string();
        if inventory_url.is_empty() {
            return Err(ConfigError::EmptyValue("INVENTORY_SERVICE_URL".to_string()));
        }
        if !(inventory_url.starts_with("http://") || inventory_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(inventory_url));
        }

        let timeout_ms: u64 = parse_or(&lookup, "ORDER_INVENTORY_TIMEOUT_MS", 5000)?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ORDER_INVENTORY_TIMEOUT_MS".to_string(),
                value: "0".to_string(),
            });
        }

        let stream_buffer = parse_or(&lookup, "ORDER_STREAM_BUFFER", Self::DEFAULT_STREAM_BUFFER)?;
        if stream_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ORDER_STREAM_BUFFER".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(Self {
            grpc_port: parse_or(&lookup, "ORDER_GRPC_PORT", Self::DEFAULT_GRPC_PORT)?,
            health_port: parse_or(&lookup, "ORDER_HEALTH_PORT", Self::DEFAULT_HEALTH_PORT)?,
            inventory_url,
            inventory_timeout: Duration::from_millis(timeout_ms),
            stream_buffer,
        })
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
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
    /// Inventory URL lacks an http or https scheme.
    #[error("INVENTORY_SERVICE_URL must start with http:// or https://, got {0:?}")]
    InvalidUrl(String),
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
