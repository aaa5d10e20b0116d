#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Order Service - Order Session Orchestrator
//!
//! Accumulates order items per session and reserves stock against the
//! inventory service when an order is finalized.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: order values and the session store
//! - **Application**: the orchestrator and its inventory port
//! - **Infrastructure**: gRPC server, inventory client, config, health,
//!   metrics and telemetry
//!
//! The orchestrator holds no product state. Every stock read or write goes
//! through [`InventoryPort`], and the session lock is never held across a
//! call to it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Order values and sessions.
pub mod domain;

/// Application layer - Orchestration and ports.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::ports::{InventoryPort, InventoryPortError};
pub use application::services::OrderOrchestrator;
pub use domain::order::{FinalizeOutcome, ItemResult, OrderItem, ProductSnapshot};
pub use domain::session::OrderSessionStore;
pub use infrastructure::config::{ConfigError, OrderConfig};
pub use infrastructure::grpc::OrderServer;
pub use infrastructure::grpc::proto::stockroom::v1 as proto;
pub use infrastructure::inventory_client::GrpcInventoryClient;
pub use infrastructure::metrics::init_metrics;
