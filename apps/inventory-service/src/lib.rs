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

//! Inventory Service - Authoritative Stock Ledger
//!
//! Owns the product catalog in process memory and serves it over gRPC.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: products and the ledger
//!   - `product`: catalog records, adjustments, filters, reservations
//!   - `ledger`: the single-lock product map
//!
//! - **Application**: services built on the ledger
//!   - `services`: low-stock monitor
//!
//! - **Infrastructure**: adapters
//!   - `grpc`: `InventoryService` server
//!   - `config`: environment settings
//!   - `health`: health, readiness and metrics HTTP endpoint
//!   - `metrics`: Prometheus recorder
//!   - `telemetry`: tracing subscriber and OTLP export
//!
//! # Concurrency
//!
//! Every ledger operation is one critical section under one lock. Streaming
//! RPCs run one task per stream and never hold the lock across a send.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Products and the ledger.
pub mod domain;

/// Application layer - Services built on the ledger.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::services::{LowStockAlert, LowStockMonitor};
pub use domain::ledger::{BulkAdjustError, BulkAdjustSummary, InventoryLedger, LedgerError};
pub use domain::product::{
    Product, ProductFilter, ProductId, Reservation, StockAdjustment, sample_catalog,
};
pub use infrastructure::config::{ConfigError, InventoryConfig};
pub use infrastructure::grpc::InventoryServer;
pub use infrastructure::grpc::proto::stockroom::v1 as proto;
pub use infrastructure::metrics::init_metrics;
