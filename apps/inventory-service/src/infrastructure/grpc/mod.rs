//! gRPC Server
//!
//! Implements `stockroom.v1.InventoryService` over the ledger.
//!
//! # Streaming RPCs
//!
//! - `BulkStockUpdate`: client stream drained into [`InventoryLedger::bulk_adjust`]
//! - `ListProducts`: snapshot taken under the lock, then streamed
//! - `SubscribeLowStockAlerts`: one [`LowStockMonitor`] task per call
//! - `InteractiveOrderStock`: one task per stream, one atomic reservation per
//!   inbound item, responses in request order
//!
//! Every streaming task stops when the server-wide shutdown token fires or the
//! client goes away.
//!
//! [`InventoryLedger::bulk_adjust`]: crate::domain::ledger::InventoryLedger::bulk_adjust
//! [`LowStockMonitor`]: crate::application::services::LowStockMonitor

pub mod server;

// Allow clippy warnings and missing docs in generated code
#[allow(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
pub mod proto {
    pub mod stockroom {
        pub mod v1 {
            include!(concat!(env!("OUT_DIR"), "/stockroom.v1.rs"));
        }
    }
}

pub use server::{ERROR_DOMAIN, InventoryServer, PRODUCT_NOT_FOUND_REASON};
