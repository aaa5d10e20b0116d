//! gRPC Server
//!
//! Implements `stockroom.v1.OrderService`. The generated module also carries
//! the `InventoryService` client used by the inventory adapter.

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

pub use server::OrderServer;
