//! Application Layer
//!
//! Long-running services built on the ledger's read path.

/// Application services.
pub mod services;
