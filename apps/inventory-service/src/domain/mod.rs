//! Domain Layer
//!
//! Product records and the ledger that owns them. No transport concerns.

/// Thread-safe product ledger.
pub mod ledger;

/// Product, adjustment, filter and reservation types.
pub mod product;
