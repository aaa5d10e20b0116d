//! Inventory Port (Driven Port)
//!
//! Interface to the authoritative stock ledger. The orchestrator never
//! touches product state except through this trait.

use async_trait::async_trait;

use crate::domain::order::ProductSnapshot;

/// Inventory port error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryPortError {
    /// The ledger has no such product.
    #[error("product not found: {product_id}")]
    NotFound {
        /// The missing product.
        product_id: String,
    },

    /// The ledger answered but refused the operation.
    #[error("inventory rejected operation: {message}")]
    Rejected {
        /// Message reported by the ledger.
        message: String,
    },

    /// The ledger could not be reached or failed the call.
    #[error("inventory unavailable: {message}")]
    Unavailable {
        /// Transport or status details.
        message: String,
    },
}

/// Port for inventory interactions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryPort: Send + Sync {
    /// Fetch the current product record. Never mutates.
    async fn get_product(&self, product_id: &str) -> Result<ProductSnapshot, InventoryPortError>;

    /// Apply a signed quantity delta.
    async fn adjust_stock(
        &self,
        product_id: &str,
        quantity_change: i32,
        reason: &str,
    ) -> Result<(), InventoryPortError>;
}
