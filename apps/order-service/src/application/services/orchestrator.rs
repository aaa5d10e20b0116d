//! Order Orchestrator
//!
//! Drives an order session from build to finalize or cancel.
//!
//! ```text
//! BuildOrder items ──► session store (append) ──► get_product (advisory)
//!                                                       │
//! FinalizeOrder ──► per item: get_product ──► adjust_stock(-qty) ──► clear session
//! CancelOrder   ──► clear session
//! ```
//!
//! Building never reserves. Finalize re-checks each item and decrements it
//! through the port; there is no rollback when a later item fails, and the
//! session is cleared either way.

use std::sync::Arc;

use crate::application::ports::{InventoryPort, InventoryPortError};
use crate::domain::order::{
    AvailabilityCheck, BuildOrderItem, CancelOutcome, ConfirmOutcome, FinalizeOutcome,
    INSUFFICIENT_STOCK, ItemResult, ORDER_CANCELLED, OrderItem, ProductSnapshot,
    RESERVATION_FAILED, RESERVED, SESSION_NOT_FOUND, STOCK_CONFIRMED, STOCK_ERROR,
};
use crate::domain::session::OrderSessionStore;
use crate::infrastructure::metrics;

/// Coordinates the session store with the inventory port.
pub struct OrderOrchestrator {
    inventory: Arc<dyn InventoryPort>,
    sessions: Arc<OrderSessionStore>,
}

impl std::fmt::Debug for OrderOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderOrchestrator")
            .field("open_sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl OrderOrchestrator {
    /// Create a new orchestrator.
    #[must_use]
    pub fn new(inventory: Arc<dyn InventoryPort>, sessions: Arc<OrderSessionStore>) -> Self {
        Self {
            inventory,
            sessions,
        }
    }

    /// The session store.
    #[must_use]
    pub fn sessions(&self) -> &Arc<OrderSessionStore> {
        &self.sessions
    }

    /// Pass-through product lookup.
    ///
    /// # Errors
    ///
    /// Returns the port error unchanged.
    pub async fn check_item_availability(
        &self,
        product_id: &str,
    ) -> Result<ProductSnapshot, InventoryPortError> {
        self.inventory.get_product(product_id).await
    }

    /// Record one built item and report advisory availability.
    ///
    /// The item is appended before the lookup, so it stays recorded even
    /// when the lookup fails.
    ///
    /// # Errors
    ///
    /// Returns the port error from the lookup.
    pub async fn record_and_check(
        &self,
        item: BuildOrderItem,
    ) -> Result<AvailabilityCheck, InventoryPortError> {
        let count = self.sessions.append(
            &item.session_id,
            OrderItem::new(item.product_id.clone(), item.requested_quantity),
        );
        metrics::set_open_sessions(self.sessions.len());
        tracing::debug!(
            session_id = %item.session_id,
            product_id = %item.product_id,
            items = count,
            "Item recorded"
        );

        let product = self.inventory.get_product(&item.product_id).await?;
        Ok(AvailabilityCheck {
            product_id: item.product_id,
            available: product.available_quantity >= item.requested_quantity,
            current_quantity: product.available_quantity,
        })
    }

    /// Reserve every supplied item, then close the session.
    ///
    /// Items are processed in order. Earlier reservations are kept when a
    /// later item fails. The session is cleared whether or not it was open.
    pub async fn finalize_order(&self, session_id: &str, items: &[OrderItem]) -> FinalizeOutcome {
        let reason = format!("order {session_id} finalize");
        let mut results = Vec::with_capacity(items.len());

        for item in items {
            let result = self.reserve_item(item, &reason).await;
            metrics::record_item_reservation(result.reserved);
            results.push(result);
        }

        self.sessions.clear(session_id);
        metrics::set_open_sessions(self.sessions.len());

        let outcome = FinalizeOutcome::from_results(results);
        tracing::info!(
            session_id,
            items = items.len(),
            success = outcome.success,
            "Order finalized"
        );
        outcome
    }

    async fn reserve_item(&self, item: &OrderItem, reason: &str) -> ItemResult {
        match self.inventory.get_product(&item.product_id).await {
            Ok(product) if product.available_quantity >= item.quantity => {}
            Ok(product) => {
                tracing::info!(
                    product_id = %item.product_id,
                    requested = item.quantity,
                    available = product.available_quantity,
                    "Insufficient stock"
                );
                return ItemResult::new(&item.product_id, false, INSUFFICIENT_STOCK);
            }
            Err(e) => {
                tracing::info!(product_id = %item.product_id, error = %e, "Stock check failed");
                return ItemResult::new(&item.product_id, false, INSUFFICIENT_STOCK);
            }
        }

        match self
            .inventory
            .adjust_stock(&item.product_id, item.quantity.saturating_neg(), reason)
            .await
        {
            Ok(()) => ItemResult::new(&item.product_id, true, RESERVED),
            Err(e) => {
                tracing::warn!(product_id = %item.product_id, error = %e, "Reservation failed");
                ItemResult::new(&item.product_id, false, RESERVATION_FAILED)
            }
        }
    }

    /// Decrement every supplied item without a pre-check.
    ///
    /// Stops at the first failure. Earlier decrements are kept. The session
    /// store is not touched.
    pub async fn confirm_order_stock(&self, session_id: &str, items: &[OrderItem]) -> ConfirmOutcome {
        let reason = format!("order {session_id} confirm");

        for item in items {
            if let Err(e) = self
                .inventory
                .adjust_stock(&item.product_id, item.quantity.saturating_neg(), &reason)
                .await
            {
                tracing::warn!(
                    session_id,
                    product_id = %item.product_id,
                    error = %e,
                    "Stock confirmation failed"
                );
                return ConfirmOutcome {
                    success: false,
                    message: STOCK_ERROR.to_string(),
                };
            }
        }

        tracing::info!(session_id, items = items.len(), "Stock confirmed");
        ConfirmOutcome {
            success: true,
            message: STOCK_CONFIRMED.to_string(),
        }
    }

    /// Drop a session. Never touches stock.
    pub fn cancel_order(&self, session_id: &str) -> CancelOutcome {
        let released = self.sessions.clear(session_id);
        metrics::set_open_sessions(self.sessions.len());
        tracing::info!(session_id, released, "Order cancel requested");

        CancelOutcome {
            released,
            message: if released { ORDER_CANCELLED } else { SESSION_NOT_FOUND }.to_string(),
        }
    }
}
