//! Order Types
//!
//! Values flowing through an order session: the items a client builds up,
//! the advisory checks returned while building, and the outcomes of
//! finalize, confirm and cancel.

/// Client-chosen session identifier.
pub type SessionId = String;

// =============================================================================
// Outcome Messages
// =============================================================================

/// Item reserved.
pub const RESERVED: &str = "Reserved";
/// Pre-check failed or the product lookup failed.
pub const INSUFFICIENT_STOCK: &str = "Insufficient stock";
/// The decrement itself failed.
pub const RESERVATION_FAILED: &str = "Reservation failed";
/// Every item reserved.
pub const ORDER_FINALIZED: &str = "Order finalized";
/// At least one item was not reserved.
pub const ITEMS_FAILED: &str = "One or more items failed";
/// Every confirm decrement applied.
pub const STOCK_CONFIRMED: &str = "Stock confirmed";
/// A confirm decrement failed.
pub const STOCK_ERROR: &str = "Stock error";
/// Session dropped.
pub const ORDER_CANCELLED: &str = "Order cancelled and reservations released";
/// No open session with that identifier.
pub const SESSION_NOT_FOUND: &str = "Session not found";

// =============================================================================
// Items
// =============================================================================

/// One requested line in an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    /// Product to order.
    pub product_id: String,
    /// Units requested.
    pub quantity: i32,
}

impl OrderItem {
    /// Create an order item.
    #[must_use]
    pub fn new(product_id: impl Into<String>, quantity: i32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// One inbound message of an order-building stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOrderItem {
    /// Session the item belongs to.
    pub session_id: SessionId,
    /// Product to order.
    pub product_id: String,
    /// Units requested.
    pub requested_quantity: i32,
}

/// Advisory availability for one built item. Nothing is reserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityCheck {
    /// Product checked.
    pub product_id: String,
    /// `current_quantity >= requested_quantity` at check time.
    pub available: bool,
    /// Quantity reported by the ledger.
    pub current_quantity: i32,
}

/// A product record as reported by the inventory service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    /// Product identifier.
    pub product_id: String,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Free-text category.
    pub category: String,
    /// Soft-delete marker.
    pub discontinued: bool,
    /// Units on hand.
    pub available_quantity: i32,
    /// `available_quantity > 0`.
    pub is_available: bool,
}

// =============================================================================
// Outcomes
// =============================================================================

/// Per-item result of a finalize call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    /// Product attempted.
    pub product_id: String,
    /// Whether stock was decremented.
    pub reserved: bool,
    /// One of [`RESERVED`], [`INSUFFICIENT_STOCK`], [`RESERVATION_FAILED`].
    pub message: String,
}

impl ItemResult {
    pub(crate) fn new(product_id: &str, reserved: bool, message: &str) -> Self {
        Self {
            product_id: product_id.to_string(),
            reserved,
            message: message.to_string(),
        }
    }
}

/// Result of finalizing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeOutcome {
    /// True iff every item was reserved.
    pub success: bool,
    /// [`ORDER_FINALIZED`] or [`ITEMS_FAILED`].
    pub message: String,
    /// One result per supplied item, in input order.
    pub item_results: Vec<ItemResult>,
}

impl FinalizeOutcome {
    /// Aggregate per-item results.
    #[must_use]
    pub fn from_results(item_results: Vec<ItemResult>) -> Self {
        let success = item_results.iter().all(|r| r.reserved);
        let message = if success { ORDER_FINALIZED } else { ITEMS_FAILED };
        Self {
            success,
            message: message.to_string(),
            item_results,
        }
    }
}

/// Result of confirming stock for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmOutcome {
    /// True iff every decrement applied.
    pub success: bool,
    /// [`STOCK_CONFIRMED`] or [`STOCK_ERROR`].
    pub message: String,
}

/// Result of cancelling an order session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelOutcome {
    /// Whether an open session was dropped.
    pub released: bool,
    /// [`ORDER_CANCELLED`] or [`SESSION_NOT_FOUND`].
    pub message: String,
}
