//! Product Types
//!
//! Domain types for catalog records and the values applied to them.
//! These types carry no transport concerns; the gRPC layer converts
//! to and from the protobuf messages.

/// Product identifier.
pub type ProductId = String;

// =============================================================================
// Product
// =============================================================================

/// A catalog record owned by the ledger.
///
/// `is_available` is derived from `available_quantity` and is recomputed by
/// the ledger on every mutation, so callers never need to keep it in sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Unique product identifier.
    pub product_id: ProductId,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Free-text category, matched exactly by list filters.
    pub category: String,
    /// Soft-delete marker. Discontinued products stay queryable.
    pub discontinued: bool,
    /// Units on hand. May go negative: adjustments are not floored.
    pub available_quantity: i32,
    /// `available_quantity > 0`.
    pub is_available: bool,
}

impl Product {
    /// Create a new active product with the availability flag derived.
    #[must_use]
    pub fn new(
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        available_quantity: i32,
    ) -> Self {
        let mut product = Self {
            product_id: product_id.into(),
            name: name.into(),
            description: description.into(),
            category: category.into(),
            discontinued: false,
            available_quantity,
            is_available: false,
        };
        product.refresh_availability();
        product
    }

    /// Recompute `is_available` from the current quantity.
    pub const fn refresh_availability(&mut self) {
        self.is_available = self.available_quantity > 0;
    }

    /// Apply a signed delta to the quantity.
    ///
    /// Saturates at the `i32` bounds instead of wrapping.
    pub const fn apply_delta(&mut self, delta: i32) {
        self.available_quantity = self.available_quantity.saturating_add(delta);
        self.refresh_availability();
    }

    fn matches(&self, filter: &ProductFilter) -> bool {
        if self.discontinued && !filter.include_discontinued {
            return false;
        }
        filter
            .category
            .as_deref()
            .is_none_or(|category| category.is_empty() || self.category == category)
    }
}

// =============================================================================
// Adjustments and Queries
// =============================================================================

/// A signed change to one product's quantity. Applied, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    /// Product to adjust.
    pub product_id: ProductId,
    /// Signed quantity delta.
    pub quantity_change: i32,
    /// Optional human-readable reason, logged only.
    pub reason: String,
}

impl StockAdjustment {
    /// Create an adjustment without a reason.
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, quantity_change: i32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity_change,
            reason: String::new(),
        }
    }

    /// Attach a reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

/// Filter for listing products.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Exact category match. `None` or empty matches every category.
    pub category: Option<String>,
    /// Include soft-deleted products.
    pub include_discontinued: bool,
}

impl ProductFilter {
    /// Filter matching every active product.
    #[must_use]
    pub const fn all_active() -> Self {
        Self {
            category: None,
            include_discontinued: false,
        }
    }

    /// Restrict to one category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Include discontinued products.
    #[must_use]
    pub const fn including_discontinued(mut self) -> Self {
        self.include_discontinued = true;
        self
    }

    /// Check whether a product passes this filter.
    #[must_use]
    pub fn accepts(&self, product: &Product) -> bool {
        product.matches(self)
    }
}

/// Outcome of an atomic check-and-decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// Product the reservation was attempted on.
    pub product_id: ProductId,
    /// Whether stock was reserved.
    pub available: bool,
    /// Quantity left after the attempt (unchanged when rejected).
    pub remaining_quantity: i32,
    /// "Reserved" or "Insufficient stock".
    pub message: String,
}

impl Reservation {
    pub(crate) const RESERVED: &'static str = "Reserved";
    pub(crate) const INSUFFICIENT: &'static str = "Insufficient stock";

    pub(crate) fn granted(product_id: &str, remaining_quantity: i32) -> Self {
        Self {
            product_id: product_id.to_string(),
            available: true,
            remaining_quantity,
            message: Self::RESERVED.to_string(),
        }
    }

    pub(crate) fn rejected(product_id: &str, current_quantity: i32) -> Self {
        Self {
            product_id: product_id.to_string(),
            available: false,
            remaining_quantity: current_quantity,
            message: Self::INSUFFICIENT.to_string(),
        }
    }
}

/// A product observed at or below a low-stock threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowStockEntry {
    /// Product identifier.
    pub product_id: ProductId,
    /// Quantity at the time of the scan.
    pub current_quantity: i32,
}

// =============================================================================
// Sample Catalog
// =============================================================================

/// The fixed catalog the ledger is seeded with at startup.
#[must_use]
pub fn sample_catalog() -> Vec<Product> {
    vec![
        Product::new(
            "P001",
            "Wireless Mouse",
            "Ergonomic wireless mouse with USB receiver",
            "Electronics",
            120,
        ),
        Product::new(
            "P002",
            "Mechanical Keyboard",
            "RGB backlit mechanical keyboard with blue switches",
            "Electronics",
            75,
        ),
        Product::new(
            "P003",
            "Water Bottle",
            "Stainless steel water bottle, 750ml",
            "Home & Kitchen",
            200,
        ),
        Product::new(
            "P004",
            "Notebook",
            "A5 size ruled notebook, 200 pages",
            "Office Supplies",
            0,
        ),
        Product::new(
            "P005",
            "LED Desk Lamp",
            "Adjustable LED desk lamp with USB charging port",
            "Home & Kitchen",
            45,
        ),
    ]
}

// =============================================================================
// Tests
// =============================================================================
