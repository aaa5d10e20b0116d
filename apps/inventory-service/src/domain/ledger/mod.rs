//! Inventory Ledger
//!
//! The single source of truth for product records.
//!
//! # Design
//!
//! One `parking_lot::Mutex` guards the whole catalog, reads included. Every
//! operation runs inside exactly one critical section, which makes each call
//! linearizable: two adjustments or reservations never interleave their
//! read-modify-write, whether they target the same product or not.
//!
//! The lock is never held across an `.await`. Streaming callers take a
//! snapshot, release the lock, then send.

use std::collections::HashMap;

use futures::{Stream, StreamExt};
use parking_lot::Mutex;

use super::product::{
    LowStockEntry, Product, ProductFilter, ProductId, Reservation, StockAdjustment,
};

// =============================================================================
// Errors
// =============================================================================

/// Ledger operation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// No product with this identifier.
    #[error("product not found: {0}")]
    NotFound(ProductId),
    /// A product with this identifier already exists.
    #[error("product already exists: {0}")]
    AlreadyExists(ProductId),
}

/// Error aborting a bulk adjustment.
#[derive(Debug, thiserror::Error)]
pub enum BulkAdjustError<E> {
    /// An adjustment was rejected by the ledger.
    #[error("adjustment {index} rejected: {source}")]
    Rejected {
        /// Zero-based position of the failing adjustment.
        index: usize,
        /// Ledger error for that adjustment.
        source: LedgerError,
    },
    /// The inbound stream failed.
    #[error("inbound stream failed after {applied} adjustments: {source}")]
    Transport {
        /// Adjustments applied before the failure.
        applied: usize,
        /// Stream error, propagated verbatim.
        source: E,
    },
}

/// Acknowledgment for a completed bulk adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkAdjustSummary {
    /// Number of adjustments applied.
    pub applied: usize,
}

// =============================================================================
// Ledger
// =============================================================================

/// Thread-safe in-memory product ledger.
///
/// # Example
///
/// ```rust
/// use inventory_service::domain::ledger::InventoryLedger;
/// use inventory_service::domain::product::sample_catalog;
///
/// let ledger = InventoryLedger::with_products(sample_catalog());
///
/// ledger.adjust_quantity("P001", -50).unwrap();
/// assert_eq!(ledger.get("P001").unwrap().available_quantity, 70);
///
/// let rejected = ledger.reserve("P001", 80);
/// assert!(!rejected.available);
/// assert_eq!(rejected.remaining_quantity, 70);
///
/// let granted = ledger.reserve("P001", 50);
/// assert!(granted.available);
/// assert_eq!(granted.remaining_quantity, 20);
/// ```
#[derive(Debug, Default)]
pub struct InventoryLedger {
    products: Mutex<HashMap<ProductId, Product>>,
}

impl InventoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger seeded with the given products.
    ///
    /// Later duplicates of an identifier replace earlier ones.
    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products
            .into_iter()
            .map(|mut product| {
                product.refresh_availability();
                (product.product_id.clone(), product)
            })
            .collect();
        Self {
            products: Mutex::new(products),
        }
    }

    /// Look up a product.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotFound` if the identifier is unknown.
    pub fn get(&self, product_id: &str) -> Result<Product, LedgerError> {
        self.products
            .lock()
            .get(product_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(product_id.to_string()))
    }

    /// Insert a new product.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AlreadyExists` if the identifier is taken; the
    /// stored record is left untouched.
    pub fn add(&self, mut product: Product) -> Result<(), LedgerError> {
        let mut products = self.products.lock();
        if products.contains_key(&product.product_id) {
            return Err(LedgerError::AlreadyExists(product.product_id));
        }
        product.refresh_availability();
        products.insert(product.product_id.clone(), product);
        Ok(())
    }

    /// Replace an existing product record in full.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotFound` if the identifier is unknown.
    pub fn update(&self, mut product: Product) -> Result<(), LedgerError> {
        let mut products = self.products.lock();
        let Some(stored) = products.get_mut(&product.product_id) else {
            return Err(LedgerError::NotFound(product.product_id));
        };
        product.refresh_availability();
        *stored = product;
        Ok(())
    }

    /// Mark a product discontinued. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotFound` if the identifier is unknown.
    pub fn discontinue(&self, product_id: &str) -> Result<(), LedgerError> {
        let mut products = self.products.lock();
        let product = products
            .get_mut(product_id)
            .ok_or_else(|| LedgerError::NotFound(product_id.to_string()))?;
        product.discontinued = true;
        Ok(())
    }

    /// Apply a signed delta to a product's quantity.
    ///
    /// No floor is enforced: the quantity may go negative.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotFound` if the identifier is unknown; nothing
    /// is mutated in that case.
    pub fn adjust_quantity(&self, product_id: &str, delta: i32) -> Result<Product, LedgerError> {
        let mut products = self.products.lock();
        let product = products
            .get_mut(product_id)
            .ok_or_else(|| LedgerError::NotFound(product_id.to_string()))?;
        product.apply_delta(delta);
        Ok(product.clone())
    }

    /// Apply a stream of adjustments in receipt order.
    ///
    /// The first failing adjustment or stream error aborts the operation.
    /// Adjustments applied before the failure stay applied.
    ///
    /// # Errors
    ///
    /// Returns `BulkAdjustError::Rejected` for a ledger error and
    /// `BulkAdjustError::Transport` for an inbound stream error.
    pub async fn bulk_adjust<S, E>(&self, adjustments: S) -> Result<BulkAdjustSummary, BulkAdjustError<E>>
    where
        S: Stream<Item = Result<StockAdjustment, E>>,
    {
        let mut adjustments = std::pin::pin!(adjustments);
        let mut applied = 0;

        while let Some(next) = adjustments.next().await {
            let adjustment = next.map_err(|source| BulkAdjustError::Transport { applied, source })?;
            tracing::debug!(
                product_id = %adjustment.product_id,
                quantity_change = adjustment.quantity_change,
                reason = %adjustment.reason,
                "Applying bulk adjustment"
            );
            self.adjust_quantity(&adjustment.product_id, adjustment.quantity_change)
                .map_err(|source| BulkAdjustError::Rejected {
                    index: applied,
                    source,
                })?;
            applied += 1;
        }

        Ok(BulkAdjustSummary { applied })
    }

    /// Snapshot the products passing a filter. Order is unspecified.
    #[must_use]
    pub fn list(&self, filter: &ProductFilter) -> Vec<Product> {
        self.products
            .lock()
            .values()
            .filter(|product| filter.accepts(product))
            .cloned()
            .collect()
    }

    /// Atomically check and decrement stock for one request.
    ///
    /// If the product exists and holds at least `requested_quantity`, the
    /// quantity is decremented inside the same critical section as the check.
    /// Otherwise nothing changes and the current quantity is reported (0 for
    /// unknown products).
    #[must_use]
    pub fn reserve(&self, product_id: &str, requested_quantity: i32) -> Reservation {
        let mut products = self.products.lock();
        match products.get_mut(product_id) {
            Some(product) if product.available_quantity >= requested_quantity => {
                product.apply_delta(requested_quantity.saturating_neg());
                Reservation::granted(product_id, product.available_quantity)
            }
            Some(product) => Reservation::rejected(product_id, product.available_quantity),
            None => Reservation::rejected(product_id, 0),
        }
    }

    /// Snapshot every product whose quantity is at or below `threshold`.
    ///
    /// Discontinued products are included.
    #[must_use]
    pub fn low_stock(&self, threshold: i32) -> Vec<LowStockEntry> {
        self.products
            .lock()
            .values()
            .filter(|product| product.available_quantity <= threshold)
            .map(|product| LowStockEntry {
                product_id: product.product_id.clone(),
                current_quantity: product.available_quantity,
            })
            .collect()
    }

    /// Number of products, discontinued included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.lock().len()
    }

    /// Check if the ledger holds no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.lock().is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::sample_catalog;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn seeded() -> InventoryLedger {
        InventoryLedger::with_products(sample_catalog())
    }

    #[test]
    fn get_after_add_returns_equal_product() {
        let ledger = InventoryLedger::new();
        let product = Product::new("X1", "Widget", "Small widget", "Tools", 3);

        ledger.add(product.clone()).unwrap();

        assert_eq!(ledger.get("X1").unwrap(), product);
    }

    #[test]
    fn get_unknown_is_not_found() {
        let ledger = seeded();
        assert_eq!(
            ledger.get("P999"),
            Err(LedgerError::NotFound("P999".to_string()))
        );
    }

    #[test]
    fn add_duplicate_leaves_record_unchanged() {
        let ledger = seeded();
        let before = ledger.get("P001").unwrap();

        let result = ledger.add(Product::new("P001", "Impostor", "", "Other", 1));

        assert_eq!(result, Err(LedgerError::AlreadyExists("P001".to_string())));
        assert_eq!(ledger.get("P001").unwrap(), before);
    }

    #[test]
    fn add_recomputes_availability() {
        let ledger = InventoryLedger::new();
        let mut product = Product::new("X1", "Widget", "", "Tools", 0);
        product.is_available = true;

        ledger.add(product).unwrap();

        assert!(!ledger.get("X1").unwrap().is_available);
    }

    #[test]
    fn update_replaces_full_record() {
        let ledger = seeded();
        let mut replacement = Product::new("P002", "Keyboard v2", "", "Peripherals", 0);
        replacement.is_available = true;

        ledger.update(replacement).unwrap();

        let stored = ledger.get("P002").unwrap();
        assert_eq!(stored.name, "Keyboard v2");
        assert_eq!(stored.description, "");
        assert_eq!(stored.category, "Peripherals");
        assert!(!stored.is_available);
    }

    #[test]
    fn update_unknown_is_not_found() {
        let ledger = seeded();
        let result = ledger.update(Product::new("P999", "Ghost", "", "", 1));
        assert_eq!(result, Err(LedgerError::NotFound("P999".to_string())));
        assert_eq!(ledger.len(), 5);
    }

    #[test]
    fn discontinue_is_idempotent_soft_delete() {
        let ledger = seeded();

        ledger.discontinue("P003").unwrap();
        ledger.discontinue("P003").unwrap();

        let product = ledger.get("P003").unwrap();
        assert!(product.discontinued);
        assert_eq!(product.available_quantity, 200);
        assert_eq!(ledger.len(), 5);
    }

    #[test]
    fn adjust_unknown_mutates_nothing() {
        let ledger = seeded();
        let before = ledger.list(&ProductFilter::all_active().including_discontinued());

        assert!(ledger.adjust_quantity("P999", 10).is_err());

        let mut after = ledger.list(&ProductFilter::all_active().including_discontinued());
        let mut before = before;
        before.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        after.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        assert_eq!(before, after);
    }

    #[test]
    fn adjust_allows_negative_quantity() {
        let ledger = seeded();
        let product = ledger.adjust_quantity("P005", -50).unwrap();
        assert_eq!(product.available_quantity, -5);
        assert!(!product.is_available);
    }

    #[test]
    fn adjust_and_reserve_scenario() {
        let ledger = seeded();

        let adjusted = ledger.adjust_quantity("P001", -50).unwrap();
        assert_eq!(adjusted.available_quantity, 70);

        let rejected = ledger.reserve("P001", 80);
        assert!(!rejected.available);
        assert_eq!(rejected.remaining_quantity, 70);
        assert_eq!(rejected.message, "Insufficient stock");
        assert_eq!(ledger.get("P001").unwrap().available_quantity, 70);

        let granted = ledger.reserve("P001", 50);
        assert!(granted.available);
        assert_eq!(granted.remaining_quantity, 20);
        assert_eq!(granted.message, "Reserved");
        assert_eq!(ledger.get("P001").unwrap().available_quantity, 20);
    }

    #[test]
    fn reserve_unknown_reports_zero() {
        let ledger = seeded();
        let reservation = ledger.reserve("P999", 1);
        assert!(!reservation.available);
        assert_eq!(reservation.remaining_quantity, 0);
    }

    #[test]
    fn reserve_min_quantity_saturates() {
        let ledger = seeded();

        let reservation = ledger.reserve("P001", i32::MIN);

        assert!(reservation.available);
        assert_eq!(reservation.remaining_quantity, i32::MAX);
        assert_eq!(ledger.get("P001").unwrap().available_quantity, i32::MAX);
    }

    #[test]
    fn reserve_exact_quantity_empties_product() {
        let ledger = seeded();
        let reservation = ledger.reserve("P005", 45);
        assert!(reservation.available);
        assert_eq!(reservation.remaining_quantity, 0);
        assert!(!ledger.get("P005").unwrap().is_available);
    }

    #[test]
    fn list_by_category_excludes_discontinued() {
        let ledger = seeded();
        ledger.discontinue("P002").unwrap();

        let listed = ledger.list(&ProductFilter::all_active().with_category("Electronics"));

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].product_id, "P001");
    }

    #[test]
    fn list_including_discontinued() {
        let ledger = seeded();
        ledger.discontinue("P002").unwrap();

        let listed = ledger.list(
            &ProductFilter::all_active()
                .with_category("Electronics")
                .including_discontinued(),
        );

        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn low_stock_scans_all_products() {
        let ledger = seeded();
        let mut low = ledger.low_stock(50);
        low.sort_by(|a, b| a.product_id.cmp(&b.product_id));

        let ids: Vec<_> = low.iter().map(|e| e.product_id.as_str()).collect();
        assert_eq!(ids, ["P004", "P005"]);
    }

    #[tokio::test]
    async fn bulk_adjust_applies_in_order() {
        let ledger = seeded();
        let adjustments = futures::stream::iter(vec![
            Ok::<_, std::io::Error>(StockAdjustment::new("P001", -20)),
            Ok(StockAdjustment::new("P004", 10)),
            Ok(StockAdjustment::new("P001", 5)),
        ]);

        let summary = ledger.bulk_adjust(adjustments).await.unwrap();

        assert_eq!(summary.applied, 3);
        assert_eq!(ledger.get("P001").unwrap().available_quantity, 105);
        assert!(ledger.get("P004").unwrap().is_available);
    }

    #[tokio::test]
    async fn bulk_adjust_aborts_on_unknown_product() {
        let ledger = seeded();
        let adjustments = futures::stream::iter(vec![
            Ok::<_, std::io::Error>(StockAdjustment::new("P001", -20)),
            Ok(StockAdjustment::new("P999", 10)),
            Ok(StockAdjustment::new("P002", -5)),
        ]);

        let err = ledger.bulk_adjust(adjustments).await.unwrap_err();

        assert!(matches!(
            err,
            BulkAdjustError::Rejected {
                index: 1,
                source: LedgerError::NotFound(_)
            }
        ));
        // Earlier adjustments stay applied, later ones never run.
        assert_eq!(ledger.get("P001").unwrap().available_quantity, 100);
        assert_eq!(ledger.get("P002").unwrap().available_quantity, 75);
    }

    #[tokio::test]
    async fn bulk_adjust_propagates_stream_error() {
        let ledger = seeded();
        let adjustments = futures::stream::iter(vec![
            Ok(StockAdjustment::new("P003", -1)),
            Err(std::io::Error::other("connection reset")),
        ]);

        let err = ledger.bulk_adjust(adjustments).await.unwrap_err();

        assert!(matches!(err, BulkAdjustError::Transport { applied: 1, .. }));
        assert_eq!(ledger.get("P003").unwrap().available_quantity, 199);
    }

    #[tokio::test]
    async fn bulk_adjust_empty_stream_succeeds() {
        let ledger = seeded();
        let summary = ledger
            .bulk_adjust(futures::stream::empty::<Result<StockAdjustment, std::io::Error>>())
            .await
            .unwrap();
        assert_eq!(summary.applied, 0);
    }

    #[test]
    fn concurrent_reservations_never_oversell() {
        let ledger = Arc::new(InventoryLedger::with_products([Product::new(
            "HOT", "Hot item", "", "Deals", 100,
        )]));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|_| ledger.reserve("HOT", 3).available)
                        .count()
                })
            })
            .collect();

        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(granted, 33);
        assert_eq!(ledger.get("HOT").unwrap().available_quantity, 1);
    }

    proptest! {
        #[test]
        fn availability_tracks_quantity(deltas in proptest::collection::vec(-50i32..50, 0..40)) {
            let ledger = InventoryLedger::with_products([Product::new("X", "X", "", "", 10)]);
            for delta in deltas {
                let product = ledger.adjust_quantity("X", delta).unwrap();
                prop_assert_eq!(product.is_available, product.available_quantity > 0);
            }
        }

        #[test]
        fn reservations_bounded_by_initial_quantity(
            initial in 0i32..500,
            requests in proptest::collection::vec(1i32..40, 0..60),
        ) {
            let ledger = InventoryLedger::with_products([Product::new("X", "X", "", "", initial)]);
            let reserved: i32 = requests
                .iter()
                .map(|&qty| {
                    let reservation = ledger.reserve("X", qty);
                    if reservation.available { qty } else { 0 }
                })
                .sum();
            prop_assert!(reserved <= initial);
            prop_assert_eq!(ledger.get("X").unwrap().available_quantity, initial - reserved);
        }
    }
}
