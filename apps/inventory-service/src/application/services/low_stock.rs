//! Low-Stock Monitor
//!
//! Periodic per-subscription scanner over the ledger.
//!
//! Each subscription owns one task and one timer. On every tick the task
//! snapshots all products at or below the subscriber's threshold, releases
//! the ledger lock, then sends one alert per product. Nothing is buffered
//! between ticks: a product that stays low alerts again on the next tick.
//!
//! A subscription ends when its cancellation token fires or when the
//! receiving side is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::domain::ledger::InventoryLedger;
use crate::domain::product::ProductId;
use crate::infrastructure::metrics;

/// Message carried by every low-stock alert.
pub const LOW_STOCK_MESSAGE: &str = "Low stock";

/// One product observed at or below a subscriber's threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowStockAlert {
    /// Product identifier.
    pub product_id: ProductId,
    /// Quantity at scan time.
    pub current_quantity: i32,
    /// Always [`LOW_STOCK_MESSAGE`].
    pub message: String,
    /// When the scan ran.
    pub observed_at: DateTime<Utc>,
}

/// Spawns and tracks low-stock subscriptions.
#[derive(Debug, Clone)]
pub struct LowStockMonitor {
    ledger: Arc<InventoryLedger>,
    period: Duration,
    buffer: usize,
    active: Arc<AtomicUsize>,
}

impl LowStockMonitor {
    /// Create a monitor scanning every `period`, with `buffer` alerts of
    /// channel capacity per subscription.
    #[must_use]
    pub fn new(ledger: Arc<InventoryLedger>, period: Duration, buffer: usize) -> Self {
        Self {
            ledger,
            period,
            buffer: buffer.max(1),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of subscriptions whose task is still running.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Start a subscription and return its alert channel.
    ///
    /// `product_ids` is recorded in the logs only; every product at or below
    /// `threshold` alerts. The first scan runs one full period after this call.
    #[must_use]
    pub fn subscribe(
        &self,
        threshold: i32,
        product_ids: Vec<ProductId>,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<LowStockAlert> {
        let (tx, rx) = mpsc::channel(self.buffer);

        tracing::info!(
            threshold,
            product_ids = ?product_ids,
            interval_ms = self.period.as_millis(),
            "Low-stock subscription started"
        );

        let guard = ActiveGuard::register(Arc::clone(&self.active));
        let ledger = Arc::clone(&self.ledger);
        let period = self.period;

        tokio::spawn(async move {
            scan_loop(&ledger, period, threshold, &tx, &cancel).await;
            // Count drops before the receiver can observe the closed channel.
            drop(guard);
            drop(tx);
            tracing::info!(threshold, "Low-stock subscription ended");
        });

        rx
    }
}

async fn scan_loop(
    ledger: &InventoryLedger,
    period: Duration,
    threshold: i32,
    tx: &mpsc::Sender<LowStockAlert>,
    cancel: &CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = tx.closed() => return,
            _ = ticker.tick() => {}
        }

        let snapshot = ledger.low_stock(threshold);
        let observed_at = Utc::now();
        tracing::debug!(threshold, low = snapshot.len(), "Low-stock scan");

        for entry in snapshot {
            let alert = LowStockAlert {
                product_id: entry.product_id,
                current_quantity: entry.current_quantity,
                message: LOW_STOCK_MESSAGE.to_string(),
                observed_at,
            };
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                sent = tx.send(alert) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// Keeps the active-subscription count and gauge in step with task lifetime.
struct ActiveGuard {
    active: Arc<AtomicUsize>,
}

impl ActiveGuard {
    fn register(active: Arc<AtomicUsize>) -> Self {
        let now = active.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::set_active_subscriptions(now);
        Self { active }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let now = self.active.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        metrics::set_active_subscriptions(now);
    }
}
