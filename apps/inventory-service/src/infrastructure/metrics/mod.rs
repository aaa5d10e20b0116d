//! Prometheus Metrics Module
//!
//! # Metrics Categories
//!
//! - **Requests**: per-RPC call counts and latency
//! - **Subscriptions**: active low-stock subscriptions
//! - **Reservations**: interactive reservations granted and rejected
//!
//! Recording never influences RPC results. Before [`init_metrics`] runs the
//! `metrics` facade has no recorder and every call is a no-op, which is how
//! unit and integration tests run.
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Later calls return the existing handle.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

const REQUESTS_TOTAL: &str = "inventory_requests_total";
const REQUEST_LATENCY: &str = "inventory_request_latency_seconds";
const LOW_STOCK_SUBSCRIPTIONS: &str = "inventory_low_stock_subscriptions";
const RESERVATIONS_TOTAL: &str = "inventory_reservations_total";

fn register_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total RPCs handled, by method");
    describe_histogram!(
        REQUEST_LATENCY,
        "RPC handling time in seconds, by method. Streaming RPCs measure until the handler returns the stream"
    );
    describe_gauge!(
        LOW_STOCK_SUBSCRIPTIONS,
        "Number of running low-stock subscriptions"
    );
    describe_counter!(
        RESERVATIONS_TOTAL,
        "Interactive reservations, by outcome (granted or rejected)"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Counts one request on creation and records its latency on drop.
///
/// ```rust
/// use inventory_service::infrastructure::metrics::RequestTimer;
///
/// let _timer = RequestTimer::start("GetProductInfo");
/// // handler body
/// ```
#[derive(Debug)]
pub struct RequestTimer {
    method: &'static str,
    started: Instant,
}

impl RequestTimer {
    /// Start timing a request.
    #[must_use]
    pub fn start(method: &'static str) -> Self {
        counter!(REQUESTS_TOTAL, "method" => method).increment(1);
        Self {
            method,
            started: Instant::now(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        histogram!(REQUEST_LATENCY, "method" => self.method)
            .record(self.started.elapsed().as_secs_f64());
    }
}

/// Update the running low-stock subscription count.
#[allow(clippy::cast_precision_loss)]
pub fn set_active_subscriptions(count: usize) {
    gauge!(LOW_STOCK_SUBSCRIPTIONS).set(count as f64);
}

/// Record one interactive reservation outcome.
pub fn record_reservation(granted: bool) {
    let outcome = if granted { "granted" } else { "rejected" };
    counter!(RESERVATIONS_TOTAL, "outcome" => outcome).increment(1);
}

// =============================================================================
// Tests
// =============================================================================
