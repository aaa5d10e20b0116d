//! Prometheus Metrics Module
//!
//! # Metrics Categories
//!
//! - **Requests**: per-RPC call counts and latency
//! - **Sessions**: open order sessions
//! - **Reservations**: finalize item outcomes
//!
//! Before [`init_metrics`] runs there is no recorder and every call is a
//! no-op. Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const REQUESTS_TOTAL: &str = "order_requests_total";
const REQUEST_LATENCY: &str = "order_request_latency_seconds";
const OPEN_SESSIONS: &str = "order_open_sessions";
const ITEM_RESERVATIONS_TOTAL: &str = "order_item_reservations_total";

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
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

fn register_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total RPCs handled, by method");
    describe_histogram!(REQUEST_LATENCY, "RPC handling time in seconds, by method");
    describe_gauge!(OPEN_SESSIONS, "Number of open order sessions");
    describe_counter!(
        ITEM_RESERVATIONS_TOTAL,
        "Finalize item reservations, by outcome (reserved or failed)"
    );
}

/// Counts one request on creation and records its latency on drop.
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

/// Update the open session count.
#[allow(clippy::cast_precision_loss)]
pub fn set_open_sessions(count: usize) {
    gauge!(OPEN_SESSIONS).set(count as f64);
}

/// Record one finalize item outcome.
pub fn record_item_reservation(reserved: bool) {
    let outcome = if reserved { "reserved" } else { "failed" };
    counter!(ITEM_RESERVATIONS_TOTAL, "outcome" => outcome).increment(1);
}
