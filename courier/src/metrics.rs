//! Fetch metrics.
//!
//! Enable the `metrics` feature to record them. Every metric carries an
//! `endpoint` label naming the endpoint type.
//!
//! - `courier_runs_total` - coordinator runs started
//! - `courier_fast_path_hits_total` - runs answered by the session cache fast path
//! - `courier_transport_calls_total` - requests handed to the session
//! - `courier_runs_canceled_total` - runs that ended canceled
//! - `courier_runs_failed_total` - runs that ended with an error

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Metric name for started runs.
    pub static ref RUNS_TOTAL: &'static str = {
        metrics::describe_counter!("courier_runs_total", "Total number of coordinator runs started.");
        "courier_runs_total"
    };
    /// Metric name for fast path hits.
    pub static ref FAST_PATH_HITS: &'static str = {
        metrics::describe_counter!(
            "courier_fast_path_hits_total",
            "Total number of runs answered from the session cache fast path."
        );
        "courier_fast_path_hits_total"
    };
    /// Metric name for transport calls.
    pub static ref TRANSPORT_CALLS: &'static str = {
        metrics::describe_counter!(
            "courier_transport_calls_total",
            "Total number of requests handed to the session."
        );
        "courier_transport_calls_total"
    };
    /// Metric name for canceled runs.
    pub static ref RUNS_CANCELED: &'static str = {
        metrics::describe_counter!("courier_runs_canceled_total", "Total number of canceled runs.");
        "courier_runs_canceled_total"
    };
    /// Metric name for failed runs.
    pub static ref RUNS_FAILED: &'static str = {
        metrics::describe_counter!("courier_runs_failed_total", "Total number of failed runs.");
        "courier_runs_failed_total"
    };
}

/// Outcome of one fetch, for metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A run started.
    RunStarted,
    /// The fast path answered.
    FastPathHit,
    /// The transport was called.
    TransportCall,
    /// The run ended canceled.
    Canceled,
    /// The run ended with an error.
    Failed,
}

/// Record a fetch event for `endpoint`.
#[cfg(feature = "metrics")]
#[inline]
pub fn record(endpoint: &'static str, event: Event) {
    let name = match event {
        Event::RunStarted => *RUNS_TOTAL,
        Event::FastPathHit => *FAST_PATH_HITS,
        Event::TransportCall => *TRANSPORT_CALLS,
        Event::Canceled => *RUNS_CANCELED,
        Event::Failed => *RUNS_FAILED,
    };
    metrics::counter!(name, "endpoint" => endpoint).increment(1);
}

/// Record a fetch event (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record(_endpoint: &'static str, _event: Event) {}
