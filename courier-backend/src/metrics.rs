//! Cache metrics.
//!
//! Enable the `metrics` feature to record them. All metrics carry a
//! `backend` label taken from [`KeyedCache::name`](crate::KeyedCache::name).
//!
//! - `courier_cache_read_total` - reads, labelled `result` = `hit` | `miss`
//! - `courier_cache_write_total` - writes
//! - `courier_cache_write_bytes_total` - encoded bytes written
//! - `courier_cache_errors_total` - failed operations, labelled `operation`

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Metric name for cache reads.
    pub static ref CACHE_READ_TOTAL: &'static str = {
        metrics::describe_counter!(
            "courier_cache_read_total",
            "Total number of cache reads per backend and result."
        );
        "courier_cache_read_total"
    };

    /// Metric name for cache writes.
    pub static ref CACHE_WRITE_TOTAL: &'static str = {
        metrics::describe_counter!(
            "courier_cache_write_total",
            "Total number of cache writes per backend."
        );
        "courier_cache_write_total"
    };

    /// Metric name for bytes written.
    pub static ref CACHE_WRITE_BYTES: &'static str = {
        metrics::describe_counter!(
            "courier_cache_write_bytes_total",
            "Total encoded bytes written per backend."
        );
        "courier_cache_write_bytes_total"
    };

    /// Metric name for failed cache operations.
    pub static ref CACHE_ERRORS: &'static str = {
        metrics::describe_counter!(
            "courier_cache_errors_total",
            "Total number of failed cache operations per backend."
        );
        "courier_cache_errors_total"
    };
}

/// Record a read and whether it hit.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_read(backend: &str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!(*CACHE_READ_TOTAL, "backend" => backend.to_string(), "result" => result)
        .increment(1);
}

/// Record a read (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_read(_backend: &str, _hit: bool) {}

/// Record a write of `bytes` encoded bytes.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_write(backend: &str, bytes: usize) {
    metrics::counter!(*CACHE_WRITE_TOTAL, "backend" => backend.to_string()).increment(1);
    metrics::counter!(*CACHE_WRITE_BYTES, "backend" => backend.to_string())
        .increment(bytes as u64);
}

/// Record a write (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_write(_backend: &str, _bytes: usize) {}

/// Record a failed operation.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_error(backend: &str, operation: &'static str) {
    metrics::counter!(*CACHE_ERRORS, "backend" => backend.to_string(), "operation" => operation)
        .increment(1);
}

/// Record a failed operation (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_error(_backend: &str, _operation: &'static str) {}
