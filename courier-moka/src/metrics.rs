//! Memory cache capacity metrics.
//!
//! Enable the `metrics` feature to record them.
//!
//! - `courier_memory_entries` - current number of entries (gauge)
//! - `courier_memory_weighted_size` - current weighted size (gauge)
//!
//! Both metrics carry a `backend` label to distinguish caches.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Metric name for cache entry count gauge.
    pub static ref MEMORY_ENTRIES: &'static str = {
        metrics::describe_gauge!(
            "courier_memory_entries",
            "Current number of entries in the memory cache."
        );
        "courier_memory_entries"
    };

    /// Metric name for weighted size gauge.
    pub static ref MEMORY_WEIGHTED_SIZE: &'static str = {
        metrics::describe_gauge!(
            "courier_memory_weighted_size",
            "Current weighted size of the memory cache."
        );
        "courier_memory_weighted_size"
    };
}

/// Record current cache capacity metrics.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_capacity(backend: &str, entries: u64, weighted_size: u64) {
    metrics::gauge!(*MEMORY_ENTRIES, "backend" => backend.to_string()).set(entries as f64);
    metrics::gauge!(*MEMORY_WEIGHTED_SIZE, "backend" => backend.to_string())
        .set(weighted_size as f64);
}

/// Record current cache capacity metrics (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_capacity(_backend: &str, _entries: u64, _weighted_size: u64) {}
