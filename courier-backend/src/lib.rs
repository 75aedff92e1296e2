#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod cache;
pub mod coding;
mod error;
pub mod format;
pub mod metrics;
mod noop;
pub mod tiered;

pub use cache::{CacheResult, KeyedCache};
pub use coding::{CodingCache, RawCache};
pub use error::CacheError;
pub use noop::NoopCache;
pub use tiered::Tiered;

/// Status of deleting result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Record successfully deleted.
    Deleted(u32),
    /// Record already missing.
    Missing,
}
