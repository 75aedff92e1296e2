#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod backend;
mod builder;
pub mod metrics;

pub use backend::MemoryCache;
pub use builder::{EntryCapacity, MemoryCacheBuilder, NoCapacity, WeightCapacity};
pub use moka::policy::EvictionPolicy;
