#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod backend;
mod error;

pub use backend::{DEFAULT_CAPACITY, DiskCache, DiskCacheBuilder, DiskEntry};
pub use error::DiskCacheError;
