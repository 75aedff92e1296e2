#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod cache;
mod error;
mod store;

pub use cache::PreferenceCache;
pub use error::PreferenceError;
pub use store::{Domain, FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
