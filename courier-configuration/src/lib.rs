#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod backend;
mod config;
mod error;

pub use backend::{Backend, ValueFormat, ValueSerialization};
pub use config::CacheConfig;
pub use error::ConfigError;
