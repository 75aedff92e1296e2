//! Backend definitions.
//!
//! Each variant of [`Backend`] is selected by its `type` field and opens to
//! an [`Arc<dyn KeyedCache<CacheKey, Raw>>`](RawCache). Backends behind a
//! disabled cargo feature fail with [`ConfigError::BackendNotAvailable`].

use std::sync::Arc;

use courier_backend::{NoopCache, RawCache};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

mod disk;
mod memory;
mod preferences;
mod serialization;
mod tiered;

pub use disk::Disk;
pub use memory::Memory;
pub use preferences::Preferences;
pub use serialization::{ValueFormat, ValueSerialization};
pub use tiered::TieredConfig;

/// A cache backend.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Backend {
    /// Stores nothing.
    Noop,
    /// Bounded process memory.
    Memory(Memory),
    /// Content-addressed files with capacity eviction.
    Disk(Disk),
    /// One domain of a preference store.
    Preferences(Preferences),
    /// A fast layer in front of a durable one.
    Tiered(TieredConfig),
}

impl Backend {
    /// Name of the variant as written in the `type` field.
    pub fn type_name(&self) -> &'static str {
        match self {
            Backend::Noop => "Noop",
            Backend::Memory(_) => "Memory",
            Backend::Disk(_) => "Disk",
            Backend::Preferences(_) => "Preferences",
            Backend::Tiered(_) => "Tiered",
        }
    }

    /// Opens the backend.
    pub async fn into_cache(self) -> Result<RawCache, ConfigError> {
        debug!(backend = self.type_name(), "opening cache backend");
        match self {
            Backend::Noop => Ok(Arc::new(NoopCache)),
            Backend::Memory(config) => config.into_cache(),
            Backend::Disk(config) => config.into_cache(),
            Backend::Preferences(config) => config.into_cache().await,
            Backend::Tiered(config) => config.into_cache().await,
        }
    }
}
