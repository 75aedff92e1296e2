use courier_backend::CodingCache;
use serde::{Deserialize, Serialize};

use crate::backend::{Backend, ValueFormat};
use crate::error::ConfigError;

/// A complete cache definition: where bytes are stored and how values are
/// encoded into them.
///
/// ```yaml
/// backend:
///   type: Tiered
///   l1:
///     type: Memory
///     max_entries: 1000
///     time_to_live: 5m
///   l2:
///     type: Disk
///     capacity: 64 MiB
/// value:
///   format: Bincode
///   prefix: github
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Storage backend.
    pub backend: Backend,
    /// Value encoding and key prefix.
    #[serde(default)]
    pub value: ValueFormat,
}

impl CacheConfig {
    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_saphyr::from_str(yaml).map_err(|error| ConfigError::Parse(error.to_string()))
    }

    /// Opens the backend and wraps it in a [`CodingCache`] with the
    /// configured format and prefix.
    pub async fn into_coding_cache(self) -> Result<CodingCache, ConfigError> {
        let backend = self.backend.into_cache().await?;
        let mut cache =
            CodingCache::from_shared(backend).with_boxed_format(self.value.format.to_format());
        if let Some(prefix) = self.value.prefix {
            cache = cache.with_prefix(prefix);
        }
        Ok(cache)
    }
}
