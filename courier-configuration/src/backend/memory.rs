use std::time::Duration;

use courier_backend::RawCache;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Memory {
    pub max_entries: u64,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<Duration>,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub time_to_idle: Option<Duration>,
    /// Optional label for this backend (used in metrics/tracing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Memory {
    #[cfg(feature = "memory")]
    pub fn into_cache(self) -> Result<RawCache, ConfigError> {
        use std::sync::Arc;

        use courier_core::{CacheKey, Raw};
        use courier_moka::MemoryCache;

        let mut builder = MemoryCache::<CacheKey, Raw>::builder().max_entries(self.max_entries);
        if let Some(ttl) = self.time_to_live {
            builder = builder.time_to_live(ttl);
        }
        if let Some(tti) = self.time_to_idle {
            builder = builder.time_to_idle(tti);
        }
        if let Some(label) = self.label {
            builder = builder.label(label);
        }

        Ok(Arc::new(builder.build()))
    }

    #[cfg(not(feature = "memory"))]
    pub fn into_cache(self) -> Result<RawCache, ConfigError> {
        Err(ConfigError::BackendNotAvailable("Memory".to_string()))
    }
}
