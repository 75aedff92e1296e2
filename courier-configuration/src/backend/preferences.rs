use std::path::PathBuf;

use courier_backend::RawCache;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Preferences {
    pub domain: String,
    /// Store directory; the platform preference directory when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Preferences {
    #[cfg(feature = "preferences")]
    pub async fn into_cache(self) -> Result<RawCache, ConfigError> {
        use std::sync::Arc;

        use courier_prefs::{FilePreferenceStore, PreferenceCache};

        let store = match self.path {
            Some(path) => FilePreferenceStore::new(path),
            None => FilePreferenceStore::default_location(),
        }
        .map_err(|error| ConfigError::open("Preferences", error))?;

        let cache = PreferenceCache::open(store, self.domain)
            .await
            .map_err(|error| ConfigError::open("Preferences", error))?;
        Ok(Arc::new(cache))
    }

    #[cfg(not(feature = "preferences"))]
    pub async fn into_cache(self) -> Result<RawCache, ConfigError> {
        Err(ConfigError::BackendNotAvailable("Preferences".to_string()))
    }
}
