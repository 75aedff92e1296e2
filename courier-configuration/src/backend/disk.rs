use std::path::PathBuf;

use bytesize::ByteSize;
use courier_backend::RawCache;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 100 MiB, matching the disk backend's own default.
fn default_capacity() -> ByteSize {
    ByteSize::mib(100)
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Disk {
    /// Cache directory; the platform cache directory when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_capacity")]
    pub capacity: ByteSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Disk {
    #[cfg(feature = "disk")]
    pub fn into_cache(self) -> Result<RawCache, ConfigError> {
        use std::sync::Arc;

        use courier_disk::DiskCache;

        let mut builder = DiskCache::builder().capacity(self.capacity.as_u64());
        if let Some(path) = self.path {
            builder = builder.path(path);
        }
        if let Some(label) = self.label {
            builder = builder.label(label);
        }

        let cache = builder
            .build()
            .map_err(|error| ConfigError::open("Disk", error))?;
        Ok(Arc::new(cache))
    }

    #[cfg(not(feature = "disk"))]
    pub fn into_cache(self) -> Result<RawCache, ConfigError> {
        Err(ConfigError::BackendNotAvailable("Disk".to_string()))
    }
}
