use courier_core::CacheKey;
use serde::{Deserialize, Serialize};

/// How a resource combines its persisted value with network fetches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Never read the persisted value; always fetch.
    #[default]
    ReloadIgnoringCache,
    /// Use the persisted value if there is one, fetch otherwise.
    ReturnCacheElseLoad,
    /// Show the persisted value immediately, then fetch.
    ReturnCacheThenLoad,
    /// Only ever use the persisted value.
    ReturnCacheDontLoad,
}

impl CachePolicy {
    /// Whether the persisted value is read and written.
    pub fn returns_cache_data(&self) -> bool {
        !matches!(self, CachePolicy::ReloadIgnoringCache)
    }

    /// Whether the resource fetches automatically.
    pub fn loads(&self) -> bool {
        !matches!(self, CachePolicy::ReturnCacheDontLoad)
    }
}

/// Per-resource configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceConfig {
    /// Key the value is persisted under in the client's resource cache.
    pub persistent_key: Option<CacheKey>,
    /// How the persisted value is used.
    pub cache_policy: CachePolicy,
}

impl ResourceConfig {
    /// Persists the value under `key` using `policy`.
    pub fn persistent(key: impl Into<CacheKey>, policy: CachePolicy) -> Self {
        Self {
            persistent_key: Some(key.into()),
            cache_policy: policy,
        }
    }

    pub(crate) fn cache_key(&self) -> Option<&CacheKey> {
        self.persistent_key
            .as_ref()
            .filter(|_| self.cache_policy.returns_cache_data())
    }
}
