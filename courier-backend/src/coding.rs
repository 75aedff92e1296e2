//! Keyed coding cache.
//!
//! [`CodingCache`] sits in front of a byte-valued backend and stores any
//! serde value under any [`ToCacheKey`] key. A key prefix namespaces the
//! entries so independent cache domains can share one backend.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{CacheKey, Raw, ToCacheKey};
use serde::{Serialize, de::DeserializeOwned};
use smol_str::SmolStr;
use tracing::trace;

use crate::format::{Format, FormatExt, JsonFormat};
use crate::{CacheError, CacheResult, DeleteStatus, KeyedCache, metrics};

/// Byte-valued backend a [`CodingCache`] writes into.
pub type RawCache = Arc<dyn KeyedCache<CacheKey, Raw>>;

/// Typed view over a byte-valued backend.
///
/// # Examples
///
/// ```ignore
/// use courier_backend::{CodingCache, KeyedCache};
/// use courier_backend::format::BincodeFormat;
///
/// let cache = CodingCache::new(disk).with_format(BincodeFormat).with_prefix("profile");
/// cache.put(user, &"current-user").await?;
/// ```
#[derive(Clone)]
pub struct CodingCache {
    backend: RawCache,
    format: Box<dyn Format>,
    prefix: Option<SmolStr>,
}

impl fmt::Debug for CodingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodingCache")
            .field("backend", &self.backend.name())
            .field("format", &self.format)
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl CodingCache {
    /// Wraps `backend`, encoding values as JSON.
    pub fn new<B>(backend: B) -> Self
    where
        B: KeyedCache<CacheKey, Raw> + 'static,
    {
        Self::from_shared(Arc::new(backend))
    }

    /// Wraps an already shared backend.
    pub fn from_shared(backend: RawCache) -> Self {
        Self {
            backend,
            format: Box::new(JsonFormat),
            prefix: None,
        }
    }

    /// Encodes values with `format`.
    pub fn with_format<F: Format + 'static>(mut self, format: F) -> Self {
        self.format = Box::new(format);
        self
    }

    /// Encodes values with an already boxed format.
    pub fn with_boxed_format(mut self, format: Box<dyn Format>) -> Self {
        self.format = format;
        self
    }

    /// Places every key under `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<SmolStr>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// The key prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The underlying byte-valued backend.
    pub fn backend(&self) -> &RawCache {
        &self.backend
    }

    /// The value format.
    pub fn format(&self) -> &dyn Format {
        self.format.as_ref()
    }

    fn storage_key<K: ToCacheKey + ?Sized>(&self, key: &K) -> CacheKey {
        let key = key.to_cache_key();
        match &self.prefix {
            Some(prefix) => key.with_prefix(prefix),
            None => key,
        }
    }

    fn decode<V: DeserializeOwned>(&self, raw: Option<Raw>) -> CacheResult<Option<V>> {
        let name = self.backend.name();
        match raw {
            Some(raw) => {
                metrics::record_read(name, true);
                self.format.deserialize(&raw).map(Some).map_err(|error| {
                    metrics::record_error(name, "decode");
                    CacheError::from(error)
                })
            }
            None => {
                metrics::record_read(name, false);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl<K, V> KeyedCache<K, V> for CodingCache
where
    K: ToCacheKey + Send + Sync + 'static,
    V: Serialize + DeserializeOwned + Send + 'static,
{
    async fn put(&self, value: V, key: &K) -> CacheResult<()> {
        let key = self.storage_key(key);
        let raw = self.format.serialize(&value)?;
        trace!(%key, bytes = raw.len(), backend = self.backend.name(), "cache put");
        metrics::record_write(self.backend.name(), raw.len());
        self.backend.put(raw, &key).await
    }

    async fn get(&self, key: &K) -> CacheResult<Option<V>> {
        let key = self.storage_key(key);
        let raw = self.backend.get(&key).await?;
        trace!(%key, hit = raw.is_some(), backend = self.backend.name(), "cache get");
        self.decode(raw)
    }

    fn get_fast_path(&self, key: &K) -> CacheResult<Option<V>> {
        let key = self.storage_key(key);
        let raw = self.backend.get_fast_path(&key)?;
        self.decode(raw)
    }

    async fn remove(&self, key: &K) -> CacheResult<DeleteStatus> {
        let key = self.storage_key(key);
        self.backend.remove(&key).await
    }

    /// Clears the backend.
    ///
    /// Fails with [`CacheError::Unsupported`] when a prefix is set: the
    /// backend cannot enumerate keys by prefix and clearing it would destroy
    /// entries of other domains.
    async fn remove_all(&self) -> CacheResult<()> {
        if self.prefix.is_some() {
            return Err(CacheError::Unsupported("remove_all under a key prefix"));
        }
        self.backend.remove_all().await
    }

    fn name(&self) -> &str {
        self.backend.name()
    }
}
