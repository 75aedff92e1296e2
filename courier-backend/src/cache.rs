use std::sync::Arc;

use async_trait::async_trait;

use crate::{CacheError, DeleteStatus};

/// Result of a cache operation.
pub type CacheResult<T> = Result<T, CacheError>;

/// A keyed store of values.
///
/// Every backend implements the same contract, so callers hold caches as
/// `Arc<dyn KeyedCache<K, V>>` and choose the backend at construction time.
/// Implementations must be safe for concurrent `put`/`get` from many tasks.
#[async_trait]
pub trait KeyedCache<K, V>: Send + Sync
where
    K: Send + Sync + 'static,
    V: Send + 'static,
{
    /// Stores `value` under `key`, replacing any previous value.
    async fn put(&self, value: V, key: &K) -> CacheResult<()>;

    /// Reads the value stored under `key`.
    async fn get(&self, key: &K) -> CacheResult<Option<V>>;

    /// Reads `key` without performing I/O.
    ///
    /// `Ok(None)` means no in-memory path exists for the key; it does not
    /// mean the key is absent from durable storage.
    fn get_fast_path(&self, key: &K) -> CacheResult<Option<V>>;

    /// Removes the value stored under `key`.
    async fn remove(&self, key: &K) -> CacheResult<DeleteStatus>;

    /// Removes every value.
    async fn remove_all(&self) -> CacheResult<()>;

    /// Backend name used in logs and metrics labels.
    fn name(&self) -> &str {
        "cache"
    }
}

#[async_trait]
impl<K, V, C> KeyedCache<K, V> for Arc<C>
where
    K: Send + Sync + 'static,
    V: Send + 'static,
    C: KeyedCache<K, V> + ?Sized,
{
    async fn put(&self, value: V, key: &K) -> CacheResult<()> {
        (**self).put(value, key).await
    }

    async fn get(&self, key: &K) -> CacheResult<Option<V>> {
        (**self).get(key).await
    }

    fn get_fast_path(&self, key: &K) -> CacheResult<Option<V>> {
        (**self).get_fast_path(key)
    }

    async fn remove(&self, key: &K) -> CacheResult<DeleteStatus> {
        (**self).remove(key).await
    }

    async fn remove_all(&self) -> CacheResult<()> {
        (**self).remove_all().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<K, V, C> KeyedCache<K, V> for Box<C>
where
    K: Send + Sync + 'static,
    V: Send + 'static,
    C: KeyedCache<K, V> + ?Sized,
{
    async fn put(&self, value: V, key: &K) -> CacheResult<()> {
        (**self).put(value, key).await
    }

    async fn get(&self, key: &K) -> CacheResult<Option<V>> {
        (**self).get(key).await
    }

    fn get_fast_path(&self, key: &K) -> CacheResult<Option<V>> {
        (**self).get_fast_path(key)
    }

    async fn remove(&self, key: &K) -> CacheResult<DeleteStatus> {
        (**self).remove(key).await
    }

    async fn remove_all(&self) -> CacheResult<()> {
        (**self).remove_all().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
