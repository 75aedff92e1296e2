//! Moka-backed memory cache.

use std::hash::Hash;

use async_trait::async_trait;
use courier_backend::{CacheResult, DeleteStatus, KeyedCache};
use moka::sync::Cache;
use smol_str::SmolStr;
use tracing::trace;

use crate::builder::{MemoryCacheBuilder, NoCapacity};
use crate::metrics;

/// In-memory cache powered by Moka.
///
/// Entries are evicted least-recently-used first once capacity is reached.
/// Every read is served from memory, so [`get_fast_path`] always answers
/// authoritatively.
///
/// # Examples
///
/// ```
/// use courier_moka::MemoryCache;
///
/// let cache = MemoryCache::<String, Vec<u8>>::builder()
///     .max_entries(10_000)
///     .build();
/// ```
///
/// # Caveats
///
/// - Data is **not persisted**; compose with a durable backend using
///   [`Tiered`](courier_backend::Tiered) for that
/// - Eviction runs in batches; call [`run_pending_tasks`](Self::run_pending_tasks)
///   when a test needs it applied immediately
///
/// [`get_fast_path`]: KeyedCache::get_fast_path
#[derive(Clone)]
pub struct MemoryCache<K, V> {
    cache: Cache<K, V>,
    label: SmolStr,
}

impl<K, V> std::fmt::Debug for MemoryCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("label", &self.label)
            .field("key", &std::any::type_name::<K>())
            .field("value", &std::any::type_name::<V>())
            .finish()
    }
}

impl<K, V> MemoryCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a builder with no capacity configured.
    pub fn builder() -> MemoryCacheBuilder<NoCapacity, K, V> {
        MemoryCacheBuilder::new()
    }

    pub(crate) fn from_parts(cache: Cache<K, V>, label: SmolStr) -> Self {
        Self { cache, label }
    }

    /// The underlying Moka cache.
    pub fn cache(&self) -> &Cache<K, V> {
        &self.cache
    }

    /// Applies pending evictions and expirations.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }

    /// Approximate number of entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl<K, V> KeyedCache<K, V> for MemoryCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn put(&self, value: V, key: &K) -> CacheResult<()> {
        self.cache.insert(key.clone(), value);
        metrics::record_capacity(
            &self.label,
            self.cache.entry_count(),
            self.cache.weighted_size(),
        );
        Ok(())
    }

    async fn get(&self, key: &K) -> CacheResult<Option<V>> {
        self.get_fast_path(key)
    }

    fn get_fast_path(&self, key: &K) -> CacheResult<Option<V>> {
        let value = self.cache.get(key);
        trace!(backend = %self.label, hit = value.is_some(), "memory cache read");
        Ok(value)
    }

    async fn remove(&self, key: &K) -> CacheResult<DeleteStatus> {
        match self.cache.remove(key) {
            Some(_) => Ok(DeleteStatus::Deleted(1)),
            None => Ok(DeleteStatus::Missing),
        }
    }

    async fn remove_all(&self) -> CacheResult<()> {
        self.cache.invalidate_all();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_remove() {
        let cache = MemoryCache::<String, u32>::builder().max_entries(10).build();
        let key = "a".to_string();

        cache.put(1, &key).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(1));
        assert_eq!(cache.get_fast_path(&key).unwrap(), Some(1));
        assert_eq!(cache.remove(&key).await.unwrap(), DeleteStatus::Deleted(1));
        assert_eq!(cache.remove(&key).await.unwrap(), DeleteStatus::Missing);
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_all_clears_entries() {
        let cache = MemoryCache::<u8, u8>::builder().max_entries(10).build();
        for i in 0..5 {
            cache.put(i, &i).await.unwrap();
        }
        cache.remove_all().await.unwrap();
        cache.run_pending_tasks();
        for i in 0..5 {
            assert_eq!(cache.get_fast_path(&i).unwrap(), None);
        }
    }
}
