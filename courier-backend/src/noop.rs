use async_trait::async_trait;

use crate::{CacheResult, DeleteStatus, KeyedCache};

/// Cache that stores nothing.
///
/// Every operation succeeds; reads always miss. This is the default
/// session cache of a client.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl<K, V> KeyedCache<K, V> for NoopCache
where
    K: Send + Sync + 'static,
    V: Send + 'static,
{
    async fn put(&self, _value: V, _key: &K) -> CacheResult<()> {
        Ok(())
    }

    async fn get(&self, _key: &K) -> CacheResult<Option<V>> {
        Ok(None)
    }

    fn get_fast_path(&self, _key: &K) -> CacheResult<Option<V>> {
        Ok(None)
    }

    async fn remove(&self, _key: &K) -> CacheResult<DeleteStatus> {
        Ok(DeleteStatus::Missing)
    }

    async fn remove_all(&self) -> CacheResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}
