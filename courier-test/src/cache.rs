use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use courier_backend::{CacheResult, DeleteStatus, KeyedCache};

#[derive(Debug, Default)]
pub struct CacheCounters {
    pub read_count: AtomicUsize,
    pub read_hit_count: AtomicUsize,
    pub read_miss_count: AtomicUsize,
    pub fast_path_count: AtomicUsize,
    pub write_count: AtomicUsize,
    pub remove_count: AtomicUsize,
}

impl CacheCounters {
    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    pub fn read_hit_count(&self) -> usize {
        self.read_hit_count.load(Ordering::SeqCst)
    }

    pub fn read_miss_count(&self) -> usize {
        self.read_miss_count.load(Ordering::SeqCst)
    }

    pub fn fast_path_count(&self) -> usize {
        self.fast_path_count.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    pub fn remove_count(&self) -> usize {
        self.remove_count.load(Ordering::SeqCst)
    }

    fn read<V>(&self, value: &CacheResult<Option<V>>) {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        match value {
            Ok(Some(_)) => self.read_hit_count.fetch_add(1, Ordering::SeqCst),
            _ => self.read_miss_count.fetch_add(1, Ordering::SeqCst),
        };
    }
}

/// Wraps a cache and counts the operations that reach it.
///
/// Fast-path lookups are reads too: they count towards
/// [`read_count`](CacheCounters::read_count) as well as
/// [`fast_path_count`](CacheCounters::fast_path_count).
#[derive(Debug)]
pub struct CountingCache<C> {
    inner: C,
    counters: Arc<CacheCounters>,
}

impl<C> CountingCache<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            counters: Arc::new(CacheCounters::default()),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Counters shared with every clone of this handle.
    pub fn counters(&self) -> Arc<CacheCounters> {
        self.counters.clone()
    }
}

#[async_trait]
impl<K, V, C> KeyedCache<K, V> for CountingCache<C>
where
    K: Send + Sync + 'static,
    V: Send + 'static,
    C: KeyedCache<K, V>,
{
    async fn put(&self, value: V, key: &K) -> CacheResult<()> {
        self.counters.write_count.fetch_add(1, Ordering::SeqCst);
        self.inner.put(value, key).await
    }

    async fn get(&self, key: &K) -> CacheResult<Option<V>> {
        let value = self.inner.get(key).await;
        self.counters.read(&value);
        value
    }

    fn get_fast_path(&self, key: &K) -> CacheResult<Option<V>> {
        let value = self.inner.get_fast_path(key);
        self.counters.fast_path_count.fetch_add(1, Ordering::SeqCst);
        self.counters.read(&value);
        value
    }

    async fn remove(&self, key: &K) -> CacheResult<DeleteStatus> {
        self.counters.remove_count.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key).await
    }

    async fn remove_all(&self) -> CacheResult<()> {
        self.inner.remove_all().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
