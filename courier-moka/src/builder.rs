//! Builder for configuring [`MemoryCache`].

use std::hash::Hash;
use std::marker::PhantomData;
use std::time::Duration;

use moka::policy::EvictionPolicy;
use moka::sync::CacheBuilder;
use smol_str::SmolStr;

use crate::backend::MemoryCache;

/// Marker type: capacity has not been configured yet.
///
/// Call [`max_entries()`](MemoryCacheBuilder::max_entries) or
/// [`max_weight()`](MemoryCacheBuilder::max_weight) before `build()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapacity;

/// Marker type: entry-count capacity has been configured.
#[derive(Debug, Clone, Copy)]
pub struct EntryCapacity(pub(crate) u64);

/// Marker type: weighted capacity has been configured.
pub struct WeightCapacity<K, V> {
    capacity: u64,
    weigher: fn(&K, &V) -> u32,
}

/// Builder for creating and configuring a [`MemoryCache`].
///
/// Capacity is mandatory and set exactly once; `build()` only exists after
/// it has been configured.
///
/// ```
/// use std::time::Duration;
/// use courier_moka::MemoryCache;
///
/// let cache = MemoryCache::<String, String>::builder()
///     .label("sessions")
///     .time_to_live(Duration::from_secs(300))
///     .max_weight(1024 * 1024, |key: &String, value: &String| (key.len() + value.len()) as u32)
///     .build();
/// ```
pub struct MemoryCacheBuilder<Cap, K, V> {
    capacity: Cap,
    label: SmolStr,
    eviction_policy: Option<EvictionPolicy>,
    time_to_live: Option<Duration>,
    time_to_idle: Option<Duration>,
    _entry: PhantomData<fn() -> (K, V)>,
}

impl<K, V> MemoryCacheBuilder<NoCapacity, K, V> {
    /// Creates a new builder with no capacity configured.
    pub fn new() -> Self {
        Self {
            capacity: NoCapacity,
            label: SmolStr::new_static("memory"),
            eviction_policy: None,
            time_to_live: None,
            time_to_idle: None,
            _entry: PhantomData,
        }
    }

    fn with_capacity<Cap>(self, capacity: Cap) -> MemoryCacheBuilder<Cap, K, V> {
        MemoryCacheBuilder {
            capacity,
            label: self.label,
            eviction_policy: self.eviction_policy,
            time_to_live: self.time_to_live,
            time_to_idle: self.time_to_idle,
            _entry: PhantomData,
        }
    }

    /// Holds at most `capacity` entries.
    pub fn max_entries(self, capacity: u64) -> MemoryCacheBuilder<EntryCapacity, K, V> {
        self.with_capacity(EntryCapacity(capacity))
    }

    /// Holds entries whose summed `weigher` results stay within `capacity`.
    pub fn max_weight(
        self,
        capacity: u64,
        weigher: fn(&K, &V) -> u32,
    ) -> MemoryCacheBuilder<WeightCapacity<K, V>, K, V> {
        self.with_capacity(WeightCapacity { capacity, weigher })
    }
}

impl<K, V> Default for MemoryCacheBuilder<NoCapacity, K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Cap, K, V> MemoryCacheBuilder<Cap, K, V> {
    /// Name used in logs and metrics labels.
    ///
    /// # Default
    ///
    /// `"memory"`
    pub fn label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the eviction policy.
    ///
    /// # Default
    ///
    /// [`EvictionPolicy::lru()`]. TinyLFU's admission filter may reject a new
    /// entry in favour of an older one, which breaks strict LRU expectations.
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }

    /// Expires entries `ttl` after they were written.
    pub fn time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Expires entries `tti` after they were last read or written.
    pub fn time_to_idle(mut self, tti: Duration) -> Self {
        self.time_to_idle = Some(tti);
        self
    }

    fn configure(
        &mut self,
        mut builder: CacheBuilder<K, V, moka::sync::Cache<K, V>>,
    ) -> CacheBuilder<K, V, moka::sync::Cache<K, V>>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let policy = self.eviction_policy.take().unwrap_or_else(EvictionPolicy::lru);
        builder = builder.eviction_policy(policy);
        if let Some(ttl) = self.time_to_live {
            builder = builder.time_to_live(ttl);
        }
        if let Some(tti) = self.time_to_idle {
            builder = builder.time_to_idle(tti);
        }
        builder
    }
}

impl<K, V> MemoryCacheBuilder<EntryCapacity, K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Builds the cache with entry-count capacity.
    pub fn build(mut self) -> MemoryCache<K, V> {
        let builder = self.configure(CacheBuilder::new(self.capacity.0));
        MemoryCache::from_parts(builder.build(), self.label)
    }
}

impl<K, V> MemoryCacheBuilder<WeightCapacity<K, V>, K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Builds the cache with weighted capacity.
    pub fn build(mut self) -> MemoryCache<K, V> {
        let weigher = self.capacity.weigher;
        let builder = self
            .configure(CacheBuilder::new(self.capacity.capacity))
            .weigher(move |key: &K, value: &V| weigher(key, value));
        MemoryCache::from_parts(builder.build(), self.label)
    }
}
