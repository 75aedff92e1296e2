//! Memory-over-durable cache composition.
//!
//! [`Tiered`] puts a fast in-memory cache (L1) in front of a durable one
//! (L2) so a durable backend gains a fast path.
//!
//! # Read Strategy
//! 1. Check L1 → Hit: return value
//! 2. Check L2 → Hit: populate L1, return value
//! 3. Miss: return None
//!
//! # Fast Path
//! Only L1 is consulted; L2 is never touched.
//!
//! # Write Strategy
//! Write-through: L1 first, then L2. The write fails only if both layers fail.
//!
//! # Delete Strategy
//! Deletes from both layers.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::{CacheError, CacheResult, DeleteStatus, KeyedCache};

/// Both cache layers failed the same operation.
#[derive(Debug, Error)]
#[error("both cache layers failed - L1: {l1}, L2: {l2}")]
pub struct BothLayersFailed {
    /// L1 error.
    pub l1: CacheError,
    /// L2 error.
    pub l2: CacheError,
}

/// Two-layer cache.
#[derive(Debug, Clone)]
pub struct Tiered<L1, L2> {
    l1: L1,
    l2: L2,
}

impl<L1, L2> Tiered<L1, L2> {
    /// Composes `l1` in front of `l2`.
    pub fn new(l1: L1, l2: L2) -> Self {
        Self { l1, l2 }
    }

    /// The memory layer.
    pub fn l1(&self) -> &L1 {
        &self.l1
    }

    /// The durable layer.
    pub fn l2(&self) -> &L2 {
        &self.l2
    }
}

fn merge<T>(l1: CacheResult<T>, l2: CacheResult<T>) -> CacheResult<T> {
    match (l1, l2) {
        (Err(l1), Err(l2)) => Err(CacheError::internal(BothLayersFailed { l1, l2 })),
        (Ok(value), Err(error)) => {
            warn!(%error, "L2 cache operation failed");
            Ok(value)
        }
        (Err(error), Ok(value)) => {
            warn!(%error, "L1 cache operation failed");
            Ok(value)
        }
        (Ok(_), Ok(value)) => Ok(value),
    }
}

#[async_trait]
impl<K, V, L1, L2> KeyedCache<K, V> for Tiered<L1, L2>
where
    K: Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    L1: KeyedCache<K, V>,
    L2: KeyedCache<K, V>,
{
    async fn put(&self, value: V, key: &K) -> CacheResult<()> {
        let l1 = self.l1.put(value.clone(), key).await;
        let l2 = self.l2.put(value, key).await;
        merge(l1, l2)
    }

    async fn get(&self, key: &K) -> CacheResult<Option<V>> {
        match self.l1.get(key).await {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => {}
            Err(error) => warn!(%error, "L1 cache read failed"),
        }

        let value = self.l2.get(key).await?;
        if let Some(value) = &value
            && let Err(error) = self.l1.put(value.clone(), key).await
        {
            warn!(%error, "L1 refill failed");
        }
        Ok(value)
    }

    fn get_fast_path(&self, key: &K) -> CacheResult<Option<V>> {
        self.l1.get_fast_path(key)
    }

    async fn remove(&self, key: &K) -> CacheResult<DeleteStatus> {
        let l1 = self.l1.remove(key).await;
        let l2 = self.l2.remove(key).await;
        let deleted = |result: &CacheResult<DeleteStatus>| match result {
            Ok(DeleteStatus::Deleted(count)) => *count,
            _ => 0,
        };
        let count = deleted(&l1) + deleted(&l2);
        if count > 0 {
            return Ok(DeleteStatus::Deleted(count));
        }
        merge(l1, l2)
    }

    async fn remove_all(&self) -> CacheResult<()> {
        let l1 = self.l1.remove_all().await;
        let l2 = self.l2.remove_all().await;
        merge(l1, l2)
    }

    fn name(&self) -> &str {
        "tiered"
    }
}
