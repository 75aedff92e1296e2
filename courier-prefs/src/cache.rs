use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use courier_backend::{CacheResult, DeleteStatus, KeyedCache};
use courier_core::{CacheKey, Raw};
use smol_str::SmolStr;
use tokio::sync::Mutex;
use tracing::trace;

use crate::store::{Domain, PreferenceStore};
use crate::PreferenceError;

/// Cache over one domain of a [`PreferenceStore`].
///
/// The domain is loaded into an in-memory mirror by [`open`](Self::open), so
/// every read, including [`get_fast_path`](KeyedCache::get_fast_path), is
/// served from memory. Writes are serialized: each one copies the mirror,
/// applies the change, persists the whole domain and only then publishes the
/// new map. Readers never observe a change that failed to persist.
///
/// An empty domain is removed from the store rather than saved.
///
/// Cloning is cheap; clones share the mirror.
pub struct PreferenceCache<S> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    store: S,
    domain: SmolStr,
    mirror: RwLock<Arc<Domain>>,
    writer: Mutex<()>,
}

impl<S> Clone for PreferenceCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S> fmt::Debug for PreferenceCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceCache")
            .field("domain", &self.inner.domain)
            .field("entries", &self.snapshot().len())
            .finish()
    }
}

impl<S> PreferenceCache<S> {
    /// The domain this cache reads and writes.
    pub fn domain(&self) -> &str {
        &self.inner.domain
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Current contents of the mirror.
    pub fn snapshot(&self) -> Arc<Domain> {
        self.inner
            .mirror
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, domain: Domain) {
        *self
            .inner
            .mirror
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(domain);
    }
}

impl<S: PreferenceStore> PreferenceCache<S> {
    /// Opens `domain` in `store`, loading it into memory.
    pub async fn open(store: S, domain: impl Into<SmolStr>) -> Result<Self, PreferenceError> {
        let domain = domain.into();
        let data = store.load_domain(&domain).await?.unwrap_or_default();
        trace!(%domain, entries = data.len(), "preference domain loaded");
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                domain,
                mirror: RwLock::new(Arc::new(data)),
                writer: Mutex::new(()),
            }),
        })
    }

    /// Re-reads the domain from the store, discarding the mirror.
    pub async fn reload(&self) -> Result<(), PreferenceError> {
        let _writer = self.inner.writer.lock().await;
        let data = self
            .inner
            .store
            .load_domain(&self.inner.domain)
            .await?
            .unwrap_or_default();
        self.publish(data);
        Ok(())
    }

    /// Applies `change` to a copy of the domain, persists it, then publishes it.
    ///
    /// `change` returns `false` when it left the domain untouched; nothing is
    /// persisted in that case.
    async fn update<F>(&self, change: F) -> Result<bool, PreferenceError>
    where
        F: FnOnce(&mut Domain) -> bool + Send,
    {
        let _writer = self.inner.writer.lock().await;
        let mut data = Domain::clone(&self.snapshot());
        if !change(&mut data) {
            return Ok(false);
        }

        let store = &self.inner.store;
        let domain = &self.inner.domain;
        if data.is_empty() {
            store.remove_domain(domain).await?;
        } else {
            store.save_domain(domain, &data).await?;
        }
        trace!(%domain, entries = data.len(), "preference domain persisted");
        self.publish(data);
        Ok(true)
    }
}

#[async_trait]
impl<S: PreferenceStore> KeyedCache<CacheKey, Raw> for PreferenceCache<S> {
    async fn put(&self, value: Raw, key: &CacheKey) -> CacheResult<()> {
        let key = key.to_string();
        self.update(move |data| {
            data.insert(key, value);
            true
        })
        .await?;
        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Raw>> {
        self.get_fast_path(key)
    }

    fn get_fast_path(&self, key: &CacheKey) -> CacheResult<Option<Raw>> {
        Ok(self.snapshot().get(&key.to_string()).cloned())
    }

    async fn remove(&self, key: &CacheKey) -> CacheResult<DeleteStatus> {
        let key = key.to_string();
        let removed = self.update(move |data| data.remove(&key).is_some()).await?;
        Ok(if removed {
            DeleteStatus::Deleted(1)
        } else {
            DeleteStatus::Missing
        })
    }

    async fn remove_all(&self) -> CacheResult<()> {
        self.update(|data| {
            data.clear();
            true
        })
        .await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "preferences"
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::MemoryPreferenceStore;

    async fn open(store: &MemoryPreferenceStore) -> PreferenceCache<MemoryPreferenceStore> {
        PreferenceCache::open(store.clone(), "app").await.unwrap()
    }

    #[tokio::test]
    async fn test_put_persists_and_mirrors() {
        let store = MemoryPreferenceStore::new();
        let cache = open(&store).await;
        let key = CacheKey::from("theme");

        cache.put(Bytes::from_static(b"dark"), &key).await.unwrap();

        assert_eq!(
            cache.get_fast_path(&key).unwrap(),
            Some(Bytes::from_static(b"dark"))
        );
        assert!(store.contains_domain("app"));
        assert_eq!(store.saves(), 1);
    }

    #[tokio::test]
    async fn test_open_loads_existing_domain() {
        let store = MemoryPreferenceStore::new();
        open(&store)
            .await
            .put(Bytes::from_static(b"dark"), &CacheKey::from("theme"))
            .await
            .unwrap();

        let reopened = open(&store).await;

        assert_eq!(
            reopened.get_fast_path(&CacheKey::from("theme")).unwrap(),
            Some(Bytes::from_static(b"dark"))
        );
    }

    #[tokio::test]
    async fn test_removing_last_key_removes_domain() {
        let store = MemoryPreferenceStore::new();
        let cache = open(&store).await;
        let key = CacheKey::from("theme");
        cache.put(Bytes::from_static(b"dark"), &key).await.unwrap();

        assert_eq!(cache.remove(&key).await.unwrap(), DeleteStatus::Deleted(1));

        assert!(!store.contains_domain("app"));
        assert!(cache.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_removing_missing_key_does_not_persist() {
        let store = MemoryPreferenceStore::new();
        let cache = open(&store).await;

        assert_eq!(
            cache.remove(&CacheKey::from("nope")).await.unwrap(),
            DeleteStatus::Missing
        );
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn test_remove_all_removes_domain() {
        let store = MemoryPreferenceStore::new();
        let cache = open(&store).await;
        cache
            .put(Bytes::from_static(b"1"), &CacheKey::from("a"))
            .await
            .unwrap();
        cache
            .put(Bytes::from_static(b"2"), &CacheKey::from("b"))
            .await
            .unwrap();

        cache.remove_all().await.unwrap();

        assert!(!store.contains_domain("app"));
        assert!(cache.get(&CacheKey::from("a")).await.unwrap().is_none());
    }
}
