#![allow(dead_code)]

//! Simple in-memory test backend implementation using DashMap.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use courier_backend::{CacheError, CacheResult, DeleteStatus, KeyedCache};
use courier_core::{CacheKey, Raw};
use dashmap::DashMap;

/// In-memory byte backend that can also pretend to be durable-only.
#[derive(Clone, Default)]
pub struct TestBackend {
    store: Arc<DashMap<CacheKey, Raw>>,
    durable_only: bool,
    failing: bool,
    reads: Arc<AtomicUsize>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend without a fast path, like a disk store.
    pub fn durable() -> Self {
        Self {
            durable_only: true,
            ..Self::default()
        }
    }

    /// Backend whose every operation fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn has(&self, key: &CacheKey) -> bool {
        self.store.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.store.iter().map(|e| e.key().to_string()).collect();
        keys.sort();
        keys
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check(&self) -> CacheResult<()> {
        if self.failing {
            Err(CacheError::connection(std::io::Error::other("backend down")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyedCache<CacheKey, Raw> for TestBackend {
    async fn put(&self, value: Raw, key: &CacheKey) -> CacheResult<()> {
        self.check()?;
        self.store.insert(key.clone(), value);
        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Raw>> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.get(key).map(|v| v.clone()))
    }

    fn get_fast_path(&self, key: &CacheKey) -> CacheResult<Option<Raw>> {
        self.check()?;
        if self.durable_only {
            return Ok(None);
        }
        Ok(self.store.get(key).map(|v| v.clone()))
    }

    async fn remove(&self, key: &CacheKey) -> CacheResult<DeleteStatus> {
        self.check()?;
        Ok(match self.store.remove(key) {
            Some(_) => DeleteStatus::Deleted(1),
            None => DeleteStatus::Missing,
        })
    }

    async fn remove_all(&self) -> CacheResult<()> {
        self.check()?;
        self.store.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "test"
    }
}
