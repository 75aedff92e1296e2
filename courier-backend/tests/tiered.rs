mod common;

use common::TestBackend;
use courier_backend::{CodingCache, DeleteStatus, KeyedCache, Tiered};
use courier_core::{CacheKey, Raw};

fn key(name: &str) -> CacheKey {
    CacheKey::from(name)
}

fn raw(value: &'static str) -> Raw {
    Raw::from_static(value.as_bytes())
}

#[tokio::test]
async fn test_write_through_to_both_layers() {
    let l1 = TestBackend::new();
    let l2 = TestBackend::durable();
    let cache = Tiered::new(l1.clone(), l2.clone());

    cache.put(raw("v"), &key("a")).await.unwrap();
    assert!(l1.has(&key("a")));
    assert!(l2.has(&key("a")));
}

#[tokio::test]
async fn test_l2_hit_refills_l1() {
    let l1 = TestBackend::new();
    let l2 = TestBackend::durable();
    l2.put(raw("v"), &key("a")).await.unwrap();
    let cache = Tiered::new(l1.clone(), l2.clone());

    assert_eq!(cache.get_fast_path(&key("a")).unwrap(), None::<Raw>);
    assert_eq!(cache.get(&key("a")).await.unwrap(), Some(raw("v")));
    assert!(l1.has(&key("a")));
    assert_eq!(cache.get_fast_path(&key("a")).unwrap(), Some(raw("v")));
}

#[tokio::test]
async fn test_l1_hit_skips_l2() {
    let l1 = TestBackend::new();
    let l2 = TestBackend::durable();
    let cache = Tiered::new(l1.clone(), l2.clone());

    cache.put(raw("v"), &key("a")).await.unwrap();
    assert_eq!(cache.get(&key("a")).await.unwrap(), Some(raw("v")));
    assert_eq!(l2.reads(), 0);
}

#[tokio::test]
async fn test_single_layer_failure_is_tolerated() {
    let cache = Tiered::new(TestBackend::failing(), TestBackend::new());
    cache.put(raw("v"), &key("a")).await.unwrap();
    assert_eq!(cache.get(&key("a")).await.unwrap(), Some(raw("v")));

    let cache = Tiered::new(TestBackend::failing(), TestBackend::failing());
    assert!(cache.put(raw("v"), &key("a")).await.is_err());
}

#[tokio::test]
async fn test_remove_counts_both_layers() {
    let cache = Tiered::new(TestBackend::new(), TestBackend::new());
    cache.put(raw("v"), &key("a")).await.unwrap();

    let removed = KeyedCache::<CacheKey, Raw>::remove(&cache, &key("a")).await;
    assert_eq!(removed.unwrap(), DeleteStatus::Deleted(2));
    let removed = KeyedCache::<CacheKey, Raw>::remove(&cache, &key("a")).await;
    assert_eq!(removed.unwrap(), DeleteStatus::Missing);
}

#[tokio::test]
async fn test_coding_cache_over_tiers() {
    let l2 = TestBackend::durable();
    let cache = CodingCache::new(Tiered::new(TestBackend::new(), l2.clone()));
    cache.put(vec![1u8, 2, 3], &"list").await.unwrap();

    let fresh = CodingCache::new(Tiered::new(TestBackend::new(), l2));
    let fast: Option<Vec<u8>> = fresh.get_fast_path(&"list").unwrap();
    assert_eq!(fast, None);
    let value: Option<Vec<u8>> = fresh.get(&"list").await.unwrap();
    assert_eq!(value, Some(vec![1, 2, 3]));
    let fast: Option<Vec<u8>> = fresh.get_fast_path(&"list").unwrap();
    assert_eq!(fast, Some(vec![1, 2, 3]));
}
