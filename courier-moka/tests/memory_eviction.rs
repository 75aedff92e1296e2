//! Tests for memory cache eviction.

use std::time::Duration;

use bytes::Bytes;
use courier_backend::{CodingCache, KeyedCache};
use courier_core::CacheKey;
use courier_moka::{EvictionPolicy, MemoryCache};

#[tokio::test]
async fn test_capacity_two_evicts_oldest() {
    let cache = MemoryCache::<String, String>::builder().max_entries(2).build();

    for key in ["a", "b", "c"] {
        cache.put(format!("value-{key}"), &key.to_string()).await.unwrap();
        cache.run_pending_tasks();
    }

    assert_eq!(cache.get(&"a".to_string()).await.unwrap(), None, "a should be evicted");
    assert_eq!(
        cache.get(&"b".to_string()).await.unwrap().as_deref(),
        Some("value-b")
    );
    assert_eq!(
        cache.get(&"c".to_string()).await.unwrap().as_deref(),
        Some("value-c")
    );
}

#[tokio::test]
async fn test_reads_refresh_recency() {
    let cache = MemoryCache::<u32, u32>::builder().max_entries(2).build();

    cache.put(1, &1).await.unwrap();
    cache.put(2, &2).await.unwrap();
    cache.run_pending_tasks();
    assert_eq!(cache.get(&1).await.unwrap(), Some(1));
    cache.run_pending_tasks();

    cache.put(3, &3).await.unwrap();
    cache.run_pending_tasks();

    assert_eq!(cache.get(&1).await.unwrap(), Some(1));
    assert_eq!(cache.get(&2).await.unwrap(), None);
    assert_eq!(cache.get(&3).await.unwrap(), Some(3));
}

#[tokio::test]
async fn test_weighted_capacity() {
    let cache = MemoryCache::<CacheKey, Bytes>::builder()
        .max_weight(250, |_key: &CacheKey, value: &Bytes| value.len() as u32)
        .build();

    for i in 0..3u8 {
        let key = CacheKey::from(format!("k{i}"));
        cache.put(Bytes::from(vec![i; 100]), &key).await.unwrap();
        cache.run_pending_tasks();
    }

    assert_eq!(cache.entry_count(), 2);
    assert!(cache.cache().weighted_size() <= 250);
}

#[tokio::test]
async fn test_time_to_live_expires_entries() {
    let cache = MemoryCache::<u8, u8>::builder()
        .time_to_live(Duration::from_millis(50))
        .eviction_policy(EvictionPolicy::tiny_lfu())
        .max_entries(10)
        .build();

    cache.put(1, &1).await.unwrap();
    assert_eq!(cache.get_fast_path(&1).unwrap(), Some(1));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(cache.get_fast_path(&1).unwrap(), None);
}

#[tokio::test]
async fn test_as_coding_cache_backend() {
    let memory = MemoryCache::<CacheKey, Bytes>::builder().max_entries(10).build();
    let cache = CodingCache::new(memory).with_prefix("users");

    cache.put(vec!["ada".to_string()], &"names").await.unwrap();
    let names: Option<Vec<String>> = cache.get_fast_path(&"names").unwrap();
    assert_eq!(names, Some(vec!["ada".to_string()]));
}
