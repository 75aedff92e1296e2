use courier_backend::{CodingCache, KeyedCache};
use courier_core::CacheKey;
use courier_prefs::{FilePreferenceStore, PreferenceCache};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    user: String,
    expires_in: u32,
}

fn session() -> Session {
    Session {
        user: "ada".into(),
        expires_in: 3600,
    }
}

#[tokio::test]
async fn test_values_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = FilePreferenceStore::new(dir.path()).unwrap();
        let prefs = PreferenceCache::open(store, "com.example.session")
            .await
            .unwrap();
        let cache = CodingCache::new(prefs);
        cache.put(session(), &"current").await.unwrap();
    }

    let store = FilePreferenceStore::new(dir.path()).unwrap();
    let prefs = PreferenceCache::open(store, "com.example.session")
        .await
        .unwrap();
    let cache = CodingCache::new(prefs);

    let fast: Option<Session> = cache.get_fast_path(&"current").unwrap();
    assert_eq!(fast, Some(session()));
}

#[tokio::test]
async fn test_emptied_domain_leaves_no_file() {
    let dir = TempDir::new().unwrap();
    let store = FilePreferenceStore::new(dir.path()).unwrap();
    let prefs = PreferenceCache::open(store, "settings").await.unwrap();
    let file = dir.path().join("settings.prefs");

    prefs
        .put(bytes::Bytes::from_static(b"1"), &CacheKey::from("a"))
        .await
        .unwrap();
    assert!(file.exists());

    prefs.remove(&CacheKey::from("a")).await.unwrap();
    assert!(!file.exists());
}

#[tokio::test]
async fn test_domains_are_independent() {
    let dir = TempDir::new().unwrap();
    let store = FilePreferenceStore::new(dir.path()).unwrap();
    let first = PreferenceCache::open(store.clone(), "first").await.unwrap();
    let second = PreferenceCache::open(store, "second").await.unwrap();

    first
        .put(bytes::Bytes::from_static(b"1"), &CacheKey::from("k"))
        .await
        .unwrap();
    second.remove_all().await.unwrap();

    assert!(first.get(&CacheKey::from("k")).await.unwrap().is_some());
    assert!(second.get(&CacheKey::from("k")).await.unwrap().is_none());
}
