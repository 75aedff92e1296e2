//! Client, coordinator and resource working together over the mock session.

use std::sync::Arc;
use std::time::Duration;

use courier::{
    ApiError, CachePolicy, Client, EndpointCoordinator, KeyedCache, Resource, ResourceConfig,
    SessionCache, TaskResult, TaskState,
};
use courier_configuration::CacheConfig;
use courier_moka::MemoryCache;
use courier_test::{
    Constant, CountingCache, LibraryApi, Lookup, MockError, MockRequest, MockSession, Profile,
    Shelf,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn memory(capacity: u64) -> Arc<MemoryCache<MockRequest, Value>> {
    Arc::new(
        MemoryCache::<MockRequest, Value>::builder()
            .max_entries(capacity)
            .build(),
    )
}

fn client_with(
    api: LibraryApi,
    session: Arc<MockSession>,
    cache: SessionCache<LibraryApi>,
) -> Arc<Client<LibraryApi>> {
    Client::builder(api, session)
        .shared_session_cache(cache)
        .build()
}

#[tokio::test]
async fn test_session_cache_evicts_least_recently_used() {
    let session = MockSession::new();
    for key in ["a", "b", "c"] {
        session.route(&format!("/entries/{key}"), json!(format!("value-{key}")));
    }
    let cache = memory(2);
    let client = client_with(LibraryApi::anonymous(), session.clone(), cache.clone());

    for key in ["a", "b", "c"] {
        let result = client.run_default(&Lookup, key.to_string()).await;
        assert!(matches!(result, TaskResult::Success(value) if value == format!("value-{key}")));
        cache.run_pending_tasks();
    }
    assert_eq!(session.calls(), 3);

    // b and c are served from memory; a was evicted and goes back to the transport.
    for key in ["b", "c"] {
        assert!(client.run_default(&Lookup, key.to_string()).await.is_success());
    }
    assert_eq!(session.calls(), 3);

    assert!(client.run_default(&Lookup, "a".to_string()).await.is_success());
    assert_eq!(session.calls(), 4);
}

#[tokio::test]
async fn test_fast_path_survives_transport_teardown() {
    let session = MockSession::new();
    session.route("/constant", json!(5));
    let cache: SessionCache<LibraryApi> = memory(16);

    let online = client_with(LibraryApi::anonymous(), session.clone(), cache.clone());
    let first = EndpointCoordinator::new(Constant, ());
    assert!(matches!(first.run(&online).unwrap().await, TaskResult::Success(5)));
    assert_eq!(session.calls(), 1);

    // A new transport that cannot reach anything, sharing the same cache.
    let offline_session = MockSession::new();
    offline_session.set_offline(true);
    let offline = client_with(LibraryApi::anonymous(), offline_session.clone(), cache);

    let fresh = EndpointCoordinator::new(Constant, ());
    assert!(matches!(fresh.run(&offline).unwrap().await, TaskResult::Success(5)));
    assert_eq!(fresh.state(), TaskState::Succeeded);
    assert_eq!(offline_session.calls(), 0);
}

#[tokio::test]
async fn test_offline_without_cache_is_bad_request() {
    let session = MockSession::new();
    session.set_offline(true);
    let client = Client::builder(LibraryApi::anonymous(), session.clone()).build();

    match client.run_default(&Constant, ()).await {
        TaskResult::Error(ApiError::BadRequest(error)) => assert_eq!(error, MockError::Offline),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_new_run_supersedes_in_flight_run() {
    let session = MockSession::new();
    session
        .route("/constant", json!(1))
        .delay("/constant", Duration::from_secs(10));
    let client = Client::builder(LibraryApi::anonymous(), session.clone()).build();
    let coordinator = EndpointCoordinator::new(Constant, ());

    let slow = coordinator.run(&client).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    session
        .route("/constant", json!(2))
        .delay("/constant", Duration::ZERO);
    let fast = coordinator.run(&client).unwrap();

    assert!(slow.await.is_canceled());
    assert!(matches!(fast.await, TaskResult::Success(2)));
    assert!(matches!(coordinator.last_result(), Some(TaskResult::Success(2))));
    assert_eq!(session.counters().aborted(), 1);
    assert_eq!(session.counters().completed(), 1);
}

#[tokio::test]
async fn test_cancel_aborts_transport_call() {
    let session = MockSession::new();
    session
        .route("/constant", json!(1))
        .delay("/constant", Duration::from_secs(10));
    let client = Client::builder(LibraryApi::anonymous(), session.clone()).build();
    let coordinator = EndpointCoordinator::new(Constant, ());
    let mut results = coordinator.subscribe();

    let handle = coordinator.run(&client).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(coordinator.cancel());
    assert!(handle.await.is_canceled());
    assert_eq!(coordinator.state(), TaskState::Canceled);
    assert!(matches!(*results.borrow_and_update(), Some(TaskResult::Canceled)));
    assert_eq!(session.counters().aborted(), 1);
}

#[tokio::test]
async fn test_dependency_gates_until_resource_resolves() {
    let session = MockSession::new();
    session
        .route("/profile", json!({ "name": "Ada" }))
        .route("/constant", json!(7));
    let client = Client::builder(LibraryApi::anonymous(), session.clone()).build();

    let profile = Resource::new(EndpointCoordinator::new(Profile, ()));
    profile.attach(&client).await;
    let gated = EndpointCoordinator::new(Constant, ()).depends_on(profile.clone());

    // Anonymous: the profile cannot be built, so the gate stays closed.
    assert!(profile.fetch(&client).unwrap().await.is_error());
    let error = gated.run(&client).unwrap_err();
    assert!(error.is_runtime());
    assert_eq!(gated.state(), TaskState::Failed);
    assert_eq!(session.calls(), 0);

    // Signing in changes identity; the attached resource refetches by itself.
    let mut values = profile.subscribe();
    client.set_interface(LibraryApi::signed_in("ada"));
    values.changed().await.unwrap();
    assert_eq!(profile.latest_value().as_deref(), Some("Ada (ada)"));

    assert!(matches!(gated.run(&client).unwrap().await, TaskResult::Success(7)));
    assert_eq!(session.calls(), 2);
}

#[tokio::test]
async fn test_paginated_resource_loads_every_page() {
    let session = MockSession::new();
    session.shelf(vec!["dune", "emma", "ivanhoe", "lolita", "ulysses"]);
    let client = Client::builder(LibraryApi::anonymous(), session.clone()).build();
    let shelf = Resource::new(EndpointCoordinator::new(Shelf, ()).paginated());
    shelf.attach(&client).await;

    while !shelf.coordinator().is_exhausted() {
        assert!(shelf.fetch(&client).unwrap().await.is_success());
    }

    let titles = shelf.require().unwrap();
    assert_eq!(titles.all(), ["dune", "emma", "ivanhoe", "lolita", "ulysses"]);
    assert_eq!(titles.pages().count(), 3);
    assert_eq!(session.calls(), 3);
    let pages: Vec<_> = session
        .requests()
        .iter()
        .map(|request| request.query("page").map(str::to_string))
        .collect();
    assert_eq!(
        pages,
        vec![Some("1".to_string()), Some("2".to_string()), Some("3".to_string())]
    );
}

#[tokio::test]
async fn test_counting_cache_sees_fast_path_then_write() {
    let session = MockSession::new();
    session.route("/constant", json!(3));
    let cache = Arc::new(CountingCache::new(
        MemoryCache::<MockRequest, Value>::builder()
            .max_entries(4)
            .build(),
    ));
    let counters = cache.counters();
    let client = client_with(LibraryApi::anonymous(), session.clone(), cache);

    assert!(client.run_default(&Constant, ()).await.is_success());
    assert!(client.run_default(&Constant, ()).await.is_success());

    assert_eq!(session.calls(), 1);
    assert_eq!(counters.fast_path_count(), 2);
    assert_eq!(counters.read_miss_count(), 1);
    assert_eq!(counters.read_hit_count(), 1);
    assert_eq!(counters.write_count(), 1);
}

#[tokio::test]
async fn test_configured_resource_cache_hydrates_next_client() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = format!(
        r#"
backend:
  type: Disk
  path: "{}"
value:
  format: Json
  prefix: "library"
"#,
        dir.path().display()
    );
    let config = ResourceConfig::persistent("constant", CachePolicy::ReturnCacheElseLoad);

    let session = MockSession::new();
    session.route("/constant", json!(11));
    let first = Client::builder(LibraryApi::anonymous(), session.clone())
        .resource_cache(CacheConfig::from_yaml(&yaml).unwrap().into_coding_cache().await.unwrap())
        .build();
    let resource = Resource::with_config(EndpointCoordinator::new(Constant, ()), config.clone());
    resource.attach(&first).await;
    assert!(resource.fetch(&first).unwrap().await.is_success());

    // Persisting happens in the background.
    let cache = first.resource_cache().unwrap().clone();
    let key = config.persistent_key.clone().unwrap();
    for _ in 0..100 {
        if KeyedCache::<_, i32>::get(&cache, &key).await.unwrap().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let offline = MockSession::new();
    offline.set_offline(true);
    let second = Client::builder(LibraryApi::anonymous(), offline.clone())
        .resource_cache(CacheConfig::from_yaml(&yaml).unwrap().into_coding_cache().await.unwrap())
        .build();
    let restored = Resource::with_config(EndpointCoordinator::new(Constant, ()), config);
    restored.attach(&second).await;

    assert_eq!(restored.value(&second), Some(11));
    assert_eq!(offline.calls(), 0);
}
