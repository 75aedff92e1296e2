mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Items, Number, NumberRequest, NumbersApi, Rejected, StubSession};
use courier::{ApiError, Client, EndpointCoordinator, Session, TaskResult, TaskState};
use courier_moka::MemoryCache;

fn client(session: Arc<StubSession>) -> Arc<Client<NumbersApi>> {
    Client::builder(NumbersApi { account: 1 }, session)
        .session_cache(
            MemoryCache::<NumberRequest, Vec<i64>>::builder()
                .max_entries(100)
                .build(),
        )
        .build()
}

#[tokio::test]
async fn test_run_publishes_success() {
    let session = StubSession::numbers(5, vec![]);
    let client = client(session.clone());
    let coordinator = EndpointCoordinator::new(Number("/five"), ());
    let mut results = coordinator.subscribe();

    let result = coordinator.run(&client).unwrap().await;

    assert!(matches!(result, TaskResult::Success(5)));
    assert_eq!(coordinator.state(), TaskState::Succeeded);
    assert!(matches!(coordinator.last_result(), Some(TaskResult::Success(5))));
    assert!(results.has_changed().unwrap());
    assert!(matches!(*results.borrow_and_update(), Some(TaskResult::Success(5))));
    assert_eq!(session.calls(), 1);
}

#[tokio::test]
async fn test_fresh_coordinator_is_served_from_fast_path() {
    let session = StubSession::numbers(5, vec![]);
    let client = client(session.clone());

    let first = EndpointCoordinator::new(Number("/five"), ());
    assert!(first.run(&client).unwrap().await.is_success());

    session.respond_with(|_| Err(Rejected(503)));
    let second = EndpointCoordinator::new(Number("/five"), ());
    let result = second.run(&client).unwrap().await;

    assert!(matches!(result, TaskResult::Success(5)));
    assert_eq!(session.calls(), 1);
}

#[tokio::test]
async fn test_transport_rejection_is_bad_request() {
    let session = StubSession::new(|_| Err(Rejected(500)));
    let client = client(session);
    let coordinator = EndpointCoordinator::new(Number("/broken"), ());

    let result = coordinator.run(&client).unwrap().await;

    match result {
        TaskResult::Error(ApiError::BadRequest(Rejected(500))) => {}
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(coordinator.state(), TaskState::Failed);
}

#[tokio::test]
async fn test_decode_failure_is_runtime_error() {
    let session = StubSession::new(|_| Ok(vec![]));
    let client = client(session);
    let coordinator = EndpointCoordinator::new(Number("/empty"), ());

    let result = coordinator.run(&client).unwrap().await;

    assert!(matches!(result, TaskResult::Error(ApiError::Runtime(_))));
}

#[tokio::test]
async fn test_output_mapping_failure_is_runtime_error() {
    let session = StubSession::numbers(5, vec![]);
    let client = client(session);
    let coordinator = EndpointCoordinator::new(Number("/five"), ())
        .map_output(|value: i64| u8::try_from(value * 100).map_err(Into::into));

    let result = coordinator.run(&client).unwrap().await;

    assert!(matches!(result, TaskResult::Error(ApiError::Runtime(_))));
}

#[tokio::test]
async fn test_second_run_supersedes_first() {
    let session = StubSession::numbers(5, vec![]);
    session.set_delay(Duration::from_millis(100));
    let client = client(session.clone());
    let coordinator = EndpointCoordinator::new(Number("/five"), ());

    let first = coordinator.run(&client).unwrap();
    let second = coordinator.run(&client).unwrap();

    assert!(first.await.is_canceled());
    assert!(matches!(second.await, TaskResult::Success(5)));
    assert!(matches!(coordinator.last_result(), Some(TaskResult::Success(5))));

    // The superseded run never publishes late.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(matches!(coordinator.last_result(), Some(TaskResult::Success(5))));
    assert_eq!(coordinator.state(), TaskState::Succeeded);
}

#[tokio::test]
async fn test_cancel_keeps_last_result() {
    let session = StubSession::numbers(5, vec![]);
    let client = client(session.clone());
    let coordinator = EndpointCoordinator::new(Number("/five"), ());
    coordinator.run(&client).unwrap().await;

    session.set_delay(Duration::from_secs(5));
    let pending = EndpointCoordinator::new(Number("/slow"), ());
    let handle = pending.run(&client).unwrap();
    assert!(pending.is_running());

    assert!(pending.cancel());

    assert!(handle.await.is_canceled());
    assert_eq!(pending.state(), TaskState::Canceled);
    assert!(pending.last_result().is_none());
    assert!(matches!(*pending.subscribe().borrow(), Some(TaskResult::Canceled)));
    assert!(!coordinator.cancel());
    assert!(matches!(coordinator.last_result(), Some(TaskResult::Success(5))));
}

#[tokio::test]
async fn test_reset_forgets_result() {
    let session = StubSession::numbers(5, vec![]);
    let client = client(session);
    let coordinator = EndpointCoordinator::new(Number("/five"), ());
    coordinator.run(&client).unwrap().await;

    coordinator.reset();

    assert_eq!(coordinator.state(), TaskState::Idle);
    assert!(coordinator.last_result().is_none());
    assert!(coordinator.subscribe().borrow().is_none());
}

#[tokio::test]
async fn test_unresolved_dependency_skips_transport() {
    let session = StubSession::numbers(5, vec![]);
    let client = client(session.clone());
    let coordinator = EndpointCoordinator::new(Number("/five"), ())
        .depends_on(|client: &Client<NumbersApi>| client.interface().account == 2);

    let error = coordinator.run(&client).unwrap_err();

    assert!(error.is_runtime());
    assert!(error.to_string().contains("predicate"));
    assert_eq!(session.calls(), 0);
    assert_eq!(coordinator.state(), TaskState::Failed);
    assert!(coordinator.last_result().is_none());

    client.set_interface(NumbersApi { account: 2 });
    assert!(coordinator.run(&client).unwrap().await.is_success());
    assert_eq!(session.calls(), 1);
}

#[tokio::test]
async fn test_input_resolved_from_client() {
    let session = StubSession::new(|request| Ok(vec![i64::from(request.account)]));
    let client = client(session);
    let coordinator = EndpointCoordinator::new(Number("/whoami"), ());

    assert!(matches!(coordinator.run(&client).unwrap().await, TaskResult::Success(1)));

    client.set_interface(NumbersApi { account: 7 });
    assert!(matches!(coordinator.run(&client).unwrap().await, TaskResult::Success(7)));
}

#[tokio::test]
async fn test_pages_are_concatenated() {
    let session = StubSession::numbers(0, vec![1, 2, 3, 4, 5]);
    let client = client(session.clone());
    let coordinator = EndpointCoordinator::new(Items, ()).paginated();

    let first = coordinator.run(&client).unwrap().await;
    assert_eq!(first.value().unwrap().all(), &[1, 2]);
    assert!(!coordinator.is_exhausted());

    coordinator.run(&client).unwrap().await;
    let last = coordinator.run(&client).unwrap().await;

    let list = last.value().unwrap();
    assert_eq!(list.all(), &[1, 2, 3, 4, 5]);
    assert!(list.is_terminal());
    assert_eq!(list.pages().count(), 3);
    assert!(coordinator.is_exhausted());
    assert_eq!(session.calls(), 3);
}

#[tokio::test]
async fn test_run_after_last_page_starts_over() {
    let session = StubSession::numbers(0, vec![1, 2, 3, 4, 5]);
    let client = client(session);
    let coordinator = EndpointCoordinator::new(Items, ()).paginated();
    for _ in 0..3 {
        coordinator.run(&client).unwrap().await;
    }
    assert!(coordinator.is_exhausted());

    let restarted = coordinator.run(&client).unwrap().await;
    let list = restarted.value().unwrap();
    assert_eq!(list.all(), &[1, 2]);
    assert_eq!(list.pages().count(), 1);
    assert!(!coordinator.is_exhausted());

    let next = coordinator.run(&client).unwrap().await;
    let list = next.value().unwrap();
    assert_eq!(list.all(), &[1, 2, 3, 4]);
    let flattened: Vec<_> = list.pages().flat_map(|(_, items)| items.to_vec()).collect();
    assert_eq!(flattened, list.all());
}

#[tokio::test]
async fn test_reset_restarts_pagination() {
    let session = StubSession::numbers(0, vec![1, 2, 3]);
    let client = client(session);
    let coordinator = EndpointCoordinator::new(Items, ()).paginated();
    coordinator.run(&client).unwrap().await;
    coordinator.run(&client).unwrap().await;

    coordinator.reset();
    let result = coordinator.run(&client).unwrap().await;

    assert_eq!(result.value().unwrap().all(), &[1, 2]);
}

#[tokio::test]
async fn test_shutdown_cancels_running_work() {
    let session = StubSession::numbers(5, vec![]);
    session.set_delay(Duration::from_secs(5));
    let client = client(session.clone());
    let coordinator = EndpointCoordinator::new(Number("/five"), ());

    let results = coordinator.subscribe();

    let handle = coordinator.run(&client).unwrap();
    client.shutdown();

    assert!(handle.await.is_canceled());
    assert_eq!(coordinator.state(), TaskState::Canceled);
    assert!(matches!(*results.borrow(), Some(TaskResult::Canceled)));
    assert!(session.outstanding().is_empty());
}
