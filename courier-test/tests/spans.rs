//! Tracing spans emitted by coordinator runs.

use courier::{Client, EndpointCoordinator};
use courier_test::{Constant, LibraryApi, MockSession, create_span_collector};
use serde_json::json;

#[tokio::test]
async fn test_each_run_opens_fetch_span() {
    let collector = create_span_collector();
    let session = MockSession::new();
    session.route("/constant", json!(1));
    let client = Client::builder(LibraryApi::anonymous(), session).build();
    let coordinator = EndpointCoordinator::new(Constant, ());

    for _ in 0..2 {
        let handle = tracing::dispatcher::with_default(collector.dispatch(), || {
            coordinator.run(&client).unwrap()
        });
        assert!(handle.await.is_success());
    }

    let spans = collector.named("courier.fetch");
    assert_eq!(spans.len(), 2);
    assert!(spans[0].field("endpoint").unwrap().ends_with("Constant"));
    assert_ne!(spans[0].field("generation"), spans[1].field("generation"));
}

#[tokio::test]
async fn test_gated_run_opens_no_span() {
    let collector = create_span_collector();
    let session = MockSession::new();
    let client = Client::builder(LibraryApi::anonymous(), session.clone()).build();
    let coordinator = EndpointCoordinator::new(Constant, ())
        .depends_on(|client: &Client<LibraryApi>| client.interface().user.is_some());

    let result = tracing::dispatcher::with_default(collector.dispatch(), || coordinator.run(&client));

    assert!(result.is_err());
    assert!(collector.named("courier.fetch").is_empty());
    assert_eq!(session.calls(), 0);
}
