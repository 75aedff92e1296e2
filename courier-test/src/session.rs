//! In-process transport answering scripted routes.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use courier_core::{Outstanding, Request, Session, TransportError};
use dashmap::DashMap;
use serde_json::Value;

/// A request to the mock server.
///
/// `user` is filled in by the interface, never by endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MockRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub user: Option<String>,
}

impl MockRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
            user: None,
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl Request for MockRequest {
    type Response = Value;
    type Error = MockError;
}

/// Failures the mock transport reports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MockError {
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("transport is offline")]
    Offline,
}

type Responder = Arc<dyn Fn(&MockRequest) -> Result<Value, MockError> + Send + Sync>;

#[derive(Clone)]
struct Route {
    responder: Responder,
    delay: Duration,
}

#[derive(Debug, Default)]
pub struct SessionCounters {
    pub calls: AtomicUsize,
    pub completed: AtomicUsize,
    pub aborted: AtomicUsize,
}

impl SessionCounters {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn aborted(&self) -> usize {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
        self.aborted.store(0, Ordering::SeqCst);
    }
}

/// Counts an execution as aborted unless it is disarmed first.
struct AbortGuard<'a> {
    counters: &'a SessionCounters,
    armed: bool,
}

impl Drop for AbortGuard<'_> {
    fn drop(&mut self) {
        let counter = if self.armed {
            &self.counters.aborted
        } else {
            &self.counters.completed
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// A [`Session`] serving scripted responses by path.
///
/// Unknown paths answer with status 404. Taking the session
/// [`offline`](Self::set_offline) fails every call without consulting the
/// routes, which is how tests tear the transport down.
pub struct MockSession {
    routes: DashMap<String, Route>,
    offline: AtomicBool,
    counters: Arc<SessionCounters>,
    requests: Mutex<Vec<MockRequest>>,
    outstanding: Outstanding,
}

impl Default for MockSession {
    fn default() -> Self {
        Self {
            routes: DashMap::new(),
            offline: AtomicBool::new(false),
            counters: Arc::new(SessionCounters::default()),
            requests: Mutex::new(Vec::new()),
            outstanding: Outstanding::new(),
        }
    }
}

impl MockSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answers `path` with `value`.
    pub fn route(&self, path: &str, value: Value) -> &Self {
        self.route_with(path, move |_| Ok(value.clone()))
    }

    /// Answers `path` with `error`.
    pub fn route_error(&self, path: &str, error: MockError) -> &Self {
        self.route_with(path, move |_| Err(error.clone()))
    }

    /// Answers `path` by calling `responder`. Keeps the route's delay.
    pub fn route_with<F>(&self, path: &str, responder: F) -> &Self
    where
        F: Fn(&MockRequest) -> Result<Value, MockError> + Send + Sync + 'static,
    {
        let responder: Responder = Arc::new(responder);
        self.routes
            .entry(path.to_string())
            .and_modify(|route| route.responder = responder.clone())
            .or_insert_with(|| Route {
                responder: responder.clone(),
                delay: Duration::ZERO,
            });
        self
    }

    /// Delays every answer on `path`.
    pub fn delay(&self, path: &str, delay: Duration) -> &Self {
        if let Some(mut route) = self.routes.get_mut(path) {
            route.delay = delay;
        }
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    pub fn calls(&self) -> usize {
        self.counters.calls()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Session for MockSession {
    type Request = MockRequest;

    async fn execute(&self, request: MockRequest) -> Result<Value, TransportError<MockError>> {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(request.clone());
        let mut guard = AbortGuard {
            counters: &self.counters,
            armed: true,
        };

        if self.offline.load(Ordering::SeqCst) {
            guard.armed = false;
            return Err(TransportError::Request(MockError::Offline));
        }

        let route = self.routes.get(&request.path).map(|route| route.value().clone());
        let Some(route) = route else {
            guard.armed = false;
            return Err(TransportError::Request(MockError::Status(404)));
        };

        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }
        let result = (route.responder)(&request);
        guard.armed = false;
        result.map_err(TransportError::Request)
    }

    fn outstanding(&self) -> &Outstanding {
        &self.outstanding
    }
}
