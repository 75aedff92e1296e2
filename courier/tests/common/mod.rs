#![allow(dead_code)]

//! A small numbers API served by a scriptable in-process session.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use courier::{
    ApiError, BoxError, BuildContext, DecodeContext, Endpoint, EndpointError, Interface,
    Outstanding, PageOptions, PaginatedList, PaginationCursor, PartialPage, Request, Session,
    TransportError,
};

pub const PAGE_SIZE: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumberRequest {
    pub path: String,
    pub offset: Option<i64>,
    pub account: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("server rejected request with status {0}")]
pub struct Rejected(pub u16);

impl Request for NumberRequest {
    type Response = Vec<i64>;
    type Error = Rejected;
}

pub type NumbersError = ApiError<Rejected>;

#[derive(Debug, Clone)]
pub struct NumbersApi {
    pub account: u32,
}

impl Interface for NumbersApi {
    type Request = NumberRequest;
    type Error = NumbersError;
    type Id = u32;

    fn id(&self) -> u32 {
        self.account
    }

    fn prepare_request(&self, request: &mut NumberRequest) {
        request.account = self.account;
    }
}

type Responder = dyn Fn(&NumberRequest) -> Result<Vec<i64>, Rejected> + Send + Sync;

/// Session answering from a closure, counting every call.
pub struct StubSession {
    responder: Mutex<Arc<Responder>>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
    outstanding: Outstanding,
}

impl StubSession {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&NumberRequest) -> Result<Vec<i64>, Rejected> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Mutex::new(Arc::new(responder)),
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
            outstanding: Outstanding::new(),
        })
    }

    /// Session serving `items` from `/items` in pages and `value` elsewhere.
    pub fn numbers(value: i64, items: Vec<i64>) -> Arc<Self> {
        Self::new(move |request| {
            if request.path == "/items" {
                let offset = request.offset.unwrap_or(0) as usize;
                Ok(items.iter().skip(offset).take(PAGE_SIZE).copied().collect())
            } else {
                Ok(vec![value])
            }
        })
    }

    pub fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&NumberRequest) -> Result<Vec<i64>, Rejected> + Send + Sync + 'static,
    {
        *self.responder.lock().unwrap() = Arc::new(responder);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Session for StubSession {
    type Request = NumberRequest;

    async fn execute(&self, request: NumberRequest) -> Result<Vec<i64>, TransportError<Rejected>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let responder = self.responder.lock().unwrap().clone();
        responder(&request).map_err(TransportError::Request)
    }

    fn outstanding(&self) -> &Outstanding {
        &self.outstanding
    }
}

/// Fetches the single number at a path.
#[derive(Debug, Clone)]
pub struct Number(pub &'static str);

impl Endpoint for Number {
    type Root = NumbersApi;
    type Input = ();
    type Output = i64;
    type Options = ();

    fn build(
        &self,
        _input: &(),
        _context: BuildContext<'_, NumbersApi, ()>,
    ) -> Result<NumberRequest, BoxError> {
        Ok(NumberRequest {
            path: self.0.to_string(),
            offset: None,
            account: 0,
        })
    }

    fn decode(
        &self,
        response: Vec<i64>,
        _context: DecodeContext<'_, NumbersApi, (), ()>,
    ) -> Result<i64, BoxError> {
        response
            .first()
            .copied()
            .ok_or_else(|| EndpointError::UnexpectedResponse("empty body".into()).into())
    }
}

/// Fetches `/items` one page at a time.
#[derive(Debug, Clone)]
pub struct Items;

impl Endpoint for Items {
    type Root = NumbersApi;
    type Input = ();
    type Output = PaginatedList<i64>;
    type Options = PageOptions;

    fn build(
        &self,
        _input: &(),
        context: BuildContext<'_, NumbersApi, PageOptions>,
    ) -> Result<NumberRequest, BoxError> {
        Ok(NumberRequest {
            path: "/items".to_string(),
            offset: context
                .options
                .cursor
                .as_ref()
                .and_then(PaginationCursor::offset_value),
            account: 0,
        })
    }

    fn decode(
        &self,
        response: Vec<i64>,
        context: DecodeContext<'_, NumbersApi, (), PageOptions>,
    ) -> Result<PaginatedList<i64>, BoxError> {
        let cursor = context.options.cursor.clone();
        let offset = cursor
            .as_ref()
            .and_then(PaginationCursor::offset_value)
            .unwrap_or(0);
        let next = (response.len() == PAGE_SIZE)
            .then(|| PaginationCursor::Offset(offset + PAGE_SIZE as i64));

        let mut list = PaginatedList::starting_at(cursor);
        list.coalesce(PartialPage::new(response, next));
        Ok(list)
    }
}

/// Waits until `check` holds, polling the runtime in small steps.
pub async fn eventually<F: Fn() -> bool>(check: F) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
