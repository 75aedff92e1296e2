#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// The composition root.
///
/// A [`Client`](client::Client) binds an interface to a session, a session
/// cache keyed by request and an optional resource cache.
pub mod client;

/// Per-resource fetch orchestration.
///
/// [`EndpointCoordinator`](coordinator::EndpointCoordinator) runs one endpoint
/// for one logical resource: it builds the request, consults the cache,
/// calls the transport, decodes, merges pages and publishes the result.
pub mod coordinator;

/// Preconditions that must hold before a coordinator may run.
pub mod dependency;

/// Error types raised by coordinators and resources.
pub mod error;

/// Metrics collection for fetch observability.
///
/// Enable the `metrics` feature to record run, fast-path, transport,
/// cancellation and failure counters.
pub mod metrics;

/// Cache policies and per-resource configuration.
pub mod policy;

/// Reactive handles that fetch on first read and follow the client.
pub mod resource;

pub use client::{Client, ClientBuilder, SessionCache};
pub use coordinator::{EndpointCoordinator, TaskHandle};
pub use dependency::Dependency;
pub use error::ResourceError;
pub use policy::{CachePolicy, ResourceConfig};
pub use resource::{Resource, Subscription};

pub use courier_backend::{CacheError, CodingCache, DeleteStatus, KeyedCache, NoopCache, Tiered};
pub use courier_core::{
    ApiError, ApiKey, AuthorizationCredential, BoxEndpoint, BoxError, BuildContext, CacheKey,
    CursorPaginated, DecodeContext, Endpoint, EndpointError, EndpointExt, FetchLimit, FnEndpoint,
    Interface, InterfaceError, KeyPart, NeverEndpoint, OpaqueValue, Outstanding, PageOptions,
    PaginatedList, PaginationCursor, PaginationError, PartialPage, Raw, Request, RequestErrorOf,
    RequestOf, ResponseOf, Session, SharedError, TaskResult, TaskState, ToCacheKey,
    TransportError,
};
