#![warn(missing_docs)]
//! # courier-core
//!
//! Core traits and types for the courier typed API client framework.
//!
//! This crate defines the contracts every other courier crate builds on.
//! It has no opinion about the wire protocol: transports, caches and the
//! fetch coordinator live in sibling crates and only meet here.
//!
//! ## Architecture
//!
//! - [`Request`] pairs a hashable request value with its response and error types
//! - [`Interface`] is the root of an API: identity, error type, request hook
//! - [`Endpoint`] turns an input into a request and a response into an output
//! - [`Session`] executes requests, exposing [`Outstanding`] work for bulk cancellation
//! - [`pagination`] holds cursors and the coalescing [`PaginatedList`]
//! - [`TaskResult`] is the terminal snapshot published for every fetch
//!
//! ```
//! use courier_core::{CacheKey, KeyPart};
//!
//! let key = CacheKey::new("users", 1, vec![KeyPart::new("id", Some("42"))]);
//! assert_eq!(key.to_string(), "users:v1:id=42");
//! ```

pub mod credential;
pub mod endpoint;
pub mod error;
pub mod interface;
pub mod key;
pub mod pagination;
pub mod request;
pub mod session;
pub mod task;

pub use credential::{ApiKey, AuthorizationCredential};
pub use endpoint::{
    BoxEndpoint, BuildContext, DecodeContext, Endpoint, EndpointExt, FnEndpoint, MapOutput,
    MapRequest, NeverEndpoint,
};
pub use error::{ApiError, BoxError, EndpointError, SharedError, shared};
pub use interface::{Interface, InterfaceError, RequestErrorOf, RequestOf, ResponseOf};
pub use key::{CacheKey, KeyPart, ToCacheKey};
pub use pagination::{
    CursorPaginated, FetchLimit, OpaqueValue, PageOptions, PaginatedList, PaginationCursor,
    PaginationError, PartialPage,
};
pub use request::Request;
pub use session::{Outstanding, Session, TransportError, WorkId};
pub use task::{TaskResult, TaskState};

/// Raw byte data type used for serialized cache values.
/// Using `Bytes` provides efficient zero-copy cloning via reference counting.
pub type Raw = bytes::Bytes;
