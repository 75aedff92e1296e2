//! The request/response contract.

use std::fmt::Debug;
use std::hash::Hash;

/// A value identifying one remote call.
///
/// Equality and hashing define the cache key domain: two requests that
/// compare equal are served by the same cached response.
///
/// # Examples
///
/// ```
/// use courier_core::Request;
///
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// struct GetUser(u64);
///
/// #[derive(Debug, Clone, thiserror::Error)]
/// #[error("user lookup failed")]
/// struct LookupError;
///
/// impl Request for GetUser {
///     type Response = String;
///     type Error = LookupError;
/// }
/// ```
pub trait Request: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// The response produced by the transport for this request.
    type Response: Clone + Send + Sync + 'static;

    /// The native error kind the transport reports for this request.
    type Error: std::error::Error + Clone + Send + Sync + 'static;
}
