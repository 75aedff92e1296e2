//! API roots: identity, error type and request hook.

use std::fmt::Debug;

use crate::error::{ApiError, SharedError};
use crate::request::Request;

/// Request type of an interface.
pub type RequestOf<I> = <I as Interface>::Request;

/// Response type of an interface.
pub type ResponseOf<I> = <<I as Interface>::Request as Request>::Response;

/// Native request error of an interface.
pub type RequestErrorOf<I> = <<I as Interface>::Request as Request>::Error;

/// Conversion from the failure taxonomy into an interface's error type.
///
/// [`ApiError`] is the stock implementation; interfaces with their own
/// error enums implement this to receive bad-request and runtime failures.
pub trait InterfaceError<E>: std::error::Error + Clone + Send + Sync + Sized + 'static {
    /// The transport or protocol layer rejected the request.
    fn bad_request(error: E) -> Self;

    /// Any other failure.
    fn runtime(error: SharedError) -> Self;
}

impl<E> InterfaceError<E> for ApiError<E>
where
    E: std::error::Error + Clone + Send + Sync + 'static,
{
    fn bad_request(error: E) -> Self {
        ApiError::BadRequest(error)
    }

    fn runtime(error: SharedError) -> Self {
        ApiError::Runtime(error)
    }
}

/// The root of a remote API.
///
/// An interface names its request type, its error type and an identity.
/// Resources re-fetch when the identity of the interface bound to their
/// client changes (for example after switching accounts).
pub trait Interface: Send + Sync + 'static {
    /// Request type produced by this interface's endpoints.
    type Request: Request;

    /// Error type surfaced to callers.
    type Error: InterfaceError<<Self::Request as Request>::Error>;

    /// Identity used to detect that the interface was re-pointed.
    type Id: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Current identity.
    fn id(&self) -> Self::Id;

    /// Amends every built request before it reaches the cache or transport.
    fn prepare_request(&self, _request: &mut Self::Request) {}
}
