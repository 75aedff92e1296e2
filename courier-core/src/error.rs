//! Error taxonomy shared by endpoints, coordinators and resources.

use std::sync::Arc;

use thiserror::Error;

/// Boxed error returned by endpoint build/decode steps.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Reference-counted error that can be cloned into published results.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Wraps any error into a [`SharedError`].
pub fn shared<E>(error: E) -> SharedError
where
    E: std::error::Error + Send + Sync + 'static,
{
    Arc::new(error)
}

/// Stock error type for an [`Interface`](crate::Interface).
///
/// `Canceled` is intentionally absent: cancellation is a terminal status
/// carried by [`TaskResult`](crate::TaskResult), not a failure.
#[derive(Debug, Clone, Error)]
pub enum ApiError<E> {
    /// The transport rejected or failed to satisfy the request.
    #[error("bad request: {0}")]
    BadRequest(E),
    /// Anything else: decode failures, cache failures, unmet dependencies, misuse.
    #[error(transparent)]
    Runtime(SharedError),
}

impl<E> ApiError<E> {
    /// Returns the native request error, if this is a bad request.
    pub fn as_bad_request(&self) -> Option<&E> {
        match self {
            ApiError::BadRequest(error) => Some(error),
            ApiError::Runtime(_) => None,
        }
    }

    /// Returns `true` for [`ApiError::Runtime`].
    pub fn is_runtime(&self) -> bool {
        matches!(self, ApiError::Runtime(_))
    }
}

/// Failures raised by endpoints themselves.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The endpoint cannot be called at all.
    #[error("endpoint `{0}` is unavailable")]
    Unavailable(&'static str),
    /// The response did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    /// A required option was missing when building the request.
    #[error("missing option `{0}`")]
    MissingOption(&'static str),
}
