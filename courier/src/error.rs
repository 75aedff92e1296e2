use thiserror::Error;

use courier_core::SharedError;

/// Failures of a resource or coordinator that happen before, or instead of,
/// a transport call.
///
/// These always reach callers wrapped as the interface's runtime error.
#[derive(Debug, Clone, Error)]
pub enum ResourceError {
    /// A value was required but none has been fetched.
    #[error("resource value has not been fetched")]
    NotFetched,

    /// A declared dependency does not hold a value yet.
    #[error("dependency `{0}` is not resolved")]
    DependencyNotResolved(String),

    /// The endpoint or its input could not be resolved from the client.
    #[error("endpoint resolution failed: {0}")]
    EndpointResolution(SharedError),

    /// The client this resource was attached to has been dropped.
    #[error("client was released")]
    ClientReleased,
}
