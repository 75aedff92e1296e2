//! Error types for cache operations.

use thiserror::Error;

use crate::format::FormatError;

/// Error type for cache operations.
///
/// Groups failures by where they happened so callers can decide whether a
/// failure is worth surfacing. Coordinators treat every variant as a cache
/// miss on reads.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Internal backend error, state or computation error.
    ///
    /// Any error not related to I/O with an external store.
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),

    /// Error talking to the durable store (filesystem, preference store).
    #[error(transparent)]
    Connection(Box<dyn std::error::Error + Send + Sync>),

    /// Serialization or deserialization error.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The operation is not supported in this configuration.
    #[error("`{0}` is not supported by this cache")]
    Unsupported(&'static str),
}

impl CacheError {
    /// Wraps an internal error.
    pub fn internal<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CacheError::Internal(Box::new(error))
    }

    /// Wraps a storage I/O error.
    pub fn connection<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CacheError::Connection(Box::new(error))
    }
}
