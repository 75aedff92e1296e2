use courier_backend::CacheError;
use courier_backend::format::FormatError;
use thiserror::Error;

/// Errors raised by preference stores.
#[derive(Debug, Error)]
pub enum PreferenceError {
    /// An I/O error occurred while reading or writing a domain.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted domain could not be encoded or decoded.
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// The domain name cannot be used as a storage location.
    #[error("Invalid domain name: {0:?}")]
    InvalidDomain(String),
}

impl From<PreferenceError> for CacheError {
    fn from(error: PreferenceError) -> Self {
        match error {
            PreferenceError::Format(error) => CacheError::Format(error),
            error => CacheError::connection(error),
        }
    }
}
