use thiserror::Error;

/// Errors that can occur when opening or using a [`DiskCache`](crate::DiskCache).
#[derive(Debug, Error)]
pub enum DiskCacheError {
    /// An I/O error occurred while accessing the cache directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The provided configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
