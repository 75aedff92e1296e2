use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while reading a configuration or building caches from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid YAML or does not match the schema.
    #[error("invalid configuration: {0}")]
    Parse(String),

    /// The backend was compiled out; enable the named cargo feature.
    #[error("backend not available: {0}")]
    BackendNotAvailable(String),

    /// The backend is available but could not be opened.
    #[error("failed to open {backend} cache: {source}")]
    Open {
        /// Backend type name as written in the configuration.
        backend: &'static str,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },
}

impl ConfigError {
    #[allow(dead_code)]
    pub(crate) fn open(backend: &'static str, source: impl Into<BoxError>) -> Self {
        ConfigError::Open {
            backend,
            source: source.into(),
        }
    }
}
