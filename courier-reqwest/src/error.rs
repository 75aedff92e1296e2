use std::sync::Arc;

use bytes::Bytes;
use smol_str::SmolStr;
use thiserror::Error;

/// Failures of the HTTP transport and of reading responses.
///
/// Cloneable so it can travel inside published results; wrapped library
/// errors are reference counted.
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    /// The server answered with a non-success status.
    #[error("HTTP status {status}")]
    Status {
        /// Status code.
        status: u16,
        /// Response body.
        body: Bytes,
    },

    /// The request could not be sent or the response not received.
    #[error("transport error: {0}")]
    Transport(Arc<reqwest::Error>),

    /// A URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A header name or value was rejected.
    #[error("invalid header `{0}`")]
    InvalidHeader(SmolStr),

    /// The body is not valid UTF-8.
    #[error("response body is not valid UTF-8")]
    Utf8,

    /// The body is not the expected JSON.
    #[error("JSON error: {0}")]
    Json(Arc<serde_json::Error>),
}

impl HttpError {
    /// The status code, for [`HttpError::Status`].
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(error: reqwest::Error) -> Self {
        HttpError::Transport(Arc::new(error))
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(error: serde_json::Error) -> Self {
        HttpError::Json(Arc::new(error))
    }
}
