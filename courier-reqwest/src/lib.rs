#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod api;
mod error;
mod message;
mod session;

pub use api::HttpApi;
pub use error::HttpError;
pub use message::{HttpRequest, HttpResponse};
pub use session::{ReqwestSession, ReqwestSessionBuilder};

/// Re-export of the HTTP method type used by [`HttpRequest`].
pub use reqwest::Method;
