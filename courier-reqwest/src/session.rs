use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{AuthorizationCredential, Outstanding, Session, TransportError};
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::{HttpError, HttpRequest, HttpResponse};

/// A [`Session`] that sends [`HttpRequest`]s with a [`reqwest::Client`].
///
/// Dropping an in-flight `execute` future aborts the underlying request.
pub struct ReqwestSession {
    client: reqwest::Client,
    credentials: Vec<Arc<dyn AuthorizationCredential>>,
    error_for_status: bool,
    outstanding: Outstanding,
}

impl fmt::Debug for ReqwestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestSession")
            .field("credentials", &self.credentials)
            .field("error_for_status", &self.error_for_status)
            .field("outstanding", &self.outstanding.len())
            .finish()
    }
}

impl Default for ReqwestSession {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ReqwestSession {
    /// A session with a default client and no credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder.
    pub fn builder() -> ReqwestSessionBuilder {
        ReqwestSessionBuilder {
            client: None,
            credentials: Vec::new(),
            error_for_status: true,
        }
    }

    fn prepare(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        for credential in self
            .credentials
            .iter()
            .filter(|credential| credential.applies_to(&request.url))
        {
            trace!(header = credential.header_name(), "attaching credential");
            builder = builder.header(credential.header_name(), credential.header_value());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        builder
    }
}

#[async_trait]
impl Session for ReqwestSession {
    type Request = HttpRequest;

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError<HttpError>> {
        let method = request.method.clone();
        let url = request.url.clone();
        debug!(%method, %url, "sending request");

        let response = self
            .prepare(request)
            .send()
            .await
            .map_err(|error| TransportError::Request(HttpError::from(error)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (SmolStr::new(name.as_str()), value.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|error| TransportError::Request(HttpError::from(error)))?;
        debug!(%method, %url, status, bytes = body.len(), "response received");

        let response = HttpResponse {
            status,
            headers,
            body,
        };
        if self.error_for_status && !response.is_success() {
            return Err(TransportError::Request(HttpError::Status {
                status,
                body: response.body,
            }));
        }
        Ok(response)
    }

    fn outstanding(&self) -> &Outstanding {
        &self.outstanding
    }
}

/// Builder for [`ReqwestSession`].
pub struct ReqwestSessionBuilder {
    client: Option<reqwest::Client>,
    credentials: Vec<Arc<dyn AuthorizationCredential>>,
    error_for_status: bool,
}

impl ReqwestSessionBuilder {
    /// Sends requests with `client` instead of a default one.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Attaches `credential` to every request it applies to.
    pub fn credential<C: AuthorizationCredential>(mut self, credential: C) -> Self {
        self.credentials.push(Arc::new(credential));
        self
    }

    /// Whether non-success statuses fail the request. Default: `true`.
    pub fn error_for_status(mut self, enabled: bool) -> Self {
        self.error_for_status = enabled;
        self
    }

    /// Creates the session.
    pub fn build(self) -> ReqwestSession {
        ReqwestSession {
            client: self.client.unwrap_or_default(),
            credentials: self.credentials,
            error_for_status: self.error_for_status,
            outstanding: Outstanding::new(),
        }
    }
}
