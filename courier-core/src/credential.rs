//! Opaque credentials attached to outgoing requests.

use std::fmt;

use smol_str::SmolStr;
use url::Url;

/// A value a transport can attach to a request to authorize it.
///
/// Credentials are opaque: the framework never inspects the token, it only
/// decides whether the credential applies to a destination.
pub trait AuthorizationCredential: fmt::Debug + Send + Sync + 'static {
    /// Header carrying the credential.
    fn header_name(&self) -> &str {
        "authorization"
    }

    /// Header value.
    fn header_value(&self) -> String;

    /// Server the credential was issued for, if it is restricted to one.
    fn server_url(&self) -> Option<&Url> {
        None
    }

    /// Whether the credential should be sent to `url`.
    ///
    /// Restricted credentials only apply to the same origin.
    fn applies_to(&self, url: &Url) -> bool {
        match self.server_url() {
            Some(server) => server.origin() == url.origin(),
            None => true,
        }
    }
}

/// A static API key.
///
/// ```
/// use courier_core::{ApiKey, AuthorizationCredential};
/// use url::Url;
///
/// let key = ApiKey::new("s3cr3t").for_server(Url::parse("https://api.example.com").unwrap());
/// assert!(key.applies_to(&Url::parse("https://api.example.com/v1/users").unwrap()));
/// assert!(!key.applies_to(&Url::parse("https://evil.example.com/").unwrap()));
/// assert!(!format!("{key:?}").contains("s3cr3t"));
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ApiKey {
    /// Server the key belongs to.
    pub server_url: Option<Url>,
    /// The key itself.
    pub value: String,
    header: SmolStr,
}

impl ApiKey {
    /// Creates an unrestricted key sent as `x-api-key`.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            server_url: None,
            value: value.into(),
            header: SmolStr::new_static("x-api-key"),
        }
    }

    /// Restricts the key to `server_url`.
    pub fn for_server(mut self, server_url: Url) -> Self {
        self.server_url = Some(server_url);
        self
    }

    /// Sends the key in another header.
    pub fn with_header(mut self, header: impl Into<SmolStr>) -> Self {
        self.header = header.into();
        self
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("server_url", &self.server_url.as_ref().map(Url::as_str))
            .field("value", &"<redacted>")
            .field("header", &self.header)
            .finish()
    }
}

impl AuthorizationCredential for ApiKey {
    fn header_name(&self) -> &str {
        &self.header
    }

    fn header_value(&self) -> String {
        self.value.clone()
    }

    fn server_url(&self) -> Option<&Url> {
        self.server_url.as_ref()
    }
}
