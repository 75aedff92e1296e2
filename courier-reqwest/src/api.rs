use courier_core::{ApiError, Interface};
use reqwest::Method;
use smol_str::SmolStr;
use url::Url;

use crate::{HttpError, HttpRequest};

/// An HTTP API rooted at a base URL.
///
/// Its identity is the base URL plus an optional account name, so switching
/// either makes attached resources refetch. Default headers are appended to
/// every request in [`prepare_request`](Interface::prepare_request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpApi {
    base_url: Url,
    account: Option<SmolStr>,
    headers: Vec<(SmolStr, String)>,
}

impl HttpApi {
    /// API rooted at `base_url`. Relative paths resolve against it, so it
    /// usually ends with `/`.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            account: None,
            headers: Vec::new(),
        }
    }

    /// Scopes the API to `account`.
    pub fn for_account(mut self, account: impl Into<SmolStr>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Sends `name: value` with every request.
    pub fn with_default_header(mut self, name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The account, if scoped.
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// Resolves `path` against the base URL.
    pub fn url(&self, path: &str) -> Result<Url, HttpError> {
        Ok(self.base_url.join(path)?)
    }

    /// A request to `path`.
    pub fn request(&self, method: Method, path: &str) -> Result<HttpRequest, HttpError> {
        Ok(HttpRequest::new(method, self.url(path)?))
    }

    /// A `GET` request to `path`.
    pub fn get(&self, path: &str) -> Result<HttpRequest, HttpError> {
        self.request(Method::GET, path)
    }
}

impl Interface for HttpApi {
    type Request = HttpRequest;
    type Error = ApiError<HttpError>;
    type Id = (Url, Option<SmolStr>);

    fn id(&self) -> Self::Id {
        (self.base_url.clone(), self.account.clone())
    }

    fn prepare_request(&self, request: &mut HttpRequest) {
        for (name, value) in &self.headers {
            if request.header(name).is_none() {
                request.headers.push((name.clone(), value.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> HttpApi {
        HttpApi::new(Url::parse("https://api.example.com/v1/").unwrap())
    }

    #[test]
    fn test_paths_resolve_against_base() {
        let request = api().get("users/7").unwrap();
        assert_eq!(request.url.as_str(), "https://api.example.com/v1/users/7");
    }

    #[test]
    fn test_identity_includes_account() {
        assert_ne!(api().id(), api().for_account("ada").id());
        assert_eq!(api().for_account("ada").id(), api().for_account("ada").id());
    }

    #[test]
    fn test_default_headers_do_not_override() {
        let api = api()
            .with_default_header("accept", "application/json")
            .with_default_header("x-client", "courier");
        let mut request = api.get("users").unwrap().with_header("Accept", "text/plain");

        api.prepare_request(&mut request);

        assert_eq!(request.header("accept"), Some("text/plain"));
        assert_eq!(request.header("x-client"), Some("courier"));
        assert_eq!(request.headers.len(), 2);
    }
}
