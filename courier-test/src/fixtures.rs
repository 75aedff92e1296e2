//! A small library API used across the integration tests.
//!
//! | Endpoint | Path | Output |
//! |---|---|---|
//! | [`Constant`] | `/constant` | the number in the body |
//! | [`Lookup`] | `/entries/{key}` | the string in the body |
//! | [`Shelf`] | `/shelf?page=N` | a page of titles, [`SHELF_PAGE`] per page |
//! | [`Profile`] | `/profile` | requires a signed-in user |

use courier_core::{
    ApiError, BoxError, BuildContext, DecodeContext, Endpoint, EndpointError, Interface,
    PageOptions, PaginatedList, PaginationCursor, PartialPage,
};
use serde_json::Value;

use crate::session::{MockError, MockRequest, MockSession};

pub type LibraryError = ApiError<MockError>;

/// Titles per shelf page.
pub const SHELF_PAGE: usize = 2;

/// The library, optionally signed in as `user`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryApi {
    pub user: Option<String>,
}

impl LibraryApi {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user: &str) -> Self {
        Self {
            user: Some(user.to_string()),
        }
    }
}

impl Interface for LibraryApi {
    type Request = MockRequest;
    type Error = LibraryError;
    type Id = Option<String>;

    fn id(&self) -> Option<String> {
        self.user.clone()
    }

    fn prepare_request(&self, request: &mut MockRequest) {
        request.user = self.user.clone();
    }
}

fn unexpected(what: &str, body: &Value) -> BoxError {
    EndpointError::UnexpectedResponse(format!("expected {what}, got {body}")).into()
}

/// `GET /constant`, decoded as a number.
#[derive(Debug, Clone, Copy)]
pub struct Constant;

impl Endpoint for Constant {
    type Root = LibraryApi;
    type Input = ();
    type Output = i32;
    type Options = ();

    fn build(&self, _input: &(), _context: BuildContext<'_, LibraryApi, ()>) -> Result<MockRequest, BoxError> {
        Ok(MockRequest::get("/constant"))
    }

    fn decode(
        &self,
        response: Value,
        _context: DecodeContext<'_, LibraryApi, (), ()>,
    ) -> Result<i32, BoxError> {
        response
            .as_i64()
            .and_then(|value| i32::try_from(value).ok())
            .ok_or_else(|| unexpected("a 32-bit number", &response))
    }
}

/// `GET /entries/{key}`, decoded as a string.
#[derive(Debug, Clone, Copy)]
pub struct Lookup;

impl Endpoint for Lookup {
    type Root = LibraryApi;
    type Input = String;
    type Output = String;
    type Options = ();

    fn build(&self, key: &String, _context: BuildContext<'_, LibraryApi, ()>) -> Result<MockRequest, BoxError> {
        Ok(MockRequest::get(format!("/entries/{key}")))
    }

    fn decode(
        &self,
        response: Value,
        _context: DecodeContext<'_, LibraryApi, String, ()>,
    ) -> Result<String, BoxError> {
        response
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| unexpected("a string", &response))
    }
}

/// `GET /shelf?page=N`, one page of titles at a time.
///
/// The body is `{"titles": [..], "next": N}`; a missing or null `next`
/// ends the listing.
#[derive(Debug, Clone, Copy)]
pub struct Shelf;

impl Endpoint for Shelf {
    type Root = LibraryApi;
    type Input = ();
    type Output = PaginatedList<String>;
    type Options = PageOptions;

    fn build(
        &self,
        _input: &(),
        context: BuildContext<'_, LibraryApi, PageOptions>,
    ) -> Result<MockRequest, BoxError> {
        let page = context
            .options
            .cursor
            .as_ref()
            .and_then(PaginationCursor::page_number)
            .unwrap_or(1);
        Ok(MockRequest::get("/shelf").with_query("page", page))
    }

    fn decode(
        &self,
        response: Value,
        context: DecodeContext<'_, LibraryApi, (), PageOptions>,
    ) -> Result<PaginatedList<String>, BoxError> {
        let titles = response
            .get("titles")
            .and_then(Value::as_array)
            .ok_or_else(|| unexpected("a titles array", &response))?
            .iter()
            .filter_map(|title| title.as_str().map(str::to_string))
            .collect();
        let next = response
            .get("next")
            .and_then(Value::as_i64)
            .map(PaginationCursor::PageNumber);

        let mut list = PaginatedList::starting_at(context.options.cursor.clone());
        list.coalesce(PartialPage::new(titles, next));
        Ok(list)
    }
}

/// `GET /profile`; cannot be built anonymously.
#[derive(Debug, Clone, Copy)]
pub struct Profile;

impl Endpoint for Profile {
    type Root = LibraryApi;
    type Input = ();
    type Output = String;
    type Options = ();

    fn build(&self, _input: &(), context: BuildContext<'_, LibraryApi, ()>) -> Result<MockRequest, BoxError> {
        if context.root.user.is_none() {
            return Err(EndpointError::Unavailable("profile requires a signed-in user").into());
        }
        Ok(MockRequest::get("/profile"))
    }

    fn decode(
        &self,
        response: Value,
        context: DecodeContext<'_, LibraryApi, (), ()>,
    ) -> Result<String, BoxError> {
        let name = response
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| unexpected("a profile", &response))?;
        Ok(format!("{name} ({})", context.request.user.as_deref().unwrap_or("?")))
    }
}

impl MockSession {
    /// Serves `titles` from `/shelf`, [`SHELF_PAGE`] per page.
    pub fn shelf(&self, titles: Vec<&'static str>) -> &Self {
        self.route_with("/shelf", move |request| {
            let page = request
                .query("page")
                .and_then(|page| page.parse::<usize>().ok())
                .unwrap_or(1);
            let start = (page - 1) * SHELF_PAGE;
            let slice: Vec<_> = titles.iter().skip(start).take(SHELF_PAGE).collect();
            let next = (start + SHELF_PAGE < titles.len()).then_some(page + 1);
            Ok(serde_json::json!({ "titles": slice, "next": next }))
        })
    }
}
