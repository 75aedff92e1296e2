//! Cursor pagination.
//!
//! A paginated endpoint takes options implementing [`CursorPaginated`] and
//! decodes each response into a [`PaginatedList`]. Coordinators inject the
//! previous list's [`next_cursor`](PaginatedList::next_cursor) into the
//! options of the following run and [`concatenate`](PaginatedList::concatenate)
//! the results, so "load more" needs no bookkeeping from the caller.

mod cursor;
mod list;
mod stream;

pub use cursor::{FetchLimit, OpaqueValue, PaginationCursor};
pub use list::{PaginatedList, PartialPage};
pub use stream::{collect_pages, page_stream};

use thiserror::Error;

/// Options of an endpoint that fetches one page at a time.
pub trait CursorPaginated {
    /// Cursor of the page to fetch, `None` for the first page.
    fn pagination_cursor(&self) -> Option<&PaginationCursor>;

    /// Points the options at another page.
    fn set_pagination_cursor(&mut self, cursor: Option<PaginationCursor>);

    /// How much to fetch.
    fn fetch_limit(&self) -> FetchLimit {
        FetchLimit::None
    }
}

/// Stock options for cursor-paginated endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PageOptions {
    /// Page to fetch.
    pub cursor: Option<PaginationCursor>,
    /// Requested page size, if the endpoint supports one.
    pub limit: Option<usize>,
}

impl CursorPaginated for PageOptions {
    fn pagination_cursor(&self) -> Option<&PaginationCursor> {
        self.cursor.as_ref()
    }

    fn set_pagination_cursor(&mut self, cursor: Option<PaginationCursor>) {
        self.cursor = cursor;
    }

    fn fetch_limit(&self) -> FetchLimit {
        match self.limit {
            Some(max) => FetchLimit::Max(max),
            None => FetchLimit::None,
        }
    }
}

/// Rejected list merges.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// The right-hand list does not start where the left-hand list ends.
    #[error("cursor mismatch: expected {expected}, found {found}")]
    CursorMismatch {
        /// The left-hand list's next cursor.
        expected: PaginationCursor,
        /// The right-hand list's current cursor.
        found: PaginationCursor,
    },
    /// The right-hand list has already archived pages of its own.
    #[error("list being appended has already consumed {0} cursor(s)")]
    AlreadyConsumed(usize),
    /// The left-hand list already holds its terminal page.
    #[error("list has no pages left to append to")]
    Exhausted,
}
