#![doc = include_str!("../README.md")]

pub mod cache;
pub mod fixtures;
pub mod session;
pub mod tracing;

pub use cache::{CacheCounters, CountingCache};
pub use fixtures::{Constant, LibraryApi, LibraryError, Lookup, Profile, Shelf, SHELF_PAGE};
pub use session::{MockError, MockRequest, MockSession, SessionCounters};
pub use tracing::{CapturedSpan, SpanCollector, create_span_collector};
