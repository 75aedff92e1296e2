use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// An opaque pagination position.
///
/// Cursors are a closed set of representations. Equality and ordering are
/// only meaningful within one representation: an offset never equals a page
/// number, and only offsets and page numbers are ordered.
///
/// The wire form is a tagged `{type, value}` pair:
///
/// ```
/// use courier_core::PaginationCursor;
///
/// let cursor = PaginationCursor::Offset(40);
/// let json = serde_json::to_string(&cursor).unwrap();
/// assert_eq!(json, r#"{"type":"offset","value":40}"#);
///
/// let decoded: PaginationCursor = serde_json::from_str(r#"{"type":"pageNumber","value":3}"#).unwrap();
/// assert_eq!(decoded, PaginationCursor::PageNumber(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum PaginationCursor {
    /// Raw bytes.
    Data(Bytes),
    /// Opaque string token.
    String(String),
    /// Item offset.
    Offset(i64),
    /// Page number.
    PageNumber(i64),
    /// Provider-specific archived token.
    ProviderToken(Bytes),
    /// Next-page URL.
    Url(Url),
    /// Arbitrary structured value.
    OpaqueValue(OpaqueValue),
}

impl PaginationCursor {
    /// Returns the offset, if this is an offset cursor.
    pub fn offset_value(&self) -> Option<i64> {
        match self {
            PaginationCursor::Offset(offset) => Some(*offset),
            _ => None,
        }
    }

    /// Returns the page number, if this is a page-number cursor.
    pub fn page_number(&self) -> Option<i64> {
        match self {
            PaginationCursor::PageNumber(page) => Some(*page),
            _ => None,
        }
    }

    /// Returns the token, if this is a string cursor.
    pub fn string_value(&self) -> Option<&str> {
        match self {
            PaginationCursor::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the URL, if this is a URL cursor.
    pub fn url_value(&self) -> Option<&Url> {
        match self {
            PaginationCursor::Url(url) => Some(url),
            _ => None,
        }
    }
}

impl PartialOrd for PaginationCursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (PaginationCursor::Offset(lhs), PaginationCursor::Offset(rhs)) => lhs.partial_cmp(rhs),
            (PaginationCursor::PageNumber(lhs), PaginationCursor::PageNumber(rhs)) => {
                lhs.partial_cmp(rhs)
            }
            (lhs, rhs) if lhs == rhs => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for PaginationCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaginationCursor::Data(data) => write!(f, "data({} bytes)", data.len()),
            PaginationCursor::String(value) => write!(f, "{value}"),
            PaginationCursor::Offset(offset) => write!(f, "offset {offset}"),
            PaginationCursor::PageNumber(page) => write!(f, "page {page}"),
            PaginationCursor::ProviderToken(token) => write!(f, "token({} bytes)", token.len()),
            PaginationCursor::Url(url) => write!(f, "{url}"),
            PaginationCursor::OpaqueValue(value) => write!(f, "{}", value.0),
        }
    }
}

/// Structured cursor payload.
///
/// Object keys are hashed in sorted order so that values equal under
/// `serde_json` equality hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpaqueValue(pub serde_json::Value);

impl Hash for OpaqueValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state);
    }
}

fn hash_value<H: Hasher>(value: &serde_json::Value, state: &mut H) {
    use serde_json::Value;

    std::mem::discriminant(value).hash(state);
    match value {
        Value::Null => {}
        Value::Bool(flag) => flag.hash(state),
        Value::Number(number) => number.to_string().hash(state),
        Value::String(text) => text.hash(state),
        Value::Array(items) => {
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs));
            entries.len().hash(state);
            for (key, item) in entries {
                key.hash(state);
                hash_value(item, state);
            }
        }
    }
}

impl From<serde_json::Value> for OpaqueValue {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// How much a paginated request should fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum FetchLimit {
    /// Fetch up to the given cursor.
    Cursor(PaginationCursor),
    /// Fetch at most this many items.
    Max(usize),
    /// No limit.
    None,
}
