use serde::de::Deserializer;
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use super::{PaginationCursor, PaginationError};

/// One fetched page: its items and the cursor of the page after it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartialPage<Item> {
    /// Items on this page.
    pub items: Vec<Item>,
    /// Cursor for the next page, `None` on the terminal page.
    pub next_cursor: Option<PaginationCursor>,
}

impl<Item> PartialPage<Item> {
    /// Creates a page.
    pub fn new(items: Vec<Item>, next_cursor: Option<PaginationCursor>) -> Self {
        Self { items, next_cursor }
    }

    /// Maps every item, keeping the cursor.
    pub fn map<T, F: FnMut(Item) -> T>(self, f: F) -> PartialPage<T> {
        PartialPage {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

/// A list accumulated from cursor-paginated responses.
///
/// The most recent page is the `head`; earlier pages are archived in the
/// `tail` together with the cursor that fetched them, in fetch order. A
/// cursor may appear more than once in the tail; every archived page is
/// kept. The
/// flattened [`all`](Self::all) view is always the tail pages in order
/// followed by the head, so earlier pages can be re-derived without
/// fetching them again.
///
/// ```
/// use courier_core::{PaginatedList, PaginationCursor, PartialPage};
///
/// let mut list = PaginatedList::new();
/// list.coalesce(PartialPage::new(vec!["a", "b"], Some(PaginationCursor::Offset(2))));
/// list.coalesce(PartialPage::new(vec!["c", "d"], None));
///
/// assert_eq!(list.all(), &["a", "b", "c", "d"]);
/// assert!(list.is_terminal());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedList<Item> {
    cursors_consumed: Vec<Option<PaginationCursor>>,
    tail: Vec<(Option<PaginationCursor>, Vec<Item>)>,
    head: Option<Vec<Item>>,
    current_cursor: Option<PaginationCursor>,
    next_cursor: Option<PaginationCursor>,
    all: Vec<Item>,
}

impl<Item> Default for PaginatedList<Item> {
    fn default() -> Self {
        Self {
            cursors_consumed: Vec::new(),
            tail: Vec::new(),
            head: None,
            current_cursor: None,
            next_cursor: None,
            all: Vec::new(),
        }
    }
}

impl<Item> PaginatedList<Item> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty list whose first coalesced page was fetched with `cursor`.
    ///
    /// Decoders of follow-up pages use this so the resulting list can be
    /// concatenated onto the list that produced `cursor`.
    pub fn starting_at(cursor: Option<PaginationCursor>) -> Self {
        Self {
            next_cursor: cursor,
            ..Self::default()
        }
    }

    /// Creates a list holding a single page.
    pub fn from_page(page: PartialPage<Item>) -> Self
    where
        Item: Clone,
    {
        let mut list = Self::new();
        list.coalesce(page);
        list
    }

    /// Every item from every page, in fetch order.
    pub fn all(&self) -> &[Item] {
        &self.all
    }

    /// Items of the most recently fetched page.
    pub fn head(&self) -> Option<&[Item]> {
        self.head.as_deref()
    }

    /// Cursors already resolved into archived pages, in order.
    pub fn cursors_consumed(&self) -> &[Option<PaginationCursor>] {
        &self.cursors_consumed
    }

    /// Cursor used to fetch the head page.
    pub fn current_cursor(&self) -> Option<&PaginationCursor> {
        self.current_cursor.as_ref()
    }

    /// Cursor of the page after the head, `None` when terminal.
    pub fn next_cursor(&self) -> Option<&PaginationCursor> {
        self.next_cursor.as_ref()
    }

    /// Overrides the next cursor.
    pub fn set_next_cursor(&mut self, cursor: Option<PaginationCursor>) {
        self.next_cursor = cursor;
    }

    /// Whether the last page has been fetched.
    ///
    /// An empty list is not terminal until a page arrives.
    pub fn is_terminal(&self) -> bool {
        self.head.is_some() && self.next_cursor.is_none()
    }

    /// Number of items across all pages.
    pub fn len(&self) -> usize {
        self.all.len()
    }

    /// Whether no items were fetched.
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Items most recently fetched with `cursor`, from the head or the tail.
    pub fn page(&self, cursor: Option<&PaginationCursor>) -> Option<&[Item]> {
        if self.head.is_some() && self.current_cursor.as_ref() == cursor {
            return self.head.as_deref();
        }
        self.tail
            .iter()
            .rev()
            .find(|(fetched_with, _)| fetched_with.as_ref() == cursor)
            .map(|(_, items)| items.as_slice())
    }

    /// Every page in fetch order, paired with the cursor that fetched it.
    pub fn pages(&self) -> impl Iterator<Item = (Option<&PaginationCursor>, &[Item])> {
        self.tail
            .iter()
            .map(|(cursor, items)| (cursor.as_ref(), items.as_slice()))
            .chain(
                self.head
                    .as_deref()
                    .map(|items| (self.current_cursor.as_ref(), items)),
            )
    }

    /// Iterates over every item.
    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.all.iter()
    }

    fn archive_head(&mut self) {
        if let Some(head) = self.head.take() {
            self.cursors_consumed.push(self.current_cursor.clone());
            self.tail.push((self.current_cursor.clone(), head));
        }
    }
}

impl<Item: Clone> PaginatedList<Item> {
    /// Appends one fetched page.
    ///
    /// The previous head is archived under the cursor that fetched it, the
    /// current cursor advances to the previous next cursor and the next
    /// cursor is taken from `page`.
    pub fn coalesce(&mut self, page: PartialPage<Item>) {
        self.all.extend(page.items.iter().cloned());
        self.archive_head();
        self.head = Some(page.items);
        self.current_cursor = self.next_cursor.take();
        self.next_cursor = page.next_cursor;
    }

    /// Merges an independently fetched list onto the end of this one.
    ///
    /// `self` must not be terminal and `other` must not have consumed any
    /// cursors. When both sides name a cursor, `self.next_cursor` must equal
    /// `other.current_cursor`. On error `self` is left unchanged.
    pub fn concatenate(&mut self, other: PaginatedList<Item>) -> Result<(), PaginationError> {
        if self.is_terminal() {
            return Err(PaginationError::Exhausted);
        }
        if !other.cursors_consumed.is_empty() {
            return Err(PaginationError::AlreadyConsumed(other.cursors_consumed.len()));
        }
        if let (Some(expected), Some(found)) = (&self.next_cursor, &other.current_cursor)
            && expected != found
        {
            return Err(PaginationError::CursorMismatch {
                expected: expected.clone(),
                found: found.clone(),
            });
        }

        self.all.extend(other.all);
        self.archive_head();
        self.head = other.head;
        self.current_cursor = other.current_cursor.or_else(|| self.next_cursor.take());
        self.next_cursor = other.next_cursor;
        Ok(())
    }
}

impl<Item: Clone> FromIterator<Item> for PaginatedList<Item> {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Self::from_page(PartialPage::new(iter.into_iter().collect(), None))
    }
}

impl<'a, Item> IntoIterator for &'a PaginatedList<Item> {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.all.iter()
    }
}

impl<Item: Serialize> Serialize for PaginatedList<Item> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PaginatedList", 5)?;
        state.serialize_field("cursors_consumed", &self.cursors_consumed)?;
        state.serialize_field("tail", &self.tail)?;
        state.serialize_field("head", &self.head)?;
        state.serialize_field("current_cursor", &self.current_cursor)?;
        state.serialize_field("next_cursor", &self.next_cursor)?;
        state.end()
    }
}

#[derive(Deserialize)]
struct ListRepr<Item> {
    cursors_consumed: Vec<Option<PaginationCursor>>,
    tail: Vec<(Option<PaginationCursor>, Vec<Item>)>,
    head: Option<Vec<Item>>,
    current_cursor: Option<PaginationCursor>,
    next_cursor: Option<PaginationCursor>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListWire<Item> {
    List(ListRepr<Item>),
    Items(Vec<Item>),
}

/// Accepts the full list form or, as a fallback, a plain array of items.
impl<'de, Item> Deserialize<'de> for PaginatedList<Item>
where
    Item: Deserialize<'de> + Clone,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ListWire::deserialize(deserializer)? {
            ListWire::List(repr) => {
                let tail = repr.tail;
                let all = tail
                    .iter()
                    .flat_map(|(_, items)| items)
                    .chain(repr.head.iter().flatten())
                    .cloned()
                    .collect();
                Ok(Self {
                    cursors_consumed: repr.cursors_consumed,
                    tail,
                    head: repr.head,
                    current_cursor: repr.current_cursor,
                    next_cursor: repr.next_cursor,
                    all,
                })
            }
            ListWire::Items(items) => Ok(items.into_iter().collect()),
        }
    }
}
