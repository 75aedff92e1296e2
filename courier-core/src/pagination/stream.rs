use std::future::Future;

use futures::stream::{self, Stream, TryStreamExt};

use super::{PaginatedList, PaginationCursor, PartialPage};

/// Streams pages by following `next_cursor` until the terminal page.
///
/// `fetch` is called with `start` first and then with each page's next
/// cursor. The stream ends after the first page without a next cursor, or
/// after the first error.
///
/// ```
/// # tokio_test_block(async {
/// use courier_core::pagination::{page_stream, PaginationCursor, PartialPage};
/// use futures::TryStreamExt;
///
/// let pages = page_stream(None, |cursor| async move {
///     let offset = cursor.and_then(|c| c.offset_value()).unwrap_or(0);
///     let next = (offset < 4).then(|| PaginationCursor::Offset(offset + 2));
///     Ok::<_, std::io::Error>(PartialPage::new(vec![offset, offset + 1], next))
/// });
/// let pages: Vec<_> = pages.try_collect().await.unwrap();
/// assert_eq!(pages.len(), 3);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
/// # }
/// ```
pub fn page_stream<Item, E, F, Fut>(
    start: Option<PaginationCursor>,
    fetch: F,
) -> impl Stream<Item = Result<PartialPage<Item>, E>>
where
    F: FnMut(Option<PaginationCursor>) -> Fut,
    Fut: Future<Output = Result<PartialPage<Item>, E>>,
{
    stream::unfold(
        (Some(start), fetch),
        |(cursor, mut fetch)| async move {
            let cursor = cursor?;
            match fetch(cursor).await {
                Ok(page) => {
                    let next = page.next_cursor.clone().map(Some);
                    Some((Ok(page), (next, fetch)))
                }
                Err(error) => Some((Err(error), (None, fetch))),
            }
        },
    )
}

/// Drains [`page_stream`] into a single coalesced list.
pub async fn collect_pages<Item, E, F, Fut>(
    start: Option<PaginationCursor>,
    fetch: F,
) -> Result<PaginatedList<Item>, E>
where
    Item: Clone,
    F: FnMut(Option<PaginationCursor>) -> Fut,
    Fut: Future<Output = Result<PartialPage<Item>, E>>,
{
    page_stream(start.clone(), fetch)
        .try_fold(PaginatedList::starting_at(start), |mut list, page| async move {
            list.coalesce(page);
            Ok(list)
        })
        .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::StreamExt;

    use super::*;

    #[derive(Debug, PartialEq)]
    struct Boom;

    fn numbers(cursor: Option<PaginationCursor>) -> PartialPage<i64> {
        let offset = cursor.and_then(|c| c.offset_value()).unwrap_or(0);
        let next = (offset + 2 < 6).then(|| PaginationCursor::Offset(offset + 2));
        PartialPage::new(vec![offset, offset + 1], next)
    }

    #[tokio::test]
    async fn test_stream_stops_at_terminal_page() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let pages: Vec<_> = page_stream(None, move |cursor| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, Boom>(numbers(cursor)) }
        })
        .collect()
        .await;

        assert_eq!(pages.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stream_ends_after_error() {
        let pages: Vec<Result<PartialPage<i64>, Boom>> = page_stream(None, |cursor| async move {
            match cursor {
                None => Ok(numbers(None)),
                Some(_) => Err(Boom),
            }
        })
        .collect()
        .await;

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1], Err(Boom));
    }

    #[tokio::test]
    async fn test_collect_pages_coalesces() {
        let list = collect_pages(None, |cursor| async move { Ok::<_, Boom>(numbers(cursor)) })
            .await
            .unwrap();

        assert_eq!(list.all(), &[0, 1, 2, 3, 4, 5]);
        assert!(list.is_terminal());
        assert_eq!(list.pages().count(), 3);
        assert_eq!(list.current_cursor(), Some(&PaginationCursor::Offset(4)));
    }
}
