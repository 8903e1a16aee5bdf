use futures::{Stream, TryStreamExt, stream};

use super::{Error, Result};

/// One page of a listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page_token: Option<String>) -> Self {
        Self {
            items,
            next_page_token,
        }
    }

    /// A page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Lazily walks a paginated listing and yields every item of every page.
///
/// `fetch` is called with `None` for the first page and with the previous
/// page's continuation token afterwards, until a page arrives without one (an
/// empty token counts as none). Nothing is fetched before the stream is polled,
/// and calling `paginate` again restarts the listing from the first page.
///
/// The first failing fetch ends the stream with that error.
pub fn paginate<'a, T, F, Fut>(fetch: F) -> impl Stream<Item = Result<T>> + Send + 'a
where
    T: Send + 'a,
    F: FnMut(Option<String>) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Page<T>>> + Send + 'a,
{
    stream::try_unfold((fetch, Cursor::Start), |(mut fetch, cursor)| async move {
        let token = match cursor {
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
            Cursor::Done => return Ok(None),
        };

        let page = fetch(token).await?;
        let cursor = match page.next_page_token {
            Some(token) if !token.is_empty() => Cursor::Next(token),
            _ => Cursor::Done,
        };
        let items = stream::iter(page.items.into_iter().map(Ok::<T, Error>));

        Ok::<_, Error>(Some((items, (fetch, cursor))))
    })
    .try_flatten()
}
