//! Cursor pagination over Coupa's id-ordered queries.
//!
//! Coupa returns records in ascending id order and filters with
//! `id[gt]=<cursor>`, so the cursor for the next page is simply the id of the
//! last record on the current one. There is no "has more" flag: a page that
//! comes back empty means the collection is exhausted, and the next cursor is
//! the empty string.
//!
//! If the server ever returns records out of id order, pages can overlap or
//! skip records. Nothing here can detect that.

use std::fmt;
use std::future::Future;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::{CoupaError, Result};

/// Opaque page marker. Empty means "first page" on input and "done" on output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cursor(String);

impl TryFrom<String> for Cursor {
    type Error = CoupaError;

    fn try_from(token: String) -> Result<Self> {
        Self::parse(&token)
    }
}

impl From<Cursor> for String {
    fn from(cursor: Cursor) -> Self {
        cursor.0
    }
}

impl Cursor {
    pub fn first_page() -> Self {
        Self::default()
    }

    /// Cursor continuing after the record with `id`.
    pub fn after(id: i64) -> Self {
        Self(id.to_string())
    }

    /// Accept a cursor handed back by a sync driver.
    ///
    /// Cursors are spliced into a remote filter expression, so anything other
    /// than an empty string or a decimal id is rejected.
    pub fn parse(token: &str) -> Result<Self> {
        if token.is_empty() || token.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(token.to_string()))
        } else {
            Err(CoupaError::InvalidArgument(format!(
                "invalid pagination token {token:?}"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_first_page(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of results and the cursor to request the next one with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Cursor,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: Cursor::first_page(),
        }
    }

    /// A page that is complete on its own (no further pages).
    pub fn single(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: Cursor::first_page(),
        }
    }

    /// Build a page whose next cursor follows the last id in server order.
    pub fn continuing(items: Vec<T>, last_id: Option<i64>) -> Self {
        Self {
            items,
            next_cursor: last_id.map(Cursor::after).unwrap_or_default(),
        }
    }

    /// True when no further request should be made.
    pub fn is_exhausted(&self) -> bool {
        self.next_cursor.is_first_page()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

/// Drive `fetch` from `start` until the collection is exhausted.
///
/// Empty pages are not yielded. The stream also ends if a page fails to move
/// the cursor forward, so a misbehaving server cannot make it loop.
pub fn stream_pages<T, F, Fut>(start: Cursor, mut fetch: F) -> impl Stream<Item = Result<Page<T>>>
where
    F: FnMut(Cursor) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    async_stream::try_stream! {
        let mut cursor = start;
        loop {
            let page = fetch(cursor.clone()).await?;
            if page.items.is_empty() {
                break;
            }
            let next = page.next_cursor.clone();
            let stalled = next == cursor;
            yield page;
            if next.is_first_page() || stalled {
                break;
            }
            cursor = next;
        }
    }
}
