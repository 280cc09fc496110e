//! Cursor-paginated list that only ever grows at the end.

use std::future::Future;
use std::ops::Range;

use shosai_api::traits::{Chapter, ReaderService};

/// Where the next page starts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cursor {
    /// Nothing fetched through the cursor yet; the next fetch has no marker.
    #[default]
    Unknown,
    /// The server handed out a marker for the next page.
    HasMore(String),
    /// The server confirmed there is nothing after the last item.
    Exhausted,
}

impl Cursor {
    /// Build the cursor that follows a non-empty page.
    pub fn after_page(next_marker: Option<String>) -> Self {
        match next_marker {
            Some(marker) if !marker.is_empty() => Cursor::HasMore(marker),
            _ => Cursor::Exhausted,
        }
    }

    pub fn marker(&self) -> Option<&str> {
        match self {
            Cursor::HasMore(marker) => Some(marker),
            Cursor::Unknown | Cursor::Exhausted => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Cursor::Exhausted)
    }
}

/// One fetched page.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_marker: Option<String>,
}

/// Something that can fetch pages; carries its own search parameters.
pub trait PageSource<T> {
    type Error;

    fn fetch_page(
        &self,
        marker: Option<&str>,
    ) -> impl Future<Output = Result<Page<T>, Self::Error>> + Send;
}

/// Append-only list backed by a [`Cursor`].
#[derive(Debug, Clone)]
pub struct PagedList<T> {
    items: Vec<T>,
    cursor: Cursor,
}

impl<T> Default for PagedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PagedList<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            cursor: Cursor::Unknown,
        }
    }

    /// Start from a page that was fetched elsewhere (e.g. alongside a profile).
    pub fn seeded(items: Vec<T>, next_marker: Option<String>) -> Self {
        let cursor = if items.is_empty() {
            Cursor::Exhausted
        } else {
            Cursor::after_page(next_marker)
        };
        Self { items, cursor }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_exhausted()
    }

    /// Apply a page fetched with `fetched_with`. Returns the index range of
    /// appended items, or `None` when the cursor moved while the page was in
    /// flight (the page is then discarded so nothing is appended twice).
    pub fn apply_page(&mut self, fetched_with: &Cursor, page: Page<T>) -> Option<Range<usize>> {
        if self.cursor != *fetched_with {
            tracing::debug!(
                expected = ?fetched_with,
                actual = ?self.cursor,
                "discarding stale page"
            );
            return None;
        }

        let start = self.items.len();
        if page.items.is_empty() {
            self.cursor = Cursor::Exhausted;
            return Some(start..start);
        }

        self.items.extend(page.items);
        self.cursor = Cursor::after_page(page.next_marker);
        Some(start..self.items.len())
    }

    /// Fetch and append the next page. Returns the newly appended items;
    /// empty once the list is exhausted (no request is made then).
    pub async fn load_more<S>(&mut self, source: &S) -> Result<&[T], S::Error>
    where
        S: PageSource<T>,
    {
        let requested = self.cursor.clone();
        if requested.is_exhausted() {
            tracing::debug!("list exhausted, not fetching");
            let end = self.items.len();
            return Ok(&self.items[end..]);
        }

        let page = source.fetch_page(requested.marker()).await?;
        let end = self.items.len();
        let range = self.apply_page(&requested, page).unwrap_or(end..end);
        Ok(&self.items[range])
    }
}

/// Chapter pages of one novel.
pub struct ChapterPages<'a, S> {
    service: &'a S,
    novel_id: &'a str,
}

impl<'a, S: ReaderService> ChapterPages<'a, S> {
    pub fn new(service: &'a S, novel_id: &'a str) -> Self {
        Self { service, novel_id }
    }
}

impl<S: ReaderService> PageSource<Chapter> for ChapterPages<'_, S> {
    type Error = S::Error;

    async fn fetch_page(&self, marker: Option<&str>) -> Result<Page<Chapter>, S::Error> {
        let page = self.service.fetch_chapters(self.novel_id, marker).await?;
        Ok(Page {
            items: page.chapters,
            next_marker: page.next_marker,
        })
    }
}
