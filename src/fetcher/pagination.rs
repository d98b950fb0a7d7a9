//! Offset-based pagination
//!
//! Pages are requested at increasing offsets until the provider returns an
//! empty page. A short page is not terminal: the next offset is requested
//! anyway, since only an empty page marks the end of the result set.
//!
//! Includes an iteration ceiling so a provider that never returns an empty
//! page cannot keep the fetcher looping forever. The default allows ten million
//! records at the default page size; callers with larger slices raise it.

use crate::fetcher::{FetcherError, FetcherResult};
use crate::AccessLogRecord;
use std::future::Future;
use tracing::debug;

/// Default maximum number of pages fetched for one target
pub const MAX_PAGES: usize = 100_000;

/// Position of one page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Index of the first record to return (`from`)
    pub offset: usize,
    /// Records requested per page (`size`)
    pub page_size: usize,
}

impl PageCursor {
    /// Cursor for the first page
    pub fn first(page_size: usize) -> Self {
        Self {
            offset: 0,
            page_size,
        }
    }

    /// Cursor after receiving `received` records at this one
    pub fn advance(self, received: usize) -> Self {
        Self {
            offset: self.offset + received,
            page_size: self.page_size,
        }
    }
}

/// Pagination driver
pub struct PaginationHelper;

impl PaginationHelper {
    /// Fetch every page and return all records in arrival order
    ///
    /// # Arguments
    /// * `page_size` - Records requested per page, must be non-zero
    /// * `fetch_page` - Fetches a single page at the given cursor
    ///
    /// # Errors
    /// The first page failure (already accumulated records are dropped),
    /// `InvalidRequest` for a zero page size, or `PaginationLimit` when
    /// [`MAX_PAGES`] non-empty pages were received.
    pub async fn fetch_all<F, Fut>(page_size: usize, fetch_page: F) -> FetcherResult<Vec<AccessLogRecord>>
    where
        F: FnMut(PageCursor) -> Fut,
        Fut: Future<Output = FetcherResult<Vec<AccessLogRecord>>>,
    {
        Self::fetch_all_with_limit(page_size, MAX_PAGES, fetch_page).await
    }

    /// [`PaginationHelper::fetch_all`] with an explicit page ceiling
    pub async fn fetch_all_with_limit<F, Fut>(
        page_size: usize,
        max_pages: usize,
        mut fetch_page: F,
    ) -> FetcherResult<Vec<AccessLogRecord>>
    where
        F: FnMut(PageCursor) -> Fut,
        Fut: Future<Output = FetcherResult<Vec<AccessLogRecord>>>,
    {
        if page_size == 0 {
            return Err(FetcherError::InvalidRequest(
                "page size must be greater than zero".to_string(),
            ));
        }

        let mut records = Vec::new();
        let mut cursor = PageCursor::first(page_size);
        let mut pages = 0;

        loop {
            if pages >= max_pages {
                return Err(FetcherError::PaginationLimit {
                    pages,
                    offset: cursor.offset,
                });
            }

            debug!(
                "Fetching page {} (from={}, size={})",
                pages + 1,
                cursor.offset,
                cursor.page_size
            );

            let page = fetch_page(cursor).await?;
            pages += 1;

            if page.is_empty() {
                debug!(
                    "Empty page received after {} pages. Total records: {}",
                    pages,
                    records.len()
                );
                break;
            }

            debug!("Received {} records in page {}", page.len(), pages);

            cursor = cursor.advance(page.len());
            records.extend(page);
        }

        Ok(records)
    }
}
