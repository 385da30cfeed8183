//! Paginated stream for lazy iteration over dataset rows.
//!
//! This module provides a [`PaginatedStream`] that implements the `Stream`
//! trait, fetching one page at a time and following the `rel="next"` link
//! the service returns until a page arrives without one.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use reqwest::header::{HeaderMap, LINK};
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::http::{ApiRequest, ClientInner};
use crate::models::{DatasetName, Query, MAX_PAGE_SIZE};
use crate::{Error, Result};

/// Response header carrying the total number of matching rows.
pub const RECORD_COUNT_HEADER: &str = "X-QUERY-RECORD-COUNT";

/// One decoded page of results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// The rows in this page, in server order.
    pub rows: Vec<T>,
    /// Continuation token (the next page's link), `None` on the last page.
    pub next_page_token: Option<String>,
    /// Total matching rows, when the server reports it.
    pub total_count: Option<u64>,
}

/// Type alias for a boxed future used internally.
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type FetchPage<T> = dyn Fn(Option<String>) -> BoxFuture<'static, Result<Page<T>>> + Send + Sync;

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// A stream that lazily fetches pages from a dataset endpoint.
///
/// Rows are yielded in the order the server returns them. The stream is
/// forward-only; to start over, issue the query again. Dropping the stream
/// stops fetching. An error ends the stream after it is yielded.
///
/// # Example
///
/// ```no_run
/// use futures_util::StreamExt;
/// use enverus_rs::Query;
///
/// # async fn example(client: enverus_rs::DeveloperApiClient) -> enverus_rs::Result<()> {
/// let mut stream = client.query("casings", Query::new().filter("deleteddate", "null"));
///
/// while let Some(result) = stream.next().await {
///     let row = result?;
///     println!("{:?}", row);
/// }
/// # Ok(())
/// # }
/// ```
pub struct PaginatedStream<T> {
    /// Function to fetch a page by continuation token.
    fetch_page: Box<FetchPage<T>>,
    /// Rows of the current page not yet yielded.
    current_rows: VecDeque<T>,
    /// Where the next fetch starts.
    cursor: Cursor,
    /// Current in-flight fetch future.
    pending_fetch: Option<BoxFuture<'static, Result<Page<T>>>>,
    total_count: Option<u64>,
    pages_fetched: u64,
}

impl<T> PaginatedStream<T>
where
    T: Send + 'static,
{
    /// Create a new paginated stream.
    ///
    /// `fetch_page` receives `None` for the first page and the previous
    /// page's `next_page_token` afterwards.
    pub fn new<F>(fetch_page: F) -> Self
    where
        F: Fn(Option<String>) -> BoxFuture<'static, Result<Page<T>>> + Send + Sync + 'static,
    {
        Self {
            fetch_page: Box::new(fetch_page),
            current_rows: VecDeque::new(),
            cursor: Cursor::Start,
            pending_fetch: None,
            total_count: None,
            pages_fetched: 0,
        }
    }

    /// Total matching rows, if a fetched page reported it.
    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }
}

impl<T> Stream for PaginatedStream<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if let Some(row) = this.current_rows.pop_front() {
                return Poll::Ready(Some(Ok(row)));
            }

            if let Some(ref mut fut) = this.pending_fetch {
                match fut.as_mut().poll(cx) {
                    Poll::Ready(Ok(page)) => {
                        this.pending_fetch = None;
                        this.pages_fetched += 1;
                        if page.total_count.is_some() {
                            this.total_count = page.total_count;
                        }
                        this.current_rows = page.rows.into();
                        this.cursor = match page.next_page_token {
                            Some(token) => Cursor::Next(token),
                            None => Cursor::Done,
                        };
                        // An empty page with a next link still continues.
                        continue;
                    }
                    Poll::Ready(Err(e)) => {
                        this.pending_fetch = None;
                        this.cursor = Cursor::Done;
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Pending => {
                        return Poll::Pending;
                    }
                }
            }

            let token = match std::mem::replace(&mut this.cursor, Cursor::Done) {
                Cursor::Start => None,
                Cursor::Next(token) => Some(token),
                Cursor::Done => return Poll::Ready(None),
            };
            this.pending_fetch = Some((this.fetch_page)(token));
        }
    }
}

impl<T> Unpin for PaginatedStream<T> {}

/// Builder for creating paginated dataset streams.
pub(crate) struct PaginatedStreamBuilder<T> {
    inner: Arc<ClientInner>,
    dataset: DatasetName,
    page_size: u32,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DeserializeOwned + Send + 'static> PaginatedStreamBuilder<T> {
    /// Create a new builder.
    pub(crate) fn new(inner: Arc<ClientInner>, dataset: DatasetName) -> Self {
        let page_size = inner.config.page_size;
        Self {
            inner,
            dataset,
            page_size,
            _marker: std::marker::PhantomData,
        }
    }

    /// Set the number of rows per page.
    pub(crate) fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Build the stream for `query`.
    ///
    /// Nothing is sent until the stream is first polled; parameter errors
    /// surface on that first poll.
    pub(crate) fn build(self, query: Query) -> PaginatedStream<T> {
        let inner = self.inner;
        let dataset = self.dataset;
        let page_size = self.page_size;

        PaginatedStream::new(move |token: Option<String>| {
            let inner = inner.clone();
            let dataset = dataset.clone();
            let query = query.clone();

            Box::pin(async move {
                dataset.validate()?;
                if page_size == 0 || page_size > MAX_PAGE_SIZE {
                    return Err(Error::Query(format!(
                        "pagesize must be between 1 and {}, got {}",
                        MAX_PAGE_SIZE, page_size
                    )));
                }

                let request = match token {
                    None => ApiRequest {
                        method: Method::GET,
                        url: inner.dataset_url(&dataset),
                        params: query.page_params(page_size),
                        dataset,
                    },
                    Some(link) => ApiRequest {
                        method: Method::GET,
                        url: inner.resolve_link(&link)?,
                        params: Vec::new(),
                        dataset,
                    },
                };

                fetch_page(&inner, &request).await
            })
        })
    }
}

async fn fetch_page<T: DeserializeOwned>(inner: &ClientInner, request: &ApiRequest) -> Result<Page<T>> {
    let response = inner.execute(request).await?;

    let next_page_token = next_link(&response.headers);
    let total_count = record_count(&response.headers);

    let rows: Vec<T> = if response.body.iter().all(u8::is_ascii_whitespace) {
        Vec::new()
    } else {
        serde_json::from_slice(&response.body)?
    };

    debug!(
        dataset = %request.dataset,
        rows = rows.len(),
        has_next = next_page_token.is_some(),
        "fetched page"
    );

    Ok(Page {
        rows,
        next_page_token,
        total_count,
    })
}

/// Read the total-row header, if present and numeric.
pub(crate) fn record_count(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RECORD_COUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Extract the `rel="next"` target from RFC 8288 `Link` headers.
pub(crate) fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(link_entries)
        .find_map(|(target, params)| {
            let is_next = params.split(';').any(|param| match param.split_once('=') {
                Some((key, value)) => {
                    key.trim().eq_ignore_ascii_case("rel")
                        && value
                            .trim()
                            .trim_matches('"')
                            .split_whitespace()
                            .any(|rel| rel.eq_ignore_ascii_case("next"))
                }
                None => false,
            });
            if is_next && !target.is_empty() {
                Some(target.to_string())
            } else {
                None
            }
        })
}

/// Split one `Link` header value into `(target, params)` pairs.
///
/// Targets are bracketed and may contain commas (`in(TX,LA)` filters), so
/// entries are delimited by the brackets rather than by splitting on `,`.
fn link_entries(value: &str) -> Vec<(&str, &str)> {
    let mut entries = Vec::new();
    let mut rest = value;

    while let Some(open) = rest.find('<') {
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find('>') else {
            break;
        };
        let target = after_open[..close].trim();
        let tail = &after_open[close + 1..];

        let params_end = tail.find('<').unwrap_or(tail.len());
        let params = tail[..params_end].trim().trim_end_matches(',');
        entries.push((target, params));

        rest = &tail[params_end..];
    }
    entries
}
