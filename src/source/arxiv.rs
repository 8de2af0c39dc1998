//! arXiv Atom query API as a [`MetadataSource`].

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use feed_rs::model::{Entry, Link};
use regex::Regex;
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument};
use url::Url;

use crate::http::build_http_client;
use crate::record::CandidateDescriptor;
use crate::utils::{collapse_whitespace, compile_static_regex};

use super::{MetadataSource, SearchRequest, SourceError};

/// Public arXiv query endpoint.
pub const DEFAULT_ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

/// Minimum spacing between consecutive API requests (arXiv asks for >= 3s).
pub const DEFAULT_API_DELAY: Duration = Duration::from_secs(5);

/// Whole-request timeout for API calls.
const API_TIMEOUT: Duration = Duration::from_secs(60);

static TOTAL_RESULTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?is)<opensearch:totalResults[^>]*>\s*(\d+)\s*</opensearch:totalResults>")
});

/// Metadata source backed by the arXiv export API.
pub struct ArxivSource {
    client: Client,
    base_url: Url,
    request_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for ArxivSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArxivSource")
            .field("base_url", &self.base_url.as_str())
            .field("request_delay", &self.request_delay)
            .finish_non_exhaustive()
    }
}

impl ArxivSource {
    /// Creates a source against the public arXiv endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when HTTP client construction fails.
    pub fn new() -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_ARXIV_API_URL, DEFAULT_API_DELAY)
    }

    /// Creates a source with a custom endpoint and request spacing.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidUrl`] for an unparsable base URL and
    /// [`SourceError::Client`] when HTTP client construction fails.
    pub fn with_base_url(base_url: &str, request_delay: Duration) -> Result<Self, SourceError> {
        let base_url = Url::parse(base_url).map_err(|_| SourceError::InvalidUrl {
            url: base_url.to_string(),
        })?;
        let client = build_http_client(API_TIMEOUT).map_err(|source| SourceError::Client {
            source_name: "arxiv",
            source,
        })?;
        Ok(Self {
            client,
            base_url,
            request_delay,
            last_request: Mutex::new(None),
        })
    }

    fn query_url(&self, request: &SearchRequest) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("search_query", &request.query)
            .append_pair("sortBy", request.sort_by.as_query_value())
            .append_pair("sortOrder", request.sort_order.as_query_value())
            .append_pair("start", &request.start.to_string())
            .append_pair("max_results", &request.page_size.to_string());
        url
    }

    /// Sleeps until `request_delay` has passed since the previous request.
    async fn wait_turn(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.request_delay {
                let wait = self.request_delay - elapsed;
                debug!(wait_ms = wait.as_millis(), "spacing arXiv API requests");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl MetadataSource for ArxivSource {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    #[instrument(skip(self, request), fields(source = "arxiv", start = request.start, page_size = request.page_size))]
    async fn fetch_page(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<CandidateDescriptor>, SourceError> {
        let url = self.query_url(request);
        self.wait_turn().await;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SourceError::request(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::http_status(url.as_str(), status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SourceError::request(url.as_str(), e))?;

        let candidates = parse_feed(&body, url.as_str(), request.start)?;
        debug!(count = candidates.len(), "parsed arXiv page");
        Ok(candidates)
    }
}

/// Parses an arXiv Atom response into candidates.
///
/// An entry-less feed is an [`SourceError::EmptyFeed`] when the feed's
/// `opensearch:totalResults` exceeds `start`, and an empty page otherwise.
pub(crate) fn parse_feed(
    body: &[u8],
    url: &str,
    start: usize,
) -> Result<Vec<CandidateDescriptor>, SourceError> {
    let feed = feed_rs::parser::parse(body).map_err(|e| SourceError::parse(url, e.to_string()))?;

    if feed.entries.is_empty() {
        if let Some(total) = total_results(body)
            && total > start
        {
            return Err(SourceError::EmptyFeed { start, total });
        }
        return Ok(Vec::new());
    }

    Ok(feed
        .entries
        .into_iter()
        .filter_map(candidate_from_entry)
        .collect())
}

fn total_results(body: &[u8]) -> Option<usize> {
    let text = String::from_utf8_lossy(body);
    TOTAL_RESULTS_RE
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn candidate_from_entry(entry: Entry) -> Option<CandidateDescriptor> {
    let Some(identifier) = identifier_from_entry_id(&entry.id) else {
        // The API reports query errors as a pseudo-entry with an /api/errors id.
        debug!(id = %entry.id, "skipping feed entry without an /abs/ identifier");
        return None;
    };

    let document_url =
        pdf_link(&entry.links).unwrap_or_else(|| entry.id.trim().replacen("/abs/", "/pdf/", 1));

    Some(CandidateDescriptor {
        identifier,
        title: entry
            .title
            .map(|t| collapse_whitespace(&t.content))
            .unwrap_or_default(),
        abstract_text: entry
            .summary
            .map(|s| s.content.trim().to_string())
            .unwrap_or_default(),
        document_url,
        published: entry.published,
        categories: entry.categories.into_iter().map(|c| c.term).collect(),
    })
}

/// Extracts `2301.01234v2` from `http://arxiv.org/abs/2301.01234v2`.
///
/// Old-style identifiers keep their archive prefix (`cs/0601001v1`).
fn identifier_from_entry_id(entry_id: &str) -> Option<String> {
    let (_, rest) = entry_id.trim().split_once("/abs/")?;
    let identifier = rest.trim_matches('/');
    (!identifier.is_empty()).then(|| identifier.to_string())
}

fn pdf_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|link| {
            link.title.as_deref() == Some("pdf")
                || link.media_type.as_deref() == Some("application/pdf")
        })
        .map(|link| link.href.clone())
}
