//! The collection control loop.
//!
//! # Overview
//!
//! [`CollectionController::run`] pages through a [`MetadataSource`] until the
//! target number of records has been written to the [`RecordSink`]:
//!
//! 1. Request a page at the current offset and page size.
//! 2. For each candidate: fetch the document (cache first), extract its text,
//!    locate the introduction and append the record if it passes the filter.
//! 3. Adjust the page size from the page's yield: halve it (and sleep) after an
//!    empty or failed page, double it otherwise.
//!
//! Per-candidate failures are logged and skipped. Only local storage failures
//! (cache or output log) end the run early with an error.

use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::extract::TextExtractor;
use crate::fetch::{DocumentFetcher, FetchError};
use crate::record::{CandidateDescriptor, ExtractedRecord};
use crate::section::locate_introduction;
use crate::sink::{RecordSink, SinkError};
use crate::source::{MetadataSource, SearchRequest, SortBy, SortOrder};

/// Initial page size.
pub const PAGE_SIZE_START: usize = 25;
/// Smallest page size the controller backs off to.
pub const PAGE_SIZE_MIN: usize = 5;
/// Largest page size the controller grows to.
pub const PAGE_SIZE_MAX: usize = 100;

/// Default number of records to collect.
pub const DEFAULT_TARGET: usize = 1000;
/// Default arXiv query.
pub const DEFAULT_QUERY: &str = "cat:cs.AI OR cat:cs.LG";
/// Default pause after an empty or failed page.
pub const DEFAULT_BACKOFF_DELAY: Duration = Duration::from_secs(5);
/// Accepted records between progress log lines.
pub const PROGRESS_EVERY: usize = 50;

/// Fatal errors that end a collection run.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("document cache failure: {0}")]
    Fetch(#[source] FetchError),

    #[error("output log failure: {0}")]
    Sink(#[from] SinkError),
}

/// Adaptive page size: halves on an empty page, doubles on a productive one,
/// always within `[PAGE_SIZE_MIN, PAGE_SIZE_MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizer {
    page_size: usize,
}

impl Default for PageSizer {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE_START,
        }
    }
}

impl PageSizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current page size.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Applies the outcome of the last page and returns the new size.
    pub fn after_page(&mut self, yielded: bool) -> usize {
        self.page_size = if yielded {
            (self.page_size * 2).min(PAGE_SIZE_MAX)
        } else {
            (self.page_size / 2).max(PAGE_SIZE_MIN)
        };
        self.page_size
    }
}

/// Run parameters for [`CollectionController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Number of accepted records after which the run stops.
    pub target: usize,
    pub query: String,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    /// Pause after an empty or failed page.
    pub backoff_delay: Duration,
    /// Stop after this many consecutive empty or failed pages. `None` never
    /// gives up.
    pub max_empty_pages: Option<u32>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET,
            query: DEFAULT_QUERY.to_string(),
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            backoff_delay: DEFAULT_BACKOFF_DELAY,
            max_empty_pages: None,
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// `target` records were written.
    TargetReached,
    /// The giving-up condition triggered first.
    SourceExhausted,
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub pages: usize,
    pub backoffs: usize,
    pub candidates: usize,
    pub downloads: usize,
    pub cache_hits: usize,
    pub fetch_failures: usize,
    pub extraction_failures: usize,
    /// Candidates whose abstract or introduction was empty.
    pub rejections: usize,
    /// Candidates already seen earlier in this run.
    pub duplicates: usize,
    pub collected: usize,
}

/// Result of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionReport {
    pub outcome: RunOutcome,
    pub stats: CollectionStats,
    /// Page size the next request would have used.
    pub page_size: usize,
    /// Offset the next request would have used.
    pub next_offset: usize,
}

enum CandidateOutcome {
    Accepted,
    Skipped,
}

/// Drives the source, fetcher, extractor and sink until the target is met.
pub struct CollectionController<S, F, E, K> {
    config: CollectorConfig,
    source: S,
    fetcher: F,
    extractor: E,
    sink: K,
    sizer: PageSizer,
    offset: usize,
    seen: HashSet<String>,
    stats: CollectionStats,
}

impl<S, F, E, K> CollectionController<S, F, E, K>
where
    S: MetadataSource,
    F: DocumentFetcher,
    E: TextExtractor,
    K: RecordSink,
{
    pub fn new(config: CollectorConfig, source: S, fetcher: F, extractor: E, sink: K) -> Self {
        Self {
            config,
            source,
            fetcher,
            extractor,
            sink,
            sizer: PageSizer::new(),
            offset: 0,
            seen: HashSet::new(),
            stats: CollectionStats::default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// The sink records are written to.
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Counters so far.
    pub fn stats(&self) -> &CollectionStats {
        &self.stats
    }

    /// Runs until the target is reached or the giving-up condition triggers.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError`] when the document cache or the output log
    /// cannot be written. The sink is checkpointed before the error is
    /// returned, so every record accepted before the failure stays on disk.
    pub async fn run(&mut self) -> Result<CollectionReport, CollectError> {
        info!(
            source = self.source.name(),
            target = self.config.target,
            query = %self.config.query,
            "collection started"
        );

        let collected = self.collect_pages().await;
        let finished = self.sink.finish().await;
        let outcome = match collected {
            Ok(outcome) => {
                finished?;
                outcome
            }
            Err(error) => {
                if let Err(sink_error) = finished {
                    warn!(error = %sink_error, "output log checkpoint failed after fatal error");
                }
                return Err(error);
            }
        };

        info!(
            collected = self.stats.collected,
            pages = self.stats.pages,
            backoffs = self.stats.backoffs,
            downloads = self.stats.downloads,
            cache_hits = self.stats.cache_hits,
            "collection finished"
        );

        Ok(CollectionReport {
            outcome,
            stats: self.stats,
            page_size: self.sizer.page_size(),
            next_offset: self.offset,
        })
    }

    async fn collect_pages(&mut self) -> Result<RunOutcome, CollectError> {
        let mut consecutive_empty: u32 = 0;
        let mut outcome = RunOutcome::TargetReached;

        while self.stats.collected < self.config.target {
            if let Some(limit) = self.config.max_empty_pages
                && consecutive_empty >= limit
            {
                warn!(pages = consecutive_empty, "giving up after consecutive empty pages");
                outcome = RunOutcome::SourceExhausted;
                break;
            }

            let request = SearchRequest {
                query: self.config.query.clone(),
                sort_by: self.config.sort_by,
                sort_order: self.config.sort_order,
                start: self.offset,
                page_size: self.sizer.page_size(),
            };
            self.stats.pages += 1;

            let page = match self.source.fetch_page(&request).await {
                Ok(page) if !page.is_empty() => page,
                Ok(_) => {
                    self.back_off("empty page").await;
                    consecutive_empty += 1;
                    continue;
                }
                Err(error) => {
                    self.back_off(&error.to_string()).await;
                    consecutive_empty += 1;
                    continue;
                }
            };

            consecutive_empty = 0;
            self.offset += page.len();
            debug!(entries = page.len(), next_offset = self.offset, "page received");

            for candidate in &page {
                if let CandidateOutcome::Accepted = self.process(candidate).await? {
                    self.stats.collected += 1;
                    if self.stats.collected % PROGRESS_EVERY == 0 {
                        info!(
                            collected = self.stats.collected,
                            target = self.config.target,
                            "progress"
                        );
                    }
                    if self.stats.collected >= self.config.target {
                        break;
                    }
                }
            }

            self.sizer.after_page(true);
        }

        Ok(outcome)
    }

    async fn back_off(&mut self, reason: &str) {
        let previous = self.sizer.page_size();
        let next = self.sizer.after_page(false);
        self.stats.backoffs += 1;
        warn!(reason, page_size = previous, next_page_size = next, "backing off");
        tokio::time::sleep(self.config.backoff_delay).await;
    }

    async fn process(
        &mut self,
        candidate: &CandidateDescriptor,
    ) -> Result<CandidateOutcome, CollectError> {
        self.stats.candidates += 1;
        let id = candidate.identifier.as_str();

        if !self.seen.insert(candidate.identifier.clone()) {
            self.stats.duplicates += 1;
            debug!(id, "already seen this run");
            return Ok(CandidateOutcome::Skipped);
        }

        let document = match self.fetcher.fetch(id, &candidate.document_url).await {
            Ok(document) => document,
            Err(error) if error.is_fatal() => return Err(CollectError::Fetch(error)),
            Err(error) => {
                self.stats.fetch_failures += 1;
                warn!(id, error = %error, "skipping candidate: document unavailable");
                return Ok(CandidateOutcome::Skipped);
            }
        };
        if document.from_cache {
            self.stats.cache_hits += 1;
        } else {
            self.stats.downloads += 1;
        }

        let text = match self.extractor.extract(&document.path).await {
            Ok(text) => text,
            Err(error) => {
                self.stats.extraction_failures += 1;
                warn!(id, error = %error, "skipping candidate: text extraction failed");
                return Ok(CandidateOutcome::Skipped);
            }
        };

        let introduction = locate_introduction(&text);
        let record = ExtractedRecord::from_candidate(candidate, &document.path, introduction);
        if !record.is_acceptable() {
            self.stats.rejections += 1;
            debug!(id, "rejected: empty abstract or introduction");
            return Ok(CandidateOutcome::Skipped);
        }

        self.sink.append(&record).await?;
        Ok(CandidateOutcome::Accepted)
    }
}
