//! Paginated metadata sources that offer candidate papers.
//!
//! A [`MetadataSource`] answers one page request at a time and keeps no paging
//! state of its own; the collection controller owns the offset and page size.
//!
//! # Empty pages
//!
//! A source can come back with nothing for two different reasons: the query is
//! genuinely exhausted (an empty `Vec`), or the remote side reported more
//! results than it returned ([`SourceError::EmptyFeed`]). The controller treats
//! both as a backoff trigger.

mod arxiv;
mod error;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::record::CandidateDescriptor;

pub use arxiv::{ArxivSource, DEFAULT_API_DELAY, DEFAULT_ARXIV_API_URL};
pub use error::SourceError;

/// Field the remote source sorts results by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    SubmittedDate,
    LastUpdatedDate,
    Relevance,
}

impl SortBy {
    /// Value used in the arXiv `sortBy` query parameter.
    #[must_use]
    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::SubmittedDate => "submittedDate",
            Self::LastUpdatedDate => "lastUpdatedDate",
            Self::Relevance => "relevance",
        }
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "submitteddate" | "submitted" => Ok(Self::SubmittedDate),
            "lastupdateddate" | "updated" => Ok(Self::LastUpdatedDate),
            "relevance" => Ok(Self::Relevance),
            _ => Err(format!(
                "unknown sort field '{value}' (expected submitted-date, last-updated-date or relevance)"
            )),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query_value())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Descending,
    Ascending,
}

impl SortOrder {
    /// Value used in the arXiv `sortOrder` query parameter.
    #[must_use]
    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::Descending => "descending",
            Self::Ascending => "ascending",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "descending" | "desc" => Ok(Self::Descending),
            "ascending" | "asc" => Ok(Self::Ascending),
            _ => Err(format!(
                "unknown sort order '{value}' (expected descending or ascending)"
            )),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query_value())
    }
}

/// One page request against a metadata source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Query expression in the source's syntax (e.g. `cat:cs.AI OR cat:cs.LG`).
    pub query: String,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    /// Zero-based index of the first result to return.
    pub start: usize,
    /// Maximum number of results to return.
    pub page_size: usize,
}

/// A paginated search API producing [`CandidateDescriptor`]s.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fetches one page of candidates in the source's result order.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::EmptyFeed`] for remote paging inconsistencies and
    /// other variants for transport or parse failures. None of them are fatal
    /// to a collection run.
    async fn fetch_page(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<CandidateDescriptor>, SourceError>;
}
