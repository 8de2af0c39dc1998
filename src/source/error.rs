//! Error types for metadata sources.

use thiserror::Error;

/// Errors raised while requesting a page from a metadata source.
///
/// Every variant is recoverable from the controller's point of view: it backs
/// off and asks again.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client for {source_name}: {source}")]
    Client {
        /// Name of the source being constructed.
        source_name: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The configured API base URL does not parse.
    #[error("invalid API base URL: {url}")]
    InvalidUrl {
        /// The rejected URL string.
        url: String,
    },

    /// Network-level failure (DNS, connection refused, reset).
    #[error("network error querying {url}: {source}")]
    Network {
        /// The request URL.
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete within the client timeout.
    #[error("timeout querying {url}")]
    Timeout {
        /// The request URL.
        url: String,
    },

    /// The API answered with a non-success status.
    #[error("HTTP {status} querying {url}")]
    HttpStatus {
        /// The request URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body was not a readable feed.
    #[error("malformed feed from {url}: {reason}")]
    Parse {
        /// The request URL.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// The feed returned no entries although it reports more results than the
    /// requested offset.
    #[error("empty feed at offset {start} although {total} results are reported")]
    EmptyFeed {
        /// Requested start offset.
        start: usize,
        /// Total results reported by the feed.
        total: usize,
    },
}

impl SourceError {
    /// Creates a transport error, mapping reqwest timeouts to [`SourceError::Timeout`].
    pub fn request(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a parse error.
    pub fn parse(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for the remote paging inconsistency case.
    #[must_use]
    pub fn is_empty_feed(&self) -> bool {
        matches!(self, Self::EmptyFeed { .. })
    }
}
