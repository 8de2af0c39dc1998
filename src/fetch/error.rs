//! Error types for document retrieval.
//!
//! Variants carry the URL or path they concern so a log line is actionable on
//! its own.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while obtaining a document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to build document HTTP client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },

    /// Network-level error (DNS resolution, connection refused, reset).
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The document URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// Local filesystem failure while writing the cache.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Every allowed attempt failed with a retryable error.
    #[error("giving up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// The URL that could not be downloaded.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// Display form of the final attempt's error.
        last_error: String,
    },
}

impl FetchError {
    /// Creates a transport error, mapping reqwest timeouts to [`FetchError::Timeout`].
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

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns true when the error means local storage is unusable and the
    /// collection run cannot continue.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_http_status_display() {
        let msg = FetchError::http_status("https://arxiv.org/pdf/2401.00001v1", 503).to_string();
        assert!(msg.contains("503"), "Expected '503' in: {msg}");
        assert!(msg.contains("2401.00001v1"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_fetch_error_exhausted_display() {
        let error = FetchError::RetriesExhausted {
            url: "https://arxiv.org/pdf/x".to_string(),
            attempts: 3,
            last_error: "HTTP 500 downloading https://arxiv.org/pdf/x".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("after 3 attempts"), "got: {msg}");
        assert!(!error.is_fatal());
    }

    #[test]
    fn test_fetch_error_io_is_fatal() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = FetchError::io("/cache/x.pdf", io);
        assert!(error.is_fatal());
        assert!(error.to_string().contains("/cache/x.pdf"));
    }

    #[test]
    fn test_fetch_error_transport_variants_are_not_fatal() {
        assert!(!FetchError::timeout("u").is_fatal());
        assert!(!FetchError::invalid_url("u").is_fatal());
        assert!(!FetchError::http_status("u", 404).is_fatal());
    }
}
