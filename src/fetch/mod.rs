//! Document retrieval with bounded retry, writing through to the local cache.
//!
//! # Overview
//!
//! [`HttpFetcher::fetch`] first consults the [`DocumentCache`]: a present file
//! is returned without any network traffic. Otherwise the document is
//! downloaded, streamed to a staging file and renamed into the cache. Failed
//! attempts are evaluated by [`RetryPolicy`]; once the budget is spent the
//! caller receives [`FetchError::RetriesExhausted`] and is expected to skip the
//! candidate. Local storage failures are returned as-is and are fatal.

mod error;
mod retry;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::cache::DocumentCache;
use crate::http::build_http_client;

pub use error::FetchError;
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_DELAY, FailureType,
    RetryDecision, RetryPolicy, classify_error,
};

/// A document available on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    /// Canonical cache path.
    pub path: PathBuf,
    /// True when no download was needed.
    pub from_cache: bool,
}

/// Obtains a local copy of a candidate's document.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Returns the local path of the document for `identifier`, downloading it
    /// from `url` when it is not cached yet.
    ///
    /// # Errors
    ///
    /// [`FetchError::is_fatal`] errors mean local storage is unusable; every
    /// other error means only this candidate should be skipped.
    async fn fetch(&self, identifier: &str, url: &str) -> Result<FetchedDocument, FetchError>;
}

/// HTTP implementation of [`DocumentFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    cache: DocumentCache,
    policy: RetryPolicy,
}

impl HttpFetcher {
    /// Creates a fetcher with the given cache, retry policy and per-attempt timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] when HTTP client construction fails.
    pub fn new(
        cache: DocumentCache,
        policy: RetryPolicy,
        request_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client =
            build_http_client(request_timeout).map_err(|source| FetchError::Client { source })?;
        Ok(Self {
            client,
            cache,
            policy,
        })
    }

    /// The cache this fetcher writes through to.
    #[must_use]
    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// One download attempt: GET, stream to staging, commit.
    async fn download_once(&self, identifier: &str, url: &str) -> Result<PathBuf, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::request(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        let staging = self.cache.staging_path_for(identifier);
        let file = File::create(&staging)
            .await
            .map_err(|e| FetchError::io(staging.clone(), e))?;

        match stream_to_file(file, response, url, &staging).await {
            Ok(bytes) => debug!(bytes, path = %staging.display(), "download streamed"),
            Err(error) => {
                debug!(path = %staging.display(), "cleaning up staging file after error");
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(error);
            }
        }

        self.cache.commit(identifier, &staging).await
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, identifier: &str, url: &str) -> Result<FetchedDocument, FetchError> {
        if let Some(path) = self.cache.lookup(identifier).await {
            debug!(path = %path.display(), "cache hit");
            return Ok(FetchedDocument {
                path,
                from_cache: true,
            });
        }

        if Url::parse(url).is_err() {
            return Err(FetchError::invalid_url(url));
        }
        self.cache.ensure_root().await?;

        let mut attempt = 1;
        loop {
            let result = self.download_once(identifier, url).await;
            let decision = self.policy.decide(attempt, &result);
            let error = match result {
                Ok(path) => {
                    info!(path = %path.display(), attempt, "document downloaded");
                    return Ok(FetchedDocument {
                        path,
                        from_cache: false,
                    });
                }
                Err(error) => error,
            };

            match decision {
                RetryDecision::Retry {
                    delay,
                    next_attempt,
                } => {
                    warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts(),
                        error = %error,
                        "download attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next_attempt;
                }
                RetryDecision::GiveUp { reason } => {
                    if classify_error(&error) != FailureType::Transient {
                        return Err(error);
                    }
                    warn!(attempt, reason = %reason, error = %error, "skipping document");
                    return Err(FetchError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        last_error: error.to_string(),
                    });
                }
                RetryDecision::Success => return Err(error),
            }
        }
    }
}

/// Streams the response body into `file`, syncing it before returning the byte count.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, FetchError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::request(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(file_path.to_path_buf(), e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::io(file_path.to_path_buf(), e))?;
    writer
        .into_inner()
        .sync_all()
        .await
        .map_err(|e| FetchError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}
