//! Identifier-keyed on-disk cache of downloaded PDFs.
//!
//! One file per identifier, named deterministically from it. Presence of the
//! file is the only cache-hit criterion: a document updated remotely under the
//! same identifier is never re-fetched.
//!
//! Writes go to a hidden staging file in the same directory and are renamed
//! into place, so a crash mid-download never leaves a truncated file under the
//! canonical name.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::fetch::FetchError;

/// Extension given to every cached document.
pub const CACHE_EXTENSION: &str = "pdf";

/// Directory-backed document cache.
#[derive(Debug, Clone)]
pub struct DocumentCache {
    root: PathBuf,
}

impl DocumentCache {
    /// Creates a cache rooted at `root`. The directory is created lazily by
    /// [`ensure_root`](Self::ensure_root).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the cache directory if missing.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] when the directory cannot be created.
    pub async fn ensure_root(&self) -> Result<(), FetchError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| FetchError::io(self.root.clone(), e))
    }

    /// Canonical cache path for `identifier`.
    #[must_use]
    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.root
            .join(format!("{}.{CACHE_EXTENSION}", cache_file_stem(identifier)))
    }

    /// Returns the cached path for `identifier` if a file is present.
    pub async fn lookup(&self, identifier: &str) -> Option<PathBuf> {
        let path = self.path_for(identifier);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    /// Staging path used while a download for `identifier` is in flight.
    #[must_use]
    pub(crate) fn staging_path_for(&self, identifier: &str) -> PathBuf {
        self.root
            .join(format!(".{}.{CACHE_EXTENSION}.part", cache_file_stem(identifier)))
    }

    /// Moves a completed staging file onto the canonical path.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] when the rename fails; the staging file is
    /// removed in that case.
    pub(crate) async fn commit(
        &self,
        identifier: &str,
        staging: &Path,
    ) -> Result<PathBuf, FetchError> {
        let dest = self.path_for(identifier);
        if let Err(e) = tokio::fs::rename(staging, &dest).await {
            let _ = tokio::fs::remove_file(staging).await;
            return Err(FetchError::io(dest, e));
        }
        debug!(path = %dest.display(), "cached document committed");
        Ok(dest)
    }

    /// Stores `bytes` under `identifier` atomically.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] on any filesystem failure.
    pub async fn store(&self, identifier: &str, bytes: &[u8]) -> Result<PathBuf, FetchError> {
        use tokio::io::AsyncWriteExt;

        self.ensure_root().await?;
        let staging = self.staging_path_for(identifier);
        let write = async {
            let mut file = tokio::fs::File::create(&staging).await?;
            file.write_all(bytes).await?;
            file.sync_all().await
        };
        if let Err(e) = write.await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(FetchError::io(staging, e));
        }
        self.commit(identifier, &staging).await
    }
}

/// Filesystem-safe stem for an identifier.
///
/// Replaces characters that are invalid on common filesystems
/// (`/ \ : * ? " < > |` and control characters) with `_`, and neutralizes
/// dot-only names so the result cannot escape the cache root.
#[must_use]
pub fn cache_file_stem(identifier: &str) -> String {
    let sanitized: String = identifier
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        return sanitized.replace('.', "_") + "_";
    }
    sanitized
}
