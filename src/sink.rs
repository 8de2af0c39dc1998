//! Append-only NDJSON output log.
//!
//! Each accepted record becomes one JSON line. Every [`DEFAULT_FLUSH_EVERY`]
//! appends the buffered lines are flushed and the file is synced, so an abrupt
//! stop loses at most the records since the last checkpoint.
//!
//! Lines are buffered in memory and handed to the file whole. When a write
//! fails the file is cut back to the end of the last complete line, so the log
//! never holds a partial record.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::record::ExtractedRecord;

/// Appends between forced flush + fsync checkpoints.
pub const DEFAULT_FLUSH_EVERY: usize = 50;

/// Buffered bytes that trigger a write before the next checkpoint.
const PENDING_LIMIT: usize = 64 * 1024;

/// Errors from the record sink. All of them are fatal to a run.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error writing output log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record {identifier}: {source}")]
    Serialize {
        identifier: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SinkError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Durable destination for accepted records.
#[async_trait]
pub trait RecordSink: Send {
    /// Appends one record.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the record cannot be serialized or written.
    async fn append(&mut self, record: &ExtractedRecord) -> Result<(), SinkError>;

    /// Flushes and syncs anything written since the last checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Io`] on flush or sync failure.
    async fn finish(&mut self) -> Result<(), SinkError>;
}

/// [`RecordSink`] writing newline-delimited JSON to a file.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    file: File,
    pending: Vec<u8>,
    written: u64,
    flush_every: usize,
    appended: usize,
}

impl JsonlSink {
    /// Creates a new log at `path`, creating parent directories.
    ///
    /// An existing file is never reused or truncated.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Io`] when the directory or file cannot be created,
    /// including when `path` already exists.
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SinkError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| SinkError::io(&path, e))?;
        Ok(Self {
            path,
            file,
            pending: Vec::with_capacity(PENDING_LIMIT),
            written: 0,
            flush_every: DEFAULT_FLUSH_EVERY,
            appended: 0,
        })
    }

    /// Overrides the checkpoint interval (minimum 1).
    #[must_use]
    pub fn with_flush_every(mut self, flush_every: usize) -> Self {
        self.flush_every = flush_every.max(1);
        self
    }

    /// Output file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records appended so far.
    #[must_use]
    pub fn appended(&self) -> usize {
        self.appended
    }

    /// Writes the buffered lines. On failure the file is cut back to the last
    /// complete line and the lines stay buffered.
    async fn write_pending(&mut self) -> Result<(), SinkError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        match write_all_flushed(&mut self.file, &self.pending).await {
            Ok(()) => {
                self.written += self.pending.len() as u64;
                self.pending.clear();
                Ok(())
            }
            Err(e) => {
                self.rollback().await;
                Err(SinkError::io(&self.path, e))
            }
        }
    }

    async fn rollback(&mut self) {
        if let Err(e) = self.file.set_len(self.written).await {
            warn!(error = %e, path = %self.path.display(), "failed to truncate partial output line");
        }
        if let Err(e) = self.file.seek(SeekFrom::Start(self.written)).await {
            warn!(error = %e, path = %self.path.display(), "failed to rewind output log");
        }
    }

    async fn checkpoint(&mut self) -> Result<(), SinkError> {
        self.write_pending().await?;
        self.file
            .sync_data()
            .await
            .map_err(|e| SinkError::io(&self.path, e))?;
        debug!(records = self.appended, path = %self.path.display(), "output log synced");
        Ok(())
    }
}

#[async_trait]
impl RecordSink for JsonlSink {
    async fn append(&mut self, record: &ExtractedRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(record).map_err(|source| SinkError::Serialize {
            identifier: record.identifier.clone(),
            source,
        })?;
        line.push('\n');

        self.pending.extend_from_slice(line.as_bytes());
        self.appended += 1;

        if self.appended % self.flush_every == 0 {
            self.checkpoint().await?;
        } else if self.pending.len() >= PENDING_LIMIT {
            self.write_pending().await?;
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        self.checkpoint().await
    }
}

async fn write_all_flushed(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await
}

/// Output file name `<prefix>_<YYYYmmdd_HHMMSS>.jsonl` for a run started at `started`.
#[must_use]
pub fn output_file_name(prefix: &str, started: DateTime<Utc>) -> String {
    format!("{prefix}_{}.jsonl", started.format("%Y%m%d_%H%M%S"))
}
