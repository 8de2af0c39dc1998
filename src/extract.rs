//! Plain-text extraction from cached PDF documents.

use std::panic::{AssertUnwindSafe, catch_unwind, set_hook, take_hook};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Errors produced while turning a document into text.
///
/// None of these are fatal to a collection run; the candidate is skipped.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The cached file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The PDF library rejected the document.
    #[error("failed to extract text from {path}: {message}")]
    Pdf { path: PathBuf, message: String },

    /// The PDF library panicked on malformed input.
    #[error("PDF parser panicked on {path}")]
    Panicked { path: PathBuf },

    /// The document yielded no text (image-only scans, for example).
    #[error("no text extracted from {path}")]
    EmptyText { path: PathBuf },

    /// The blocking extraction task was cancelled or aborted.
    #[error("extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Converts a stored document into its full text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Returns the text of every page of the document at `path`, in page order.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] when the document cannot be read or parsed, or
    /// contains no text.
    async fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// [`TextExtractor`] backed by `pdf-extract`, run on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let owned_path = path.to_path_buf();

        let text = tokio::task::spawn_blocking(move || extract_pdf_bytes(&bytes, &owned_path))
            .await??;
        debug!(path = %path.display(), chars = text.len(), "extracted document text");
        Ok(text)
    }
}

fn extract_pdf_bytes(bytes: &[u8], path: &Path) -> Result<String, ExtractError> {
    let outcome = catch_unwind_silent(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    }))
    .map_err(|_| ExtractError::Panicked {
        path: path.to_path_buf(),
    })?;

    let text = outcome.map_err(|e| ExtractError::Pdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if text.trim().is_empty() {
        return Err(ExtractError::EmptyText {
            path: path.to_path_buf(),
        });
    }
    Ok(text)
}

// The default panic hook prints to stderr even when the panic is caught.
// Malformed PDFs are common enough that the noise is suppressed while parsing.
static PDF_PANIC_HOOK_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

fn catch_unwind_silent<F, T>(operation: F) -> Result<T, Box<dyn std::any::Any + Send + 'static>>
where
    F: FnOnce() -> T + std::panic::UnwindSafe,
{
    let _panic_hook_guard = PDF_PANIC_HOOK_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let previous_hook = take_hook();
    set_hook(Box::new(|_| {}));
    let outcome = catch_unwind(operation);
    set_hook(previous_hook);
    outcome
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_catch_unwind_silent_returns_err_on_panic() {
        let outcome = catch_unwind_silent(|| -> u8 { panic!("boom") });
        assert!(outcome.is_err());
        assert_eq!(catch_unwind_silent(|| 7).unwrap(), 7);
    }

    #[tokio::test]
    async fn test_extract_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let error = PdfTextExtractor::new()
            .extract(&temp.path().join("absent.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(error, ExtractError::Io { .. }), "got {error:?}");
    }

    #[tokio::test]
    async fn test_extract_garbage_bytes_is_not_ok() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf at all").unwrap();

        let error = PdfTextExtractor::new().extract(&path).await.unwrap_err();
        assert!(
            matches!(error, ExtractError::Pdf { .. } | ExtractError::Panicked { .. }),
            "got {error:?}"
        );
        assert!(error.to_string().contains("broken.pdf"));
    }
}
