//! Paper Harvester Library
//!
//! Collects scholarly paper metadata and PDFs from the arXiv query API,
//! extracts each paper's introduction and appends qualifying records to an
//! append-only JSONL log.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`source`] - Paginated metadata sources (arXiv Atom API)
//! - [`cache`] - Identifier-keyed on-disk PDF cache
//! - [`fetch`] - Retrying document download into the cache
//! - [`extract`] - PDF to plain text
//! - [`section`] - Introduction locator over extracted text
//! - [`collector`] - The adaptive paging control loop
//! - [`sink`] - Crash-safe NDJSON output log
//! - [`sample`] - Deterministic subset selection over an output log

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod collector;
pub mod extract;
pub mod fetch;
mod http;
pub mod record;
pub mod sample;
pub mod section;
pub mod sink;
pub mod source;
mod user_agent;
mod utils;

// Re-export commonly used types
pub use cache::DocumentCache;
pub use collector::{
    CollectError, CollectionController, CollectionReport, CollectionStats, CollectorConfig,
    PageSizer, RunOutcome,
};
pub use extract::{ExtractError, PdfTextExtractor, TextExtractor};
pub use fetch::{DocumentFetcher, FetchError, FetchedDocument, HttpFetcher, RetryPolicy};
pub use record::{CandidateDescriptor, ExtractedRecord};
pub use sample::{DEFAULT_SAMPLE_COUNT, DEFAULT_SAMPLE_SEED, SampleError, select_sample};
pub use section::locate_introduction;
pub use sink::{JsonlSink, RecordSink, SinkError, output_file_name};
pub use source::{
    ArxivSource, MetadataSource, SearchRequest, SortBy, SortOrder, SourceError,
};
