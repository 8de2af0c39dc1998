//! CLI entry point for paper-harvester.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use paper_harvester::fetch::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_DELAY, RetryPolicy,
};
use paper_harvester::source::{DEFAULT_API_DELAY, DEFAULT_ARXIV_API_URL};
use paper_harvester::{
    ArxivSource, CollectionController, CollectorConfig, DocumentCache, HttpFetcher, JsonlSink,
    PdfTextExtractor, RunOutcome, output_file_name, select_sample,
};
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::{FileConfig, load_file_config};
use cli::{Args, CollectArgs, Command, SampleArgs};

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_OUTPUT_PREFIX: &str = "arxiv_ai_intros";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let file_config = load_file_config(args.config.as_deref())?.unwrap_or_default();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => file_config
                .verbosity
                .map_or("info", app_config::VerbositySetting::default_level),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    match args.command {
        Command::Collect(collect) => run_collect(collect, &file_config).await,
        Command::Sample(sample) => run_sample(&sample),
    }
}

/// Settings for one collection run after merging CLI and file config.
#[derive(Debug)]
struct CollectSettings {
    collector: CollectorConfig,
    data_dir: PathBuf,
    output_prefix: String,
    api_base_url: String,
    api_delay: Duration,
    pdf_timeout: Duration,
    retry_policy: RetryPolicy,
}

impl CollectSettings {
    fn resolve(args: CollectArgs, file: &FileConfig) -> Result<Self> {
        let mut collector = CollectorConfig::default();
        if let Some(target) = args.target {
            collector.target = usize::try_from(target).context("target out of range")?;
        } else if let Some(target) = file.target {
            collector.target = target;
        }
        if let Some(query) = args.query.or_else(|| file.query.clone()) {
            collector.query = query;
        }
        if let Some(sort_by) = args.sort_by {
            collector.sort_by = sort_by;
        }
        if let Some(sort_order) = args.sort_order {
            collector.sort_order = sort_order;
        }
        if let Some(secs) = file.backoff_delay_secs {
            collector.backoff_delay = Duration::from_secs(secs);
        }
        collector.max_empty_pages = args.max_empty_pages.or(file.max_empty_pages);

        let retry_policy = RetryPolicy::new(
            file.pdf_retries.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            file.pdf_retry_delay_secs
                .map_or(DEFAULT_RETRY_DELAY, Duration::from_secs),
        );

        Ok(Self {
            collector,
            data_dir: args
                .data_dir
                .or_else(|| file.data_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            output_prefix: args
                .output_prefix
                .or_else(|| file.output_prefix.clone())
                .unwrap_or_else(|| DEFAULT_OUTPUT_PREFIX.to_string()),
            api_base_url: args
                .api_base_url
                .unwrap_or_else(|| DEFAULT_ARXIV_API_URL.to_string()),
            api_delay: file
                .api_delay_secs
                .map_or(DEFAULT_API_DELAY, Duration::from_secs),
            pdf_timeout: file
                .pdf_timeout_secs
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs),
            retry_policy,
        })
    }

    fn pdf_dir(&self) -> PathBuf {
        self.data_dir.join("raw").join("pdfs")
    }

    fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }
}

async fn run_collect(args: CollectArgs, file_config: &FileConfig) -> Result<()> {
    let settings = CollectSettings::resolve(args, file_config)?;
    let output_path = settings
        .processed_dir()
        .join(output_file_name(&settings.output_prefix, Utc::now()));

    info!(pdf_dir = %settings.pdf_dir().display(), "starting");
    info!(out_file = %output_path.display(), "starting");

    let source = ArxivSource::with_base_url(&settings.api_base_url, settings.api_delay)
        .context("Failed to initialize arXiv source")?;
    let fetcher = HttpFetcher::new(
        DocumentCache::new(settings.pdf_dir()),
        settings.retry_policy.clone(),
        settings.pdf_timeout,
    )
    .context("Failed to initialize document fetcher")?;
    let sink = JsonlSink::create(&output_path)
        .await
        .with_context(|| format!("Failed to create output log '{}'", output_path.display()))?;

    let mut controller = CollectionController::new(
        settings.collector,
        source,
        fetcher,
        PdfTextExtractor::new(),
        sink,
    );
    let report = controller.run().await.context("Collection aborted")?;

    let stats = report.stats;
    info!(
        collected = stats.collected,
        candidates = stats.candidates,
        downloads = stats.downloads,
        cache_hits = stats.cache_hits,
        fetch_failures = stats.fetch_failures,
        extraction_failures = stats.extraction_failures,
        rejections = stats.rejections,
        duplicates = stats.duplicates,
        pages = stats.pages,
        backoffs = stats.backoffs,
        file = %output_path.display(),
        "done"
    );
    if report.outcome == RunOutcome::SourceExhausted {
        warn!(
            collected = stats.collected,
            "stopped before reaching the target: source kept returning empty pages"
        );
    }
    Ok(())
}

fn run_sample(args: &SampleArgs) -> Result<()> {
    let selected = select_sample(&args.input, &args.output, args.count, args.seed)
        .with_context(|| format!("Failed to sample '{}'", args.input.display()))?;
    info!(selected, output = %args.output.display(), "sample written");
    Ok(())
}
