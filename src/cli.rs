//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use paper_harvester::{SortBy, SortOrder};

/// Collect arXiv papers with their introduction sections.
///
/// Pages through the arXiv API, caches each paper's PDF, extracts the
/// introduction and appends qualifying records to a JSONL log.
#[derive(Parser, Debug)]
#[command(name = "paper-harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Read defaults from this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect records until the target count is reached
    Collect(CollectArgs),

    /// Write a deterministic subset of an existing output log
    Sample(SampleArgs),
}

#[derive(clap::Args, Debug, Default)]
pub struct CollectArgs {
    /// Number of records to collect (1-1000000)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..=1_000_000))]
    pub target: Option<u64>,

    /// arXiv search query
    #[arg(long)]
    pub query: Option<String>,

    /// Sort field: submitted-date, last-updated-date or relevance
    #[arg(long)]
    pub sort_by: Option<SortBy>,

    /// Sort direction: descending or ascending
    #[arg(long)]
    pub sort_order: Option<SortOrder>,

    /// Data root; PDFs go to <DIR>/raw/pdfs, logs to <DIR>/processed
    #[arg(short = 'd', long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output file name prefix
    #[arg(long)]
    pub output_prefix: Option<String>,

    /// Stop after this many consecutive empty pages (default: never)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_empty_pages: Option<u32>,

    /// Override the arXiv API endpoint
    #[arg(long, value_name = "URL")]
    pub api_base_url: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SampleArgs {
    /// Input JSONL log
    pub input: PathBuf,

    /// Output JSONL file
    pub output: PathBuf,

    /// Number of records to select
    #[arg(long, default_value_t = paper_harvester::DEFAULT_SAMPLE_COUNT)]
    pub count: usize,

    /// Shuffle seed
    #[arg(long, default_value_t = paper_harvester::DEFAULT_SAMPLE_SEED)]
    pub seed: u64,
}
