//! Deterministic fixed-size subset of an output log.
//!
//! Records are filtered, sorted by identifier and shuffled with a seeded RNG,
//! so the same input and seed always produce the same subset regardless of the
//! order the collector wrote them in.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::record::ExtractedRecord;

/// Default subset size.
pub const DEFAULT_SAMPLE_COUNT: usize = 25;
/// Default shuffle seed.
pub const DEFAULT_SAMPLE_SEED: u64 = 42;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: invalid record: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize record {identifier}: {source}")]
    Serialize {
        identifier: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads every non-blank line of an NDJSON log.
///
/// # Errors
///
/// Returns [`SampleError`] when the file cannot be read or a line is not a
/// record.
pub fn read_records(path: &Path) -> Result<Vec<ExtractedRecord>, SampleError> {
    let io_err = |source| SampleError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(std::fs::File::open(path).map_err(io_err)?);

    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| SampleError::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Picks `count` acceptable records deterministically for `seed`.
#[must_use]
pub fn choose(mut records: Vec<ExtractedRecord>, count: usize, seed: u64) -> Vec<ExtractedRecord> {
    records.retain(ExtractedRecord::is_acceptable);
    records.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    let mut rng = StdRng::seed_from_u64(seed);
    records.shuffle(&mut rng);
    records.truncate(count);
    records
}

/// Writes a sample of `input` to `output` and returns the number written.
///
/// # Errors
///
/// Returns [`SampleError`] on read, parse or write failure.
pub fn select_sample(
    input: &Path,
    output: &Path,
    count: usize,
    seed: u64,
) -> Result<usize, SampleError> {
    let subset = choose(read_records(input)?, count, seed);

    let io_err = |source| SampleError::Io {
        path: output.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(std::fs::File::create(output).map_err(io_err)?);
    for record in &subset {
        let line = serde_json::to_string(record).map_err(|source| SampleError::Serialize {
            identifier: record.identifier.clone(),
            source,
        })?;
        writeln!(writer, "{line}").map_err(io_err)?;
    }
    writer.flush().map_err(io_err)?;
    Ok(subset.len())
}
