//! Heuristic location of the introduction section in extracted PDF text.
//!
//! PDF text extraction yields noisy line streams: headings may be split,
//! numbered, upper-cased, or missing entirely. The locator does not try to be a
//! section parser. It looks for a short line that reads as an "Introduction"
//! heading and takes everything up to the next short line that reads as one of
//! a closed set of following-section headings.
//!
//! False negatives and false positives are expected; callers treat an absent
//! result as a filter rejection, not an error.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::utils::compile_static_regex;

/// Maximum length (in characters) of a line accepted as the introduction heading.
pub const INTRO_HEADING_MAX_CHARS: usize = 50;

/// Maximum length (in characters) of a line accepted as the next-section heading.
pub const NEXT_HEADING_MAX_CHARS: usize = 70;

/// How many lines after the introduction heading are scanned for the next heading.
pub const INTRO_SCAN_CAP: usize = 1200;

/// Optional section number such as `1`, `1.`, `2.1` or `2.1.`.
const NUMBER_PREFIX: &str = r"(?:\d+(?:\.\d+)*\.?)?";

static INTRO_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(&format!(r"(?i)^\s*{NUMBER_PREFIX}\s*introduction\s*$"))
});

static NEXT_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(&format!(
        r"(?i)^\s*{NUMBER_PREFIX}\s*(?:related work|background|method|methods|approach|model|experiments|results|discussion|conclusion|conclusions)\s*$"
    ))
});

/// Returns the introduction text of `full_text`, or `None` when no usable
/// introduction can be located.
///
/// Lines are trimmed before matching and joining, so the result never carries
/// the PDF's indentation.
#[must_use]
pub fn locate_introduction(full_text: &str) -> Option<String> {
    let lines: Vec<&str> = full_text.lines().map(str::trim).collect();
    let span = locate_introduction_span(&lines)?;
    let snippet = lines[span].join("\n");
    let snippet = snippet.trim();
    if snippet.is_empty() {
        None
    } else {
        Some(snippet.to_string())
    }
}

/// Returns the line range of the introduction body within `lines`.
///
/// The range starts right after the heading and ends before the next matched
/// heading, or at the end of `lines` when no heading is found within
/// [`INTRO_SCAN_CAP`] lines. Lines are expected to be trimmed already.
#[must_use]
pub fn locate_introduction_span(lines: &[&str]) -> Option<Range<usize>> {
    let start = lines
        .iter()
        .position(|line| is_intro_heading(line))?
        + 1;

    let scan_end = start.saturating_add(INTRO_SCAN_CAP).min(lines.len());
    let stop = (start..scan_end)
        .find(|&index| is_next_heading(lines[index]))
        .unwrap_or(lines.len());

    Some(start..stop)
}

fn is_intro_heading(line: &str) -> bool {
    line.chars().count() <= INTRO_HEADING_MAX_CHARS && INTRO_HEADING_RE.is_match(line)
}

fn is_next_heading(line: &str) -> bool {
    line.chars().count() <= NEXT_HEADING_MAX_CHARS && NEXT_HEADING_RE.is_match(line)
}
