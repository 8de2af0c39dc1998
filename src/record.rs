//! Candidate and record types flowing through the collection pipeline.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A paper offered by the metadata source, before its PDF has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateDescriptor {
    /// Source-unique identifier (for arXiv: `2301.01234v2`, `cs/0601001v1`).
    pub identifier: String,
    pub title: String,
    pub abstract_text: String,
    /// Where the PDF can be downloaded from.
    pub document_url: String,
    pub published: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
}

/// One line of the output log.
///
/// Field names on the wire match the JSONL layout consumed by the evaluation
/// scripts, so they differ from the Rust field names in places.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    #[serde(rename = "arxiv_id")]
    pub identifier: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub introduction: Option<String>,
    #[serde(rename = "pdf_path")]
    pub document_path: String,
    pub published: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
}

impl ExtractedRecord {
    /// Builds a record from a candidate, its cached PDF path and the located
    /// introduction (if any).
    #[must_use]
    pub fn from_candidate(
        candidate: &CandidateDescriptor,
        document_path: &Path,
        introduction: Option<String>,
    ) -> Self {
        Self {
            identifier: candidate.identifier.clone(),
            title: candidate.title.clone(),
            abstract_text: candidate.abstract_text.clone(),
            introduction,
            document_path: document_path.to_string_lossy().replace('\\', "/"),
            published: candidate.published,
            categories: candidate.categories.clone(),
        }
    }

    /// Acceptance filter: both abstract and introduction must be non-empty.
    #[must_use]
    pub fn is_acceptable(&self) -> bool {
        !self.abstract_text.trim().is_empty()
            && self
                .introduction
                .as_deref()
                .is_some_and(|intro| !intro.trim().is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candidate(abstract_text: &str) -> CandidateDescriptor {
        CandidateDescriptor {
            identifier: "2401.00001v1".to_string(),
            title: "A Paper".to_string(),
            abstract_text: abstract_text.to_string(),
            document_url: "https://arxiv.org/pdf/2401.00001v1".to_string(),
            published: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            categories: vec!["cs.AI".to_string(), "cs.LG".to_string()],
        }
    }

    #[test]
    fn test_record_serializes_with_log_field_names() {
        let record = ExtractedRecord::from_candidate(
            &candidate("An abstract."),
            Path::new("data/raw/pdfs/2401.00001v1.pdf"),
            Some("Intro text.".to_string()),
        );
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "abstract",
                "arxiv_id",
                "categories",
                "introduction",
                "pdf_path",
                "published",
                "title"
            ]
        );
        assert_eq!(object["arxiv_id"], "2401.00001v1");
        assert_eq!(object["pdf_path"], "data/raw/pdfs/2401.00001v1.pdf");
        assert_eq!(object["categories"][1], "cs.LG");
    }

    #[test]
    fn test_record_accepts_abstract_and_introduction() {
        let record =
            ExtractedRecord::from_candidate(&candidate("Abs."), Path::new("x.pdf"), Some("Intro".into()));
        assert!(record.is_acceptable());
    }

    #[test]
    fn test_record_rejects_missing_introduction() {
        let record = ExtractedRecord::from_candidate(&candidate("Abs."), Path::new("x.pdf"), None);
        assert!(!record.is_acceptable());
    }

    #[test]
    fn test_record_rejects_blank_abstract() {
        let record =
            ExtractedRecord::from_candidate(&candidate("  "), Path::new("x.pdf"), Some("Intro".into()));
        assert!(!record.is_acceptable());
    }

    #[test]
    fn test_record_round_trips_through_json_line() {
        let record =
            ExtractedRecord::from_candidate(&candidate("Abs."), Path::new("x.pdf"), Some("Intro".into()));
        let line = serde_json::to_string(&record).unwrap();
        assert!(!line.contains('\n'));
        let parsed: ExtractedRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, record);
    }
}
