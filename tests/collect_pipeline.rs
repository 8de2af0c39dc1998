//! End-to-end collection against a mock arXiv API and PDF host.

mod support;

use std::time::Duration;

use paper_harvester::fetch::{HttpFetcher, RetryPolicy};
use paper_harvester::{
    ArxivSource, CollectionController, CollectorConfig, DocumentCache, ExtractedRecord,
    JsonlSink, PdfTextExtractor, RunOutcome, TextExtractor, locate_introduction,
};
use support::{atom_entry, atom_feed, pdf_with_lines};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAPER_WITH_INTRO: &[&str] = &[
    "A Study of Things",
    "Abstract",
    "1 Introduction",
    "We study things carefully.",
    "2 Related Work",
    "Prior work exists.",
];

const PAPER_WITHOUT_INTRO: &[&str] = &["A Short Note", "Some remarks without sections."];

async fn mount_pdf(server: &MockServer, id: &str, status: u16, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("/pdf/{id}")))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_pdf_extractor_reads_generated_document() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let pdf_path = temp_dir.path().join("paper.pdf");
    std::fs::write(&pdf_path, pdf_with_lines(PAPER_WITH_INTRO)).expect("write pdf");

    let text = PdfTextExtractor::new()
        .extract(&pdf_path)
        .await
        .expect("generated PDF should extract");

    assert!(text.contains("Introduction"), "got: {text:?}");
    assert_eq!(
        locate_introduction(&text).as_deref(),
        Some("We study things carefully.")
    );
}

#[tokio::test]
async fn test_collect_writes_only_qualifying_records() {
    let server = MockServer::start().await;
    let uri = server.uri();
    let feed = atom_feed(
        4,
        &[
            atom_entry("2401.00001v1", "Good One", "First abstract.", &uri),
            atom_entry("2401.00002v1", "Unreachable", "Second abstract.", &uri),
            atom_entry("2401.00003v1", "No Intro", "Third abstract.", &uri),
            atom_entry("2401.00004v1", "Good Two", "Fourth abstract.", &uri),
        ],
    );
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed))
        .mount(&server)
        .await;
    mount_pdf(&server, "2401.00001v1", 200, pdf_with_lines(PAPER_WITH_INTRO)).await;
    mount_pdf(&server, "2401.00002v1", 500, Vec::new()).await;
    mount_pdf(&server, "2401.00003v1", 200, pdf_with_lines(PAPER_WITHOUT_INTRO)).await;
    mount_pdf(&server, "2401.00004v1", 200, pdf_with_lines(PAPER_WITH_INTRO)).await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let cache = DocumentCache::new(temp_dir.path().join("raw").join("pdfs"));
    let output = temp_dir.path().join("processed").join("run.jsonl");

    let source = ArxivSource::with_base_url(&format!("{uri}/api/query"), Duration::ZERO)
        .expect("source");
    let fetcher = HttpFetcher::new(
        cache.clone(),
        RetryPolicy::new(3, Duration::from_millis(10)),
        Duration::from_secs(5),
    )
    .expect("fetcher");
    let sink = JsonlSink::create(&output).await.expect("sink");
    let config = CollectorConfig {
        target: 2,
        backoff_delay: Duration::ZERO,
        max_empty_pages: Some(3),
        ..CollectorConfig::default()
    };

    let mut controller =
        CollectionController::new(config, source, fetcher, PdfTextExtractor::new(), sink);
    let report = controller.run().await.expect("run should succeed");

    assert_eq!(report.outcome, RunOutcome::TargetReached);
    assert_eq!(report.stats.collected, 2);
    assert_eq!(report.stats.fetch_failures, 1);
    assert_eq!(report.stats.rejections, 1);

    let records: Vec<ExtractedRecord> = std::fs::read_to_string(&output)
        .expect("read output")
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid record line"))
        .collect();
    let ids: Vec<&str> = records.iter().map(|r| r.identifier.as_str()).collect();
    assert_eq!(ids, vec!["2401.00001v1", "2401.00004v1"]);
    for record in &records {
        assert!(!record.abstract_text.is_empty());
        assert_eq!(record.introduction.as_deref(), Some("We study things carefully."));
        assert!(record.document_path.ends_with(".pdf"));
    }

    // Failed download left nothing behind; the rejected paper stays cached.
    assert!(cache.lookup("2401.00002v1").await.is_none());
    assert!(cache.lookup("2401.00003v1").await.is_some());
}
