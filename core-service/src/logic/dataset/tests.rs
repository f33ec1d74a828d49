use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

use super::collector::{collect, read_url_list, LabelledUrl};
use super::export::{to_csv, to_jsonl};
use super::record::{DatasetRecord, LABEL_LEGITIMATE, LABEL_PHISHING};
use super::writer::{list_dataset_files, DatasetWriter};
use crate::logic::config::EvaluatorConfig;
use crate::logic::evaluator::Pipeline;
use crate::logic::features::{Assembler, FeatureVector, FULL_SCHEMA, TOP20_SCHEMA};
use crate::logic::render::http::HttpSession;
use crate::logic::render::{RenderError, RenderSession, Renderer};
use crate::logic::reputation::{FetchedPage, Lookups, Registration, ReputationError};

fn record(url: &str, label: u8) -> DatasetRecord {
    DatasetRecord::new(url, label, FeatureVector::defaults(&TOP20_SCHEMA))
}

fn read_records(dir: &std::path::Path) -> Vec<DatasetRecord> {
    list_dataset_files(dir)
        .unwrap()
        .iter()
        .flat_map(|p| {
            fs::read_to_string(p)
                .unwrap()
                .lines()
                .map(|l| serde_json::from_str::<DatasetRecord>(l).unwrap())
                .collect::<Vec<_>>()
        })
        .collect()
}

#[test]
fn test_dataset_append_and_read() {
    let dir = tempdir().unwrap();
    let writer = DatasetWriter::from_path(dir.path().to_path_buf());

    writer.append(&record("https://a.example/", LABEL_PHISHING)).unwrap();

    let files = list_dataset_files(dir.path()).unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].extension().unwrap() == "jsonl");

    let records = read_records(dir.path());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, "https://a.example/");
    assert_eq!(records[0].label, LABEL_PHISHING);
    assert_eq!(records[0].schema, "top20");
    assert_eq!(records[0].layout_hash, TOP20_SCHEMA.layout_hash());
    assert_eq!(records[0].features.len(), 20);
}

#[test]
fn test_rotation_creates_new_file() {
    let dir = tempdir().unwrap();
    // every record overflows the limit, so each append after the first rotates
    let writer = DatasetWriter::with_max_size(dir.path().to_path_buf(), 16);

    for i in 0..3 {
        writer.append(&record(&format!("https://{}.example/", i), LABEL_LEGITIMATE)).unwrap();
    }

    assert_eq!(list_dataset_files(dir.path()).unwrap().len(), 3);
    assert_eq!(read_records(dir.path()).len(), 3);

    let (count, _size, latest) = writer.get_stats().unwrap();
    assert_eq!(count, 3);
    assert!(latest.starts_with("dataset-"));
}

#[test]
fn test_new_writer_continues_latest_file() {
    let dir = tempdir().unwrap();
    DatasetWriter::from_path(dir.path().to_path_buf())
        .append(&record("https://one.example/", LABEL_PHISHING))
        .unwrap();
    DatasetWriter::from_path(dir.path().to_path_buf())
        .append(&record("https://two.example/", LABEL_PHISHING))
        .unwrap();

    assert_eq!(list_dataset_files(dir.path()).unwrap().len(), 1);
    assert_eq!(read_records(dir.path()).len(), 2);
}

#[test]
fn test_csv_export_skips_foreign_layouts() {
    let dir = tempdir().unwrap();
    let writer = DatasetWriter::from_path(dir.path().join("data"));

    writer.append(&record("https://a.example/", LABEL_PHISHING)).unwrap();
    writer
        .append(&DatasetRecord::new(
            "https://full.example/",
            LABEL_LEGITIMATE,
            FeatureVector::defaults(&FULL_SCHEMA),
        ))
        .unwrap();
    writer.append(&record("https://b.example/?q=1,2", LABEL_LEGITIMATE)).unwrap();

    // a truncated line from an interrupted run
    let latest = list_dataset_files(writer.base_dir()).unwrap().pop().unwrap();
    let mut content = fs::read_to_string(&latest).unwrap();
    content.push_str("{\"timestamp\":\n");
    fs::write(&latest, content).unwrap();

    let target = dir.path().join("dataset.csv");
    let summary = to_csv(writer.base_dir(), &target, &TOP20_SCHEMA).unwrap();
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.skipped, 2);

    let csv = fs::read_to_string(&target).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);

    let header: Vec<&str> = lines[0].split(',').collect();
    assert_eq!(header.len(), 22);
    assert_eq!(header[0], TOP20_SCHEMA.name_at(0).unwrap());
    assert_eq!(&header[20..], &["url", "label"]);

    assert!(lines[1].ends_with(",https://a.example/,1"));
    assert!(lines[2].ends_with(",\"https://b.example/?q=1,2\",0"));
}

#[test]
fn test_jsonl_export_merges_files() {
    let dir = tempdir().unwrap();
    let writer = DatasetWriter::with_max_size(dir.path().join("data"), 16);
    writer.append(&record("https://a.example/", LABEL_PHISHING)).unwrap();
    writer.append(&record("https://b.example/", LABEL_LEGITIMATE)).unwrap();

    let target = dir.path().join("merged.jsonl");
    assert_eq!(to_jsonl(writer.base_dir(), &target).unwrap(), 2);
    assert_eq!(fs::read_to_string(&target).unwrap().lines().count(), 2);

    assert!(to_jsonl(&dir.path().join("missing"), &target).is_err());
}

#[test]
fn test_read_url_list_skips_comments() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("phishing.txt");
    fs::write(&path, "# feed export\nhttps://a.example/\n\n  https://b.example/  \n").unwrap();

    let urls = read_url_list(&path, LABEL_PHISHING).unwrap();
    assert_eq!(
        urls,
        vec![
            LabelledUrl { url: "https://a.example/".into(), label: LABEL_PHISHING },
            LabelledUrl { url: "https://b.example/".into(), label: LABEL_PHISHING },
        ]
    );
}

// ---- collection run ------------------------------------------------------

/// Serves a fixed page, except for hosts containing "down"
struct FixtureRenderer;

impl Renderer for FixtureRenderer {
    fn render(&self, url: &str, _timeout: Duration) -> Result<Box<dyn RenderSession>, RenderError> {
        if url.contains("down") {
            return Err(RenderError::Navigation(format!("{} unreachable", url)));
        }
        let page = "<html><head><title>Sign in</title></head><body>\
            <form action=\"/login\"><input type=\"password\" name=\"pw\"></form></body></html>";
        Ok(Box::new(HttpSession::new(url.to_string(), page.to_string())))
    }
}

struct OfflineLookups;

impl Lookups for OfflineLookups {
    fn registration(&self, _domain: &str) -> Result<Registration, ReputationError> {
        Err(ReputationError::Network("offline".into()))
    }
    fn fetch_page(&self, _url: &str) -> Result<FetchedPage, ReputationError> {
        Err(ReputationError::Network("offline".into()))
    }
    fn traffic_rank(&self, _url: &str) -> Result<Option<u64>, ReputationError> {
        Err(ReputationError::Network("offline".into()))
    }
    fn page_rank(&self, _domain: &str) -> Result<Option<u64>, ReputationError> {
        Err(ReputationError::Network("offline".into()))
    }
    fn index_presence(&self, _url: &str) -> Result<bool, ReputationError> {
        Err(ReputationError::Network("offline".into()))
    }
    fn resolve_host(&self, _host: &str) -> Result<Vec<std::net::IpAddr>, ReputationError> {
        Err(ReputationError::Network("offline".into()))
    }
}

#[test]
fn test_collect_tallies_and_writes_records() {
    let dir = tempdir().unwrap();
    let pipeline = Pipeline::new(
        Arc::new(FixtureRenderer),
        Arc::new(OfflineLookups),
        Assembler::new(&FULL_SCHEMA),
        EvaluatorConfig {
            load_wait: Duration::ZERO,
            ..EvaluatorConfig::default()
        },
    );

    let mut urls: Vec<LabelledUrl> = (0..6)
        .map(|i| LabelledUrl { url: format!("https://phish{}.example/", i), label: LABEL_PHISHING })
        .collect();
    urls.extend((0..3).map(|i| LabelledUrl {
        url: format!("https://shop{}.example/", i),
        label: LABEL_LEGITIMATE,
    }));
    urls.push(LabelledUrl { url: "https://down.example/".into(), label: LABEL_PHISHING });

    let writer = DatasetWriter::from_path(dir.path().to_path_buf());
    let tally = collect(&pipeline, urls, 4, &writer);

    assert_eq!(tally.phishing, 6);
    assert_eq!(tally.legitimate, 3);
    assert_eq!(tally.failed, 1);
    assert_eq!(tally.write_errors, 0);
    assert_eq!(tally.total(), 10);

    let records = read_records(dir.path());
    assert_eq!(records.len(), 9);
    assert!(records.iter().all(|r| r.features.len() == FULL_SCHEMA.len()));
    assert!(records.iter().all(|r| r.layout_hash == FULL_SCHEMA.layout_hash()));
    assert_eq!(records.iter().filter(|r| r.label == LABEL_PHISHING).count(), 6);

    let (files, _size, _latest) = writer.get_stats().unwrap();
    assert_eq!(files, 1);
}

#[test]
fn test_collect_with_no_urls() {
    let dir = tempdir().unwrap();
    let pipeline = Pipeline::new(
        Arc::new(FixtureRenderer),
        Arc::new(OfflineLookups),
        Assembler::new(&TOP20_SCHEMA),
        EvaluatorConfig::default(),
    );

    let tally = collect(&pipeline, Vec::new(), 0, &DatasetWriter::from_path(dir.path().to_path_buf()));
    assert_eq!(tally.total(), 0);
}
