//! Offline collection: labelled URL lists -> versioned JSONL records
//!
//! N workers pull URLs from a shared queue and run the extraction pipeline
//! (no classification). Records and, at the end, each worker's tally go to
//! a single writer thread over one channel; nothing else is shared.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::mpsc;

use parking_lot::Mutex;
use serde::Serialize;

use super::record::{DatasetRecord, LABEL_PHISHING};
use super::writer::DatasetWriter;
use crate::logic::evaluator::Pipeline;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelledUrl {
    pub url: String,
    pub label: u8,
}

/// One URL per line; blank lines and `#` comments are ignored
pub fn read_url_list(path: &Path, label: u8) -> io::Result<Vec<LabelledUrl>> {
    let file = std::fs::File::open(path)?;
    let mut urls = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let url = line.trim();
        if url.is_empty() || url.starts_with('#') {
            continue;
        }
        urls.push(LabelledUrl {
            url: url.to_string(),
            label,
        });
    }
    Ok(urls)
}

/// Outcome counts of a collection run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionTally {
    pub phishing: u64,
    pub legitimate: u64,
    /// Render failures
    pub failed: u64,
    /// Records extracted but not persisted
    pub write_errors: u64,
}

impl CollectionTally {
    pub fn merge(&mut self, other: &CollectionTally) {
        self.phishing += other.phishing;
        self.legitimate += other.legitimate;
        self.failed += other.failed;
        self.write_errors += other.write_errors;
    }

    pub fn total(&self) -> u64 {
        self.phishing + self.legitimate + self.failed
    }
}

enum Message {
    Record(DatasetRecord),
    Done(CollectionTally),
}

/// Run every URL through `pipeline` on `workers` threads and persist the
/// results through `writer`
pub fn collect(pipeline: &Pipeline, urls: Vec<LabelledUrl>, workers: usize, writer: &DatasetWriter) -> CollectionTally {
    let workers = workers.max(1);
    let total = urls.len();
    let queue = Mutex::new(VecDeque::from(urls));
    let (tx, rx) = mpsc::channel::<Message>();

    log::info!("Collecting {} URLs with {} workers", total, workers);

    std::thread::scope(|scope| {
        let writer_handle = scope.spawn(move || {
            let mut tally = CollectionTally::default();
            let mut written = 0usize;

            for message in rx {
                match message {
                    Message::Record(record) => match writer.append(&record) {
                        Ok(()) => {
                            written += 1;
                            if written % 100 == 0 {
                                log::info!("{}/{} records written", written, total);
                            }
                        }
                        Err(e) => {
                            log::error!("Failed to append {} to dataset: {}", record.url, e);
                            tally.write_errors += 1;
                        }
                    },
                    Message::Done(worker_tally) => tally.merge(&worker_tally),
                }
            }

            tally
        });

        for worker_id in 0..workers {
            let tx = tx.clone();
            let queue = &queue;
            scope.spawn(move || {
                let mut tally = CollectionTally::default();

                loop {
                    let Some(job) = queue.lock().pop_front() else {
                        break;
                    };

                    match pipeline.extract_features(&job.url) {
                        Ok(vector) => {
                            if job.label == LABEL_PHISHING {
                                tally.phishing += 1;
                            } else {
                                tally.legitimate += 1;
                            }
                            let _ = tx.send(Message::Record(DatasetRecord::new(&job.url, job.label, vector)));
                        }
                        Err(e) => {
                            log::warn!("[worker {}] {} failed: {}", worker_id, job.url, e);
                            tally.failed += 1;
                        }
                    }
                }

                let _ = tx.send(Message::Done(tally));
            });
        }

        // the writer stops once every worker's sender is gone
        drop(tx);

        match writer_handle.join() {
            Ok(tally) => tally,
            Err(_) => {
                log::error!("Dataset writer thread panicked");
                CollectionTally::default()
            }
        }
    })
}
