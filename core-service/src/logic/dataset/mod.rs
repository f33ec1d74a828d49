//! Dataset Module - Training Data Collection
//!
//! Turns labelled URL lists into versioned feature vectors for offline
//! training. Stores data in JSONL format with automatic rotation and exports
//! a single CSV for the training scripts.

pub mod collector;
pub mod export;
pub mod record;
pub mod writer;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

pub use collector::{collect, read_url_list, CollectionTally, LabelledUrl};
pub use record::{DatasetRecord, LABEL_LEGITIMATE, LABEL_PHISHING};
pub use writer::DatasetWriter;

/// Get the base directory for dataset storage
pub fn get_dataset_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("phishguard")
        .join("dataset")
}
