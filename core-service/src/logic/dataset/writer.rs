use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use chrono::Utc;
use parking_lot::Mutex;

use crate::logic::dataset::record::DatasetRecord;

pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

pub struct DatasetWriter {
    file: Mutex<Option<File>>,
    base_dir: PathBuf,
    max_file_size: u64,
    /// Keeps file names unique when several rotate within one second
    sequence: AtomicU32,
}

impl DatasetWriter {
    pub fn new() -> Self {
        Self::from_path(super::get_dataset_dir())
    }

    pub fn from_path(base_dir: PathBuf) -> Self {
        Self::with_max_size(base_dir, MAX_FILE_SIZE)
    }

    pub fn with_max_size(base_dir: PathBuf, max_file_size: u64) -> Self {
        if let Err(e) = fs::create_dir_all(&base_dir) {
            log::error!("Failed to create dataset directory {}: {}", base_dir.display(), e);
        }

        Self {
            file: Mutex::new(None),
            base_dir,
            max_file_size,
            sequence: AtomicU32::new(0),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Append record to dataset log
    /// Handles file rotation automatically
    pub fn append(&self, record: &DatasetRecord) -> io::Result<()> {
        let mut file_guard = self.file.lock();

        // If file not open, try to continue the latest one
        if file_guard.is_none() {
            let reusable = match self.find_latest_log_file()? {
                Some(path) => {
                    let f = OpenOptions::new().create(true).append(true).open(&path)?;
                    (f.metadata()?.len() < self.max_file_size).then_some(f)
                }
                None => None,
            };
            *file_guard = Some(match reusable {
                Some(f) => f,
                None => self.create_new_file()?,
            });
        }

        // Rotate when the open file filled up during this run
        let should_rotate = match file_guard.as_ref() {
            Some(f) => f.metadata()?.len() >= self.max_file_size,
            None => false,
        };

        if should_rotate {
            *file_guard = Some(self.create_new_file()?);
        }

        if let Some(file) = file_guard.as_mut() {
            let json = serde_json::to_string(record)?;
            writeln!(file, "{}", json)?;
        }

        Ok(())
    }

    /// (file count, total size in MB, latest file name)
    pub fn get_stats(&self) -> io::Result<(usize, f32, String)> {
        let files = list_dataset_files(&self.base_dir)?;
        let size: u64 = files
            .iter()
            .filter_map(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .sum();

        let latest_file = files
            .last()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("None")
            .to_string();

        Ok((files.len(), size as f32 / 1024.0 / 1024.0, latest_file))
    }

    fn create_new_file(&self) -> io::Result<File> {
        let now = Utc::now();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        // timestamp format: YYYY-MM-DD-HHMMSS-NNNN
        let filename = format!("dataset-{}-{:04}.jsonl", now.format("%Y-%m-%d-%H%M%S"), seq);
        let path = self.base_dir.join(filename);
        log::debug!("Opening new dataset file {}", path.display());

        OpenOptions::new().create(true).append(true).open(path)
    }

    fn find_latest_log_file(&self) -> io::Result<Option<PathBuf>> {
        Ok(list_dataset_files(&self.base_dir)?.pop())
    }
}

impl Default for DatasetWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Every `.jsonl` file in `dir`, sorted by name (timestamp ensures order)
pub fn list_dataset_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .filter_map(|res| res.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "jsonl"))
        .collect::<Vec<_>>();

    entries.sort();
    Ok(entries)
}
