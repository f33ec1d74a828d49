use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::logic::dataset::record::DatasetRecord;
use crate::logic::dataset::writer::list_dataset_files;
use crate::logic::features::FeatureSchema;

/// Rows written and lines left out of a CSV export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub rows: usize,
    /// Unparseable lines or records from another layout
    pub skipped: usize,
}

/// Merge all dataset files into a single JSONL file
/// Returns the number of source files merged
pub fn to_jsonl(source_dir: &Path, target_path: &Path) -> io::Result<usize> {
    if !source_dir.exists() {
        return Err(io::Error::new(io::ErrorKind::NotFound, "Dataset directory not found"));
    }

    let paths = list_dataset_files(source_dir)?;
    let mut output_file = File::create(target_path)?;

    for path in &paths {
        let content = fs::read(path)?;
        output_file.write_all(&content)?;

        // Ensure newline between files
        if content.last().is_some_and(|&b| b != b'\n') {
            output_file.write_all(b"\n")?;
        }
    }

    output_file.flush()?;
    log::info!("Exported {} dataset files to {}", paths.len(), target_path.display());
    Ok(paths.len())
}

/// Merge all dataset files into one CSV: one column per feature of
/// `schema`, then `url` and `label`.
///
/// Records written under a different layout are skipped, never realigned.
pub fn to_csv(source_dir: &Path, target_path: &Path, schema: &FeatureSchema) -> io::Result<ExportSummary> {
    if !source_dir.exists() {
        return Err(io::Error::new(io::ErrorKind::NotFound, "Dataset directory not found"));
    }

    let layout_hash = schema.layout_hash();
    let mut out = BufWriter::new(File::create(target_path)?);
    let mut summary = ExportSummary::default();

    let mut header: Vec<String> = schema.names().map(str::to_string).collect();
    header.push("url".to_string());
    header.push("label".to_string());
    write_row(&mut out, &header)?;

    for path in list_dataset_files(source_dir)? {
        for line in BufReader::new(File::open(&path)?).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let record: DatasetRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("Skipping malformed line in {}: {}", path.display(), e);
                    summary.skipped += 1;
                    continue;
                }
            };

            if record.layout_hash != layout_hash || record.features.len() != schema.len() {
                log::warn!(
                    "Skipping {} recorded with layout {} v{} ({:08x})",
                    record.url,
                    record.schema,
                    record.feature_version,
                    record.layout_hash
                );
                summary.skipped += 1;
                continue;
            }

            let mut row: Vec<String> = record.features.iter().map(|v| v.to_string()).collect();
            row.push(record.url);
            row.push(record.label.to_string());
            write_row(&mut out, &row)?;
            summary.rows += 1;
        }
    }

    out.flush()?;
    log::info!(
        "Exported {} rows to {} ({} skipped)",
        summary.rows,
        target_path.display(),
        summary.skipped
    );
    Ok(summary)
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV row
fn write_row<W: Write>(w: &mut W, row: &[String]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\n")
}
