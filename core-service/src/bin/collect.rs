//! Training data collection CLI
//!
//! `collect run` renders every URL in the labelled lists and appends one
//! record per page to the dataset directory. `collect export` merges the
//! dataset files into a single CSV (or JSONL) for training.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use phishguard_core::logic::config::EvaluatorConfig;
use phishguard_core::logic::dataset::{self, export, DatasetWriter, LABEL_LEGITIMATE, LABEL_PHISHING};
use phishguard_core::logic::evaluator::Pipeline;
use phishguard_core::logic::features::{Assembler, FeatureSchema};
use phishguard_core::logic::render::HttpRenderer;
use phishguard_core::logic::reputation::HttpLookups;

#[derive(Parser)]
#[command(name = "collect")]
#[command(about = "Collect phishing / legitimate feature vectors for training")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract features for labelled URL lists
    Run {
        /// File with one phishing URL per line
        #[arg(long)]
        phishing: Option<PathBuf>,

        /// File with one legitimate URL per line
        #[arg(long)]
        legitimate: Option<PathBuf>,

        /// Parallel render workers
        #[arg(long, default_value_t = 4)]
        workers: usize,

        /// Dataset directory (defaults to the local data dir)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Feature schema to record (`full` or `top20`)
        #[arg(long, default_value = "full")]
        schema: String,
    },

    /// Merge dataset files into one training file
    Export {
        /// Dataset directory (defaults to the local data dir)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Target file; `.jsonl` merges raw records, anything else writes CSV
        target: PathBuf,

        /// Feature schema of the CSV columns
        #[arg(long, default_value = "full")]
        schema: String,
    },
}

fn schema_by_name(name: &str) -> Result<&'static FeatureSchema> {
    match FeatureSchema::by_name(name) {
        Some(schema) => Ok(schema),
        None => bail!("unknown feature schema '{}'", name),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            phishing,
            legitimate,
            workers,
            output,
            schema,
        } => {
            let schema = schema_by_name(&schema)?;

            let mut urls = Vec::new();
            if let Some(path) = &phishing {
                urls.extend(
                    dataset::read_url_list(path, LABEL_PHISHING)
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                );
            }
            if let Some(path) = &legitimate {
                urls.extend(
                    dataset::read_url_list(path, LABEL_LEGITIMATE)
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                );
            }
            if urls.is_empty() {
                bail!("no URLs to collect; pass --phishing and/or --legitimate");
            }

            let config = EvaluatorConfig::from_env();
            let pipeline = Pipeline::new(
                Arc::new(HttpRenderer::new()),
                Arc::new(HttpLookups::new(config.reputation.clone())),
                Assembler::new(schema),
                config,
            );
            let writer = DatasetWriter::from_path(output.unwrap_or_else(dataset::get_dataset_dir));
            log::info!("Writing {} v{} records to {}", schema.name, schema.version, writer.base_dir().display());

            let tally = dataset::collect(&pipeline, urls, workers, &writer);
            println!("{}", serde_json::to_string_pretty(&tally)?);

            let (files, size_mb, latest) = writer
                .get_stats()
                .with_context(|| format!("Failed to inspect {}", writer.base_dir().display()))?;
            log::info!("Dataset now holds {} files ({:.2} MB), latest {}", files, size_mb, latest);
        }

        Commands::Export { source, target, schema } => {
            let source = source.unwrap_or_else(dataset::get_dataset_dir);

            if target.extension().is_some_and(|ext| ext == "jsonl") {
                let files = export::to_jsonl(&source, &target)
                    .with_context(|| format!("Failed to export {}", source.display()))?;
                println!("Merged {} files into {}", files, target.display());
            } else {
                let summary = export::to_csv(&source, &target, schema_by_name(&schema)?)
                    .with_context(|| format!("Failed to export {}", source.display()))?;
                println!(
                    "Wrote {} rows to {} ({} skipped)",
                    summary.rows,
                    target.display(),
                    summary.skipped
                );
            }
        }
    }

    Ok(())
}
