use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::classifier::LevelClassifier;
use crate::cli::BatchArgs;
use crate::commands::inventory;
use crate::layout::command_version;
use crate::model::{
    BatchCounts, BatchRunManifest, FailedDocument, Outline, SourceEntry, ToolVersions,
};
use crate::outline::{OutlinePipeline, assemble_outline, failed_outline};
use crate::util::{
    ensure_directory, file_stem, now_utc_string, utc_compact_string, write_json_pretty,
};


#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOutcome<T> {
    Processed { path: PathBuf, value: T },
    Failed { path: PathBuf, error: String },
}

impl<T> DocumentOutcome<T> {
    pub fn path(&self) -> &Path {
        match self {
            Self::Processed { path, .. } | Self::Failed { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport<T> {
    pub outcomes: Vec<DocumentOutcome<T>>,
}

impl<T> BatchReport<T> {
    pub fn processed(&self) -> impl Iterator<Item = (&Path, &T)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            DocumentOutcome::Processed { path, value } => Some((path.as_path(), value)),
            DocumentOutcome::Failed { .. } => None,
        })
    }

    pub fn processed_count(&self) -> usize {
        self.processed().count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.processed_count()
    }

    pub fn failures(&self) -> Vec<FailedDocument> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                DocumentOutcome::Failed { path, error } => Some(FailedDocument {
                    filename: path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    error: error.clone(),
                }),
                DocumentOutcome::Processed { .. } => None,
            })
            .collect()
    }
}

pub fn run_batch<T, F>(paths: &[PathBuf], mut process: F) -> BatchReport<T>
where
    F: FnMut(&Path) -> Result<T>,
{
    let outcomes = paths
        .iter()
        .map(|path| match process(path) {
            Ok(value) => DocumentOutcome::Processed {
                path: path.clone(),
                value,
            },
            Err(err) => {
                let error = format!("{err:#}");
                warn!(path = %path.display(), error = %error, "document failed");
                DocumentOutcome::Failed {
                    path: path.clone(),
                    error,
                }
            }
        })
        .collect();

    BatchReport { outcomes }
}

// a source that cannot be hashed fails like any other document
pub fn run_hashed_batch<T, F>(
    paths: &[PathBuf],
    mut process: F,
) -> (BatchReport<T>, Vec<SourceEntry>)
where
    F: FnMut(&Path) -> Result<T>,
{
    let mut source_hashes = Vec::new();
    let report = run_batch(paths, |path| {
        source_hashes.push(inventory::source_entry(path)?);
        process(path)
    });

    (report, source_hashes)
}

pub fn output_path(output_dir: &Path, source: &Path, suffix: &str) -> PathBuf {
    output_dir.join(format!("{}.{suffix}", file_stem(source)))
}

pub fn outline_for_outcome(outcome: &DocumentOutcome<Outline>) -> Outline {
    match outcome {
        DocumentOutcome::Processed { value, .. } => value.clone(),
        DocumentOutcome::Failed { path, error } => failed_outline(path, error),
    }
}

pub fn count_outlines(report: &BatchReport<Outline>, pdf_count: usize) -> BatchCounts {
    BatchCounts {
        pdf_count,
        processed_count: report.processed_count(),
        failed_count: report.failed_count(),
        heading_count: report
            .processed()
            .map(|(_, outline)| outline.outline.len())
            .sum(),
        empty_outline_count: report
            .processed()
            .filter(|(_, outline)| outline.outline.is_empty())
            .count(),
    }
}

pub fn run(args: BatchArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    // the bundle is loaded before any document is touched; a bad bundle aborts the run
    let classifier = LevelClassifier::load(&args.model)?;
    let pipeline = OutlinePipeline::new(args.pipeline.config())?;

    ensure_directory(&args.output_dir)?;
    let pdfs = inventory::discover_pdfs(&args.input_dir)?;

    info!(
        run_id = %run_id,
        input_dir = %args.input_dir.display(),
        pdf_count = pdfs.len(),
        markdown_source = args.pipeline.markdown_source.as_str(),
        "starting batch"
    );

    let (report, source_hashes) = run_hashed_batch(&pdfs, |path| {
        let annotated = pipeline.annotate_pdf(path)?;
        assemble_outline(&annotated, &classifier)
    });

    for outcome in &report.outcomes {
        let destination = output_path(&args.output_dir, outcome.path(), "json");
        write_json_pretty(&destination, &outline_for_outcome(outcome))?;
    }

    let counts = count_outlines(&report, pdfs.len());
    let manifest = BatchRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: if counts.failed_count == 0 {
            "completed".to_string()
        } else {
            "completed_with_failures".to_string()
        },
        started_at,
        updated_at: now_utc_string(),
        input_dir: args.input_dir.display().to_string(),
        output_dir: args.output_dir.display().to_string(),
        model_path: args.model.display().to_string(),
        tool_versions: collect_tool_versions(),
        counts,
        source_hashes,
        failures: report.failures(),
    };

    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        args.output_dir
            .join(format!("batch_run_{}.json", utc_compact_string(started_ts)))
    });
    write_json_pretty(&manifest_path, &manifest)?;

    info!(
        run_id = %run_id,
        processed = manifest.counts.processed_count,
        failed = manifest.counts.failed_count,
        headings = manifest.counts.heading_count,
        manifest = %manifest_path.display(),
        "batch completed"
    );

    Ok(())
}

fn collect_tool_versions() -> ToolVersions {
    ToolVersions {
        pdf_outline: env!("CARGO_PKG_VERSION").to_string(),
        pdftotext: command_version("pdftotext", &["-v"]),
        pdftohtml: command_version("pdftohtml", &["-v"]),
    }
}
