use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::classifier::LevelClassifier;
use crate::cli::PredictArgs;
use crate::commands::batch::{output_path, run_batch};
use crate::commands::inventory;
use crate::model::AnnotatedOutline;
use crate::outline::assemble_outline;
use crate::util::{ensure_directory, write_json_pretty};

pub fn run(args: PredictArgs) -> Result<()> {
    let classifier = LevelClassifier::load(&args.model)?;

    ensure_directory(&args.output_dir)?;
    let annotated_files = inventory::discover_annotated(&args.annotated_dir)?;
    info!(
        annotated_dir = %args.annotated_dir.display(),
        file_count = annotated_files.len(),
        "starting prediction"
    );

    let report = run_batch(&annotated_files, |path| {
        predict_file(&classifier, path, &args.output_dir)
    });

    info!(
        processed = report.processed_count(),
        failed = report.failed_count(),
        headings = report.processed().map(|(_, headings)| *headings).sum::<usize>(),
        output_dir = %args.output_dir.display(),
        "prediction completed"
    );

    Ok(())
}

fn predict_file(classifier: &LevelClassifier, path: &Path, output_dir: &Path) -> Result<usize> {
    let destination = output_path(output_dir, path, "json");
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read annotated outline: {}", path.display()))?;
    let annotated: AnnotatedOutline = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse annotated outline: {}", path.display()))?;

    if annotated.outline.is_empty() {
        debug!(path = %path.display(), "empty outline copied through");
        fs::copy(path, &destination).with_context(|| {
            format!(
                "failed to copy {} to {}",
                path.display(),
                destination.display()
            )
        })?;
        return Ok(0);
    }

    let outline = assemble_outline(&annotated, classifier)?;
    write_json_pretty(&destination, &outline)?;
    Ok(outline.outline.len())
}
