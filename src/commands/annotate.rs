use anyhow::Result;
use tracing::info;

use crate::cli::AnnotateArgs;
use crate::commands::batch::{DocumentOutcome, output_path, run_batch};
use crate::commands::inventory;
use crate::outline::{OutlinePipeline, failed_annotation};
use crate::util::{ensure_directory, write_json_pretty};

pub fn run(args: AnnotateArgs) -> Result<()> {
    let pipeline = OutlinePipeline::new(args.pipeline.config())?;

    ensure_directory(&args.output_dir)?;
    let pdfs = inventory::discover_pdfs(&args.input_dir)?;
    info!(
        input_dir = %args.input_dir.display(),
        pdf_count = pdfs.len(),
        "starting annotation"
    );

    let report = run_batch(&pdfs, |path| pipeline.annotate_pdf(path));

    for outcome in &report.outcomes {
        let destination = output_path(&args.output_dir, outcome.path(), "json");
        match outcome {
            DocumentOutcome::Processed { value, .. } => write_json_pretty(&destination, value)?,
            DocumentOutcome::Failed { path, error } => {
                write_json_pretty(&destination, &failed_annotation(path, error))?
            }
        }
    }

    info!(
        processed = report.processed_count(),
        failed = report.failed_count(),
        output_dir = %args.output_dir.display(),
        "annotation completed"
    );

    Ok(())
}
