use anyhow::Result;
use tracing::info;

use crate::cli::FeaturesArgs;
use crate::commands::batch::{output_path, run_batch};
use crate::commands::inventory;
use crate::outline::{OutlinePipeline, PipelineConfig};
use crate::util::{ensure_directory, write_json_pretty};

pub fn run(args: FeaturesArgs) -> Result<()> {
    let pipeline = OutlinePipeline::new(PipelineConfig {
        max_pages: args.max_pages,
        ..PipelineConfig::default()
    })?;

    ensure_directory(&args.output_dir)?;
    let pdfs = inventory::discover_pdfs(&args.input_dir)?;
    info!(
        input_dir = %args.input_dir.display(),
        pdf_count = pdfs.len(),
        "starting feature export"
    );

    let report = run_batch(&pdfs, |path| {
        let layout = pipeline.load_layout(path)?;
        let rows = pipeline.extractor().generate_feature_rows(&layout);
        write_json_pretty(&output_path(&args.output_dir, path, "features.json"), &rows)?;
        Ok(rows.len())
    });

    info!(
        processed = report.processed_count(),
        failed = report.failed_count(),
        rows = report.processed().map(|(_, rows)| *rows).sum::<usize>(),
        output_dir = %args.output_dir.display(),
        "feature export completed"
    );

    Ok(())
}
