use anyhow::Result;
use tracing::info;

use crate::classifier::LevelClassifier;
use crate::cli::OutlineArgs;
use crate::outline::{OutlinePipeline, assemble_outline, recover_outline};
use crate::util::emit_json;

pub fn run(args: OutlineArgs) -> Result<()> {
    let classifier = LevelClassifier::load(&args.model)?;
    let pipeline = OutlinePipeline::new(args.pipeline.config())?;

    let outline = pipeline
        .annotate_pdf(&args.pdf)
        .and_then(|annotated| assemble_outline(&annotated, &classifier))
        .unwrap_or_else(|err| recover_outline(&args.pdf, err));

    emit_json(args.output.as_deref(), &outline)?;
    info!(
        path = %args.pdf.display(),
        title = %outline.title,
        headings = outline.outline.len(),
        "outline completed"
    );

    Ok(())
}
