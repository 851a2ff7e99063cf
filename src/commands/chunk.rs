use anyhow::Result;
use tracing::info;

use crate::classifier::LevelClassifier;
use crate::cli::ChunkArgs;
use crate::layout::DocumentLayout;
use crate::outline::{OutlinePipeline, assemble_outline, recover_outline};
use crate::sections::build_sections;
use crate::util::emit_json;

pub fn run(args: ChunkArgs) -> Result<()> {
    let classifier = LevelClassifier::load(&args.model)?;
    let pipeline = OutlinePipeline::new(args.pipeline.config())?;

    let document = match pipeline
        .annotate_with_layout(&args.pdf)
        .and_then(|(layout, annotated)| Ok((assemble_outline(&annotated, &classifier)?, layout)))
    {
        Ok((outline, layout)) => build_sections(&layout, &outline),
        Err(err) => {
            let outline = recover_outline(&args.pdf, err);
            build_sections(&DocumentLayout::default(), &outline)
        }
    };

    emit_json(args.output.as_deref(), &document)?;
    info!(
        path = %args.pdf.display(),
        sections = document.sections.len(),
        chunks = document.chunks.len(),
        "chunking completed"
    );

    Ok(())
}
