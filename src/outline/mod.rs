use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::classifier::LevelClassifier;
use crate::cli::MarkdownSource;
use crate::layout::{self, DocumentLayout};
use crate::model::{AnnotatedEntry, AnnotatedOutline, Outline};

mod features;
mod headers;
mod linguistic;
mod markdown;
mod reconcile;
mod style;
#[cfg(test)]
mod tests;
mod title;

pub use features::{FeatureColumn, FeatureExtractor, FeatureRow};
pub use title::filename_title;

use headers::HeaderDetector;
use markdown::MarkdownDocument;

pub const DEFAULT_SIMILARITY_CUTOFF: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub markdown_source: MarkdownSource,
    pub similarity_cutoff: f64,
    pub max_pages: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            markdown_source: MarkdownSource::Structural,
            similarity_cutoff: DEFAULT_SIMILARITY_CUTOFF,
            max_pages: None,
        }
    }
}

pub struct OutlinePipeline {
    config: PipelineConfig,
    extractor: FeatureExtractor,
    detector: HeaderDetector,
}

impl OutlinePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Ok(Self {
            config,
            extractor: FeatureExtractor::new()?,
            detector: HeaderDetector::new()?,
        })
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn load_layout(&self, pdf_path: &Path) -> Result<DocumentLayout> {
        layout::load_document(pdf_path, self.config.max_pages)
    }

    pub fn annotate_pdf(&self, pdf_path: &Path) -> Result<AnnotatedOutline> {
        let (_, annotated) = self.annotate_with_layout(pdf_path)?;
        Ok(annotated)
    }

    pub fn annotate_with_layout(
        &self,
        pdf_path: &Path,
    ) -> Result<(DocumentLayout, AnnotatedOutline)> {
        let started = Instant::now();
        let document = self.load_layout(pdf_path)?;

        let primary = match self.config.markdown_source {
            MarkdownSource::Structural => layout::structural_markdown_pages(
                pdf_path,
                &document.bookmarks,
                self.config.max_pages,
            )?,
            MarkdownSource::Layout => Vec::new(),
        };

        let mut annotated = self.annotate_layout(&document, &primary, pdf_path);
        annotated.processing_ms = Some(started.elapsed().as_millis() as u64);

        info!(
            path = %pdf_path.display(),
            pages = document.page_count(),
            headings = annotated.outline.len(),
            "annotated document"
        );

        Ok((document, annotated))
    }

    pub fn annotate_layout(
        &self,
        document: &DocumentLayout,
        primary_pages: &[String],
        pdf_path: &Path,
    ) -> AnnotatedOutline {
        let fallback = markdown::project_pages(&document.pages);
        let markdown = MarkdownDocument::from_pages(primary_pages, &fallback);
        let title = title::determine_title(&self.detector, &markdown.lines, document, pdf_path);

        let mapping = headers::marker_level_mapping(&markdown.lines);
        let explicit = self
            .detector
            .detect_marker_headers(&markdown.lines, &title, &mapping);
        let semantic = self.detector.detect_semantic_headers(&markdown.lines, &title);
        debug!(
            explicit = explicit.len(),
            semantic = semantic.len(),
            "detected header candidates"
        );

        let candidates = reconcile::merge_candidates(explicit, semantic);
        let rows = self.extractor.generate_feature_rows(document);
        let resolved = reconcile::resolve_headers(
            candidates,
            &markdown,
            &rows,
            self.config.similarity_cutoff,
        );

        AnnotatedOutline {
            title,
            outline: resolved
                .into_iter()
                .map(|header| AnnotatedEntry {
                    text: header.text,
                    page: header.page.saturating_sub(1),
                    features: header.features,
                })
                .collect(),
            processing_ms: None,
            error: None,
        }
    }
}

pub fn failed_annotation(pdf_path: &Path, error: &str) -> AnnotatedOutline {
    AnnotatedOutline {
        title: filename_title(pdf_path),
        outline: Vec::new(),
        processing_ms: None,
        error: Some(error.to_string()),
    }
}

pub fn failed_outline(pdf_path: &Path, error: &str) -> Outline {
    Outline {
        title: filename_title(pdf_path),
        outline: Vec::new(),
        error: Some(error.to_string()),
    }
}

pub fn recover_outline(pdf_path: &Path, err: anyhow::Error) -> Outline {
    let error = format!("{err:#}");
    warn!(path = %pdf_path.display(), error = %error, "document failed");
    failed_outline(pdf_path, &error)
}

pub fn assemble_outline(
    annotated: &AnnotatedOutline,
    classifier: &LevelClassifier,
) -> Result<Outline> {
    let outline = classifier.classify(&annotated.outline)?;
    Ok(Outline {
        title: annotated.title.clone(),
        outline,
        error: annotated.error.clone(),
    })
}
