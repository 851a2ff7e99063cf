use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

mod drawings;
mod poppler;

pub use poppler::{Bookmark, command_version, structural_markdown_pages};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x0 < other.x1
            && other.x0 < self.x1
            && self.y0 < other.y1
            && other.y0 < self.y1
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub size: f64,
    pub font: String,
    pub bold: bool,
    pub bbox: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub spans: Vec<Span>,
    pub bbox: Rect,
}

impl Line {
    pub fn from_spans(spans: Vec<Span>) -> Self {
        let bbox = spans
            .iter()
            .map(|span| span.bbox)
            .reduce(|acc, rect| acc.union(&rect))
            .unwrap_or_default();
        Self { spans, bbox }
    }

    pub fn text(&self) -> String {
        self.spans
            .iter()
            .map(|span| span.text.as_str())
            .collect::<Vec<&str>>()
            .join(" ")
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub lines: Vec<Line>,
    pub bbox: Rect,
}

impl Block {
    pub fn from_lines(lines: Vec<Line>) -> Self {
        let bbox = lines
            .iter()
            .map(|line| line.bbox)
            .reduce(|acc, rect| acc.union(&rect))
            .unwrap_or_default();
        Self { lines, bbox }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub index: usize,
    pub width: f64,
    pub height: f64,
    pub blocks: Vec<Block>,
    pub drawings: Vec<Rect>,
}

impl PageLayout {
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.blocks.iter().flat_map(|block| block.lines.iter())
    }

    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.lines().flat_map(|line| line.spans.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentLayout {
    pub pages: Vec<PageLayout>,
    pub bookmarks: Vec<Bookmark>,
}

impl DocumentLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.pages.iter().flat_map(|page| page.spans())
    }
}

pub fn load_document(pdf_path: &Path, max_pages: Option<usize>) -> Result<DocumentLayout> {
    let mut layout = poppler::extract_layout_with_pdftohtml(pdf_path, max_pages)?;

    match drawings::extract_drawing_rects(pdf_path, &layout) {
        Ok(per_page) => {
            for (page, rects) in layout.pages.iter_mut().zip(per_page) {
                page.drawings = rects;
            }
        }
        Err(err) => {
            warn!(
                path = %pdf_path.display(),
                error = %err,
                "drawing extraction failed; table overlap disabled for document"
            );
        }
    }

    debug!(
        path = %pdf_path.display(),
        pages = layout.page_count(),
        bookmarks = layout.bookmarks.len(),
        "loaded document layout"
    );

    Ok(layout)
}
