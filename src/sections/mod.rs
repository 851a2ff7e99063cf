use serde::Serialize;

use crate::layout::{DocumentLayout, PageLayout, Rect, Span};
use crate::model::{HeadingLevel, Outline};

#[cfg(test)]
mod tests;

const SPANS_PER_CHUNK: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub section_index: usize,
    pub text: String,
    pub level: HeadingLevel,
    pub page: usize,
    pub bbox: Rect,
    pub page_height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub chunk_index: usize,
    pub section_index: usize,
    pub section: String,
    pub section_level: HeadingLevel,
    pub page: usize,
    pub bbox: Rect,
    pub text: String,
    pub page_height: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionedDocument {
    pub title: String,
    pub sections: Vec<Section>,
    pub chunks: Vec<Chunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
struct AnchoredHeading {
    text: String,
    level: HeadingLevel,
    page: usize,
    bbox: Rect,
}

pub fn find_heading_bbox(page: &PageLayout, heading: &str) -> Option<Rect> {
    let heading = heading.trim().to_lowercase();
    page.spans()
        .filter(|span| {
            let text = span.text.trim().to_lowercase();
            !text.is_empty() && (text.contains(&heading) || heading.contains(&text))
        })
        .map(|span| span.bbox)
        .reduce(|acc, rect| acc.union(&rect))
}

pub fn build_sections(layout: &DocumentLayout, outline: &Outline) -> SectionedDocument {
    let mut headings = outline
        .outline
        .iter()
        .filter_map(|entry| {
            let page = layout.pages.get(entry.page)?;
            let bbox = find_heading_bbox(page, &entry.text)?;
            Some(AnchoredHeading {
                text: entry.text.clone(),
                level: entry.level,
                page: entry.page,
                bbox,
            })
        })
        .collect::<Vec<AnchoredHeading>>();
    headings.sort_by(|a, b| a.page.cmp(&b.page).then(a.bbox.y0.total_cmp(&b.bbox.y0)));

    let mut document = SectionedDocument {
        title: outline.title.clone(),
        error: outline.error.clone(),
        ..SectionedDocument::default()
    };

    for (section_index, heading) in headings.iter().enumerate() {
        let start = (heading.page, heading.bbox.y0);
        let end = headings
            .get(section_index + 1)
            .map(|next| (next.page, next.bbox.y0));

        document.sections.push(Section {
            section_index,
            text: heading.text.clone(),
            level: heading.level,
            page: heading.page + 1,
            bbox: heading.bbox,
            page_height: page_height(layout, heading.page),
        });

        let spans = layout
            .pages
            .iter()
            .enumerate()
            .skip(heading.page)
            .flat_map(|(index, page)| page.spans().map(move |span| (index, span)))
            .filter(|(index, span)| {
                let position = (*index, span.bbox.y0);
                !span.text.trim().is_empty()
                    && !is_before(position, start)
                    && end.is_none_or(|end| is_before(position, end))
            })
            .collect::<Vec<(usize, &Span)>>();

        for group in spans.chunks(SPANS_PER_CHUNK) {
            let Some(&(first_page, _)) = group.first() else {
                continue;
            };
            let text = group
                .iter()
                .map(|(_, span)| span.text.trim())
                .collect::<Vec<&str>>()
                .join(" ");
            let bbox = group
                .iter()
                .map(|(_, span)| span.bbox)
                .reduce(|acc, rect| acc.union(&rect))
                .unwrap_or_default();

            document.chunks.push(Chunk {
                chunk_index: document.chunks.len(),
                section_index,
                section: heading.text.clone(),
                section_level: heading.level,
                page: first_page,
                bbox,
                text,
                page_height: page_height(layout, first_page),
            });
        }
    }

    document
}

fn is_before(position: (usize, f64), other: (usize, f64)) -> bool {
    position.0 < other.0 || (position.0 == other.0 && position.1 < other.1)
}

fn page_height(layout: &DocumentLayout, page: usize) -> f64 {
    layout.pages.get(page).map(|page| page.height).unwrap_or_default()
}
