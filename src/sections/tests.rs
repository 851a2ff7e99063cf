use crate::layout::{Block, Line};
use crate::model::OutlineEntry;

use super::*;

fn span(text: &str, y0: f64) -> Span {
    Span {
        text: text.to_string(),
        size: 11.0,
        font: "Times-Roman".to_string(),
        bold: false,
        bbox: Rect::new(72.0, y0, 300.0, y0 + 12.0),
    }
}

fn page(index: usize, spans: Vec<Span>) -> PageLayout {
    PageLayout {
        index,
        width: 612.0,
        height: 792.0,
        blocks: spans
            .into_iter()
            .map(|span| Block::from_lines(vec![Line::from_spans(vec![span])]))
            .collect(),
        drawings: Vec::new(),
    }
}

fn heading(text: &str, level: HeadingLevel, page: usize) -> OutlineEntry {
    OutlineEntry {
        text: text.to_string(),
        level,
        page,
    }
}

fn sample_layout() -> DocumentLayout {
    DocumentLayout {
        pages: vec![
            page(
                0,
                vec![
                    span("Annual Report 2024", 60.0),
                    span("Executive Summary", 120.0),
                    span("one", 140.0),
                    span("two", 160.0),
                    span("three", 180.0),
                    span("four", 200.0),
                    span("five", 220.0),
                    span("six", 240.0),
                ],
            ),
            page(
                1,
                vec![span("Outlook", 80.0), span("Growth continues", 100.0)],
            ),
        ],
        bookmarks: Vec::new(),
    }
}

#[test]
fn find_heading_bbox_unions_matching_spans() {
    let layout = sample_layout();

    let bbox = find_heading_bbox(&layout.pages[0], "executive summary").expect("heading found");
    assert_eq!(bbox, Rect::new(72.0, 120.0, 300.0, 132.0));
    assert!(find_heading_bbox(&layout.pages[0], "Appendix").is_none());
}

#[test]
fn build_sections_splits_spans_between_headings() {
    let layout = sample_layout();
    let outline = Outline {
        title: "Annual Report 2024".to_string(),
        outline: vec![
            heading("Outlook", HeadingLevel::H2, 1),
            heading("Executive Summary", HeadingLevel::H1, 0),
        ],
        error: None,
    };

    let document = build_sections(&layout, &outline);

    assert_eq!(document.sections.len(), 2);
    assert_eq!(document.sections[0].text, "Executive Summary");
    assert_eq!(document.sections[0].page, 1);
    assert_eq!(document.sections[1].text, "Outlook");
    assert_eq!(document.sections[1].page, 2);

    assert_eq!(document.chunks.len(), 3);
    assert_eq!(document.chunks[0].text, "Executive Summary one two three four");
    assert_eq!(document.chunks[1].text, "five six");
    assert_eq!(document.chunks[1].section_index, 0);
    assert_eq!(document.chunks[2].text, "Outlook Growth continues");
    assert_eq!(document.chunks[2].page, 1);
    assert_eq!(document.chunks[2].section_level, HeadingLevel::H2);
    assert_eq!(
        document
            .chunks
            .iter()
            .map(|chunk| chunk.chunk_index)
            .collect::<Vec<usize>>(),
        vec![0, 1, 2]
    );
}

#[test]
fn build_sections_drops_headings_without_a_box() {
    let layout = sample_layout();
    let outline = Outline {
        title: "Annual Report 2024".to_string(),
        outline: vec![
            heading("Appendix", HeadingLevel::H1, 0),
            heading("Outlook", HeadingLevel::H1, 7),
        ],
        error: None,
    };

    let document = build_sections(&layout, &outline);
    assert!(document.sections.is_empty());
    assert!(document.chunks.is_empty());
}

#[test]
fn build_sections_carries_failed_outline_error() {
    let outline = Outline {
        title: "Broken Scan".to_string(),
        outline: Vec::new(),
        error: Some("failed to run pdftohtml: exit status 1".to_string()),
    };

    let document = build_sections(&DocumentLayout::default(), &outline);
    assert_eq!(document.title, "Broken Scan");
    assert!(document.sections.is_empty());
    assert!(document.chunks.is_empty());
    assert_eq!(
        document.error.as_deref(),
        Some("failed to run pdftohtml: exit status 1")
    );
}
