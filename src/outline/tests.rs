use std::collections::BTreeMap;
use std::path::Path;

use crate::classifier::{LevelClassifier, LevelModel};
use crate::layout::{Block, Line, PageLayout, Rect, Span};
use crate::model::{HeadingLevel, OutlineEntry};

use super::features::{
    PageStatistics, cluster_indent, compute_gap_and_indents, font_family_hash, should_merge,
};
use super::headers::{HeaderCandidate, marker_level_mapping};
use super::linguistic::{TextAnalyzer, is_title_word};
use super::reconcile::{closest_row, merge_candidates, resolve_headers, similarity_ratio};
use super::style::build_style_profile;
use super::title::{filename_title, first_page_title, marker_title};
use super::*;

fn span_at(text: &str, size: f64, bold: bool, bbox: Rect) -> Span {
    Span {
        text: text.to_string(),
        size,
        font: if bold { "Helvetica-Bold" } else { "Times-Roman" }.to_string(),
        bold,
        bbox,
    }
}

fn body_line(text: &str, x0: f64, y0: f64) -> Line {
    Line::from_spans(vec![span_at(
        text,
        11.0,
        false,
        Rect::new(x0, y0, x0 + 228.0, y0 + 12.0),
    )])
}

fn single_line_block(span: Span) -> Block {
    Block::from_lines(vec![Line::from_spans(vec![span])])
}

fn page_with_blocks(index: usize, blocks: Vec<Block>) -> PageLayout {
    PageLayout {
        index,
        width: 612.0,
        height: 792.0,
        blocks,
        drawings: Vec::new(),
    }
}

fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|line| line.to_string()).collect()
}

fn candidate(level: u8, text: &str, line_number: usize) -> HeaderCandidate {
    HeaderCandidate {
        level,
        text: text.to_string(),
        line_number,
    }
}

fn annual_report_layout() -> DocumentLayout {
    let page = page_with_blocks(
        0,
        vec![
            single_line_block(span_at(
                "Annual Report 2024",
                24.0,
                true,
                Rect::new(90.0, 72.0, 350.0, 100.0),
            )),
            single_line_block(span_at(
                "Executive Summary",
                14.0,
                true,
                Rect::new(90.0, 150.0, 250.0, 166.0),
            )),
            single_line_block(span_at(
                "Revenue grew across every region and segment during the fiscal year as planned.",
                11.0,
                false,
                Rect::new(90.0, 180.0, 520.0, 193.0),
            )),
        ],
    );

    DocumentLayout {
        pages: vec![page],
        bookmarks: Vec::new(),
    }
}

fn layout_pipeline() -> OutlinePipeline {
    OutlinePipeline::new(PipelineConfig {
        markdown_source: MarkdownSource::Layout,
        ..PipelineConfig::default()
    })
    .expect("pipeline should build")
}

struct FixedModel(Vec<f64>);

impl LevelModel for FixedModel {
    fn predict_proba(&self, _features: &[f64]) -> anyhow::Result<Vec<f64>> {
        Ok(self.0.clone())
    }
}

fn stub_classifier(probabilities: Vec<f64>) -> LevelClassifier {
    LevelClassifier::new(
        vec![FeatureColumn::FontSizeRank, FeatureColumn::IsBold],
        Box::new(FixedModel(probabilities)),
    )
}

#[test]
fn style_profile_ranks_distinct_sizes_densely() {
    let page = page_with_blocks(
        0,
        vec![
            single_line_block(span_at("a", 11.2, false, Rect::new(0.0, 0.0, 5.0, 5.0))),
            single_line_block(span_at("b", 24.0, true, Rect::new(0.0, 10.0, 5.0, 15.0))),
            single_line_block(span_at("c", 10.8, false, Rect::new(0.0, 20.0, 5.0, 25.0))),
            single_line_block(span_at("d", 14.0, false, Rect::new(0.0, 30.0, 5.0, 35.0))),
        ],
    );
    let layout = DocumentLayout {
        pages: vec![page],
        bookmarks: Vec::new(),
    };

    let profile = build_style_profile(&layout);
    assert_eq!(
        profile.ranks(),
        &BTreeMap::from([(24, 0), (14, 1), (11, 2)])
    );
    assert_eq!(profile.rank(24.3), 0);
    assert_eq!(profile.rank(9.0), -1);
}

#[test]
fn style_profile_of_empty_document_is_empty() {
    let profile = build_style_profile(&DocumentLayout::default());

    assert!(profile.ranks().is_empty());
    assert_eq!(profile.average_size(), 1.0);
}

#[test]
fn compute_gap_and_indents_uses_ninetieth_percentile() {
    let first = body_line("one", 72.0, 0.0);
    let second = body_line("two", 74.0, 14.0);
    let third = body_line("three", 108.0, 34.0);

    let stats = compute_gap_and_indents(&[&first, &second, &third]);

    assert!((stats.gap_threshold - 7.4).abs() < 1e-9);
    assert_eq!(stats.indent_centers, vec![73.0, 108.0]);
    assert_eq!(cluster_indent(75.0, &stats.indent_centers), 0);
    assert_eq!(cluster_indent(200.0, &stats.indent_centers), -1);
}

#[test]
fn compute_gap_and_indents_falls_back_without_gaps() {
    let only = body_line("alone", 72.0, 0.0);

    let stats = compute_gap_and_indents(&[&only]);
    assert_eq!(stats.gap_threshold, 5.0);
    assert_eq!(stats.indent_centers, vec![72.0]);
}

fn merge_stats() -> PageStatistics {
    PageStatistics {
        gap_threshold: 5.0,
        indent_centers: vec![72.0, 108.0],
    }
}

#[test]
fn should_merge_joins_continuation_lines() {
    let previous = body_line("The quarterly results show", 72.0, 100.0);
    let next = body_line("steady growth in all markets", 72.0, 114.0);

    assert!(should_merge(&[&previous], &next, &merge_stats()));
}

#[test]
fn should_merge_rejects_style_change() {
    let previous = body_line("The quarterly results show", 72.0, 100.0);
    let next = Line::from_spans(vec![span_at(
        "steady growth in all markets",
        11.0,
        true,
        Rect::new(72.0, 114.0, 300.0, 126.0),
    )]);

    assert!(!should_merge(&[&previous], &next, &merge_stats()));
}

#[test]
fn should_merge_rejects_terminal_punctuation() {
    let previous = body_line("The quarterly results were strong.", 72.0, 100.0);
    let next = body_line("Growth continued in all markets", 72.0, 114.0);

    assert!(!should_merge(&[&previous], &next, &merge_stats()));
}

#[test]
fn should_merge_rejects_large_gap() {
    let previous = body_line("The quarterly results show", 72.0, 100.0);
    let next = body_line("steady growth in all markets", 72.0, 130.0);

    assert!(!should_merge(&[&previous], &next, &merge_stats()));
}

#[test]
fn should_merge_rejects_indent_change() {
    let previous = body_line("The quarterly results show", 72.0, 100.0);
    let next = body_line("steady growth in all markets", 108.0, 114.0);

    assert!(!should_merge(&[&previous], &next, &merge_stats()));
}

#[test]
fn should_merge_forces_join_after_hyphen() {
    let previous = body_line("The quarterly results contin-", 72.0, 100.0);
    let next = body_line("ued to improve", 108.0, 130.0);

    assert!(should_merge(&[&previous], &next, &merge_stats()));
}

#[test]
fn generate_feature_rows_describes_each_block() {
    let mut layout = annual_report_layout();
    layout.pages[0].drawings = vec![Rect::new(80.0, 175.0, 530.0, 200.0)];

    let extractor = FeatureExtractor::new().expect("extractor should build");
    let rows = extractor.generate_feature_rows(&layout);

    assert_eq!(rows.len(), 3);

    let title = &rows[0];
    assert_eq!(title.page_num, 1);
    assert_eq!(title.block_num, 0);
    assert_eq!(title.full_text, "Annual Report 2024");
    assert_eq!(title.font_size, 24);
    assert_eq!(title.font_size_rank, 0);
    assert!(title.is_bold);
    assert!(!title.is_in_table);
    assert_eq!(title.space_above, 72.0);
    assert_eq!(title.normalized_y_pos, 0.09);
    assert_eq!(title.rel_font_size, 1.47);
    assert_eq!(title.digit_ratio, 0.22);
    assert!(!title.is_title_case);
    assert!(title.is_first_page);
    assert_eq!(title.number_of_words, 3);
    assert_eq!(title.lines_in_block, 1);

    let heading = &rows[1];
    assert_eq!(heading.font_size_rank, 1);
    assert_eq!(heading.space_above, 50.0);
    assert!(heading.is_title_case);
    assert_eq!(heading.indent_cluster, 0);

    let body = &rows[2];
    assert_eq!(body.font_size_rank, 2);
    assert!(body.is_in_table);
    assert!(!body.is_all_caps);
    assert!(body.stopword_percentage > 0.0);
}

#[test]
fn feature_row_values_follow_column_names() {
    let extractor = FeatureExtractor::new().expect("extractor should build");
    let rows = extractor.generate_feature_rows(&annual_report_layout());

    let column = "font_size_rank"
        .parse::<FeatureColumn>()
        .expect("known column");
    assert_eq!(rows[1].value(column), Some(1.0));
    assert_eq!(rows[1].value(FeatureColumn::IsBold), Some(1.0));
    assert_eq!(rows[1].value(FeatureColumn::PrevLabel), None);
    assert!("font_colour".parse::<FeatureColumn>().is_err());
}

#[test]
fn font_family_hash_ignores_style_suffix() {
    assert_eq!(
        font_family_hash("Helvetica,Bold"),
        font_family_hash("Helvetica")
    );
}

#[test]
fn text_analyzer_computes_linguistic_ratios() {
    let analyzer = TextAnalyzer::new().expect("analyzer should build");

    let ratios = analyzer.ratios("The results of the study");
    assert_eq!(ratios.stopword_percentage, 60.0);
    assert_eq!(ratios.noun_verb_ratio, 2.0);

    let ratios = analyzer.ratios("Revenue grew strongly");
    assert_eq!(ratios.noun_verb_ratio, 1.0);

    let ratios = analyzer.ratios("");
    assert_eq!(ratios.noun_verb_ratio, 0.0);
    assert_eq!(ratios.stopword_percentage, 0.0);
}

#[test]
fn is_title_word_matches_title_casing() {
    assert!(is_title_word("Report"));
    assert!(!is_title_word("REPORT"));
    assert!(!is_title_word("report"));
    assert!(!is_title_word("2024"));
}

#[test]
fn project_page_marks_headings_bullets_and_tables() {
    let table_row = Line::from_spans(vec![
        span_at("Region", 10.0, false, Rect::new(72.0, 200.0, 120.0, 210.0)),
        span_at("Total", 10.0, false, Rect::new(300.0, 200.0, 340.0, 210.0)),
    ]);
    let page = page_with_blocks(
        0,
        vec![
            single_line_block(span_at(
                "Quarterly Results",
                20.0,
                true,
                Rect::new(72.0, 60.0, 300.0, 84.0),
            )),
            single_line_block(span_at(
                "Sales were flat",
                10.0,
                false,
                Rect::new(72.0, 120.0, 200.0, 130.0),
            )),
            single_line_block(span_at(
                "• First point",
                10.0,
                false,
                Rect::new(72.0, 160.0, 200.0, 170.0),
            )),
            Block::from_lines(vec![table_row]),
        ],
    );

    assert_eq!(
        markdown::project_page(&page),
        "## Quarterly Results\nSales were flat\n- First point\n| Region | Total |\n| --- | --- |"
    );
}

#[test]
fn markdown_document_falls_back_per_page() {
    let primary = lines(&["", "Primary text"]);
    let fallback = lines(&["Fallback one\nline two", "ignored"]);

    let document = MarkdownDocument::from_pages(&primary, &fallback);

    assert_eq!(document.lines, lines(&["Fallback one", "line two", "Primary text"]));
    assert_eq!(document.line_pages, vec![1, 1, 2]);
    assert_eq!(document.page_of_line(2), 2);
    assert_eq!(document.page_of_line(99), 1);
}

#[test]
fn marker_level_mapping_is_dense_and_monotonic() {
    let mapping = marker_level_mapping(&lines(&["# Title", "## Scope", "#### Method", "## Results"]));
    assert_eq!(mapping, BTreeMap::from([(2, 1), (4, 2)]));

    let deep = marker_level_mapping(&lines(&["## a", "### b", "#### c", "##### d"]));
    assert_eq!(deep, BTreeMap::from([(2, 1), (3, 2), (4, 3), (5, 3)]));
}

#[test]
fn detect_marker_headers_uses_remapped_levels() {
    let detector = HeaderDetector::new().expect("detector should build");
    let markdown = lines(&[
        "# Report",
        "## Scope",
        "#### Method **details**",
        "## Published May 2024",
        "### ",
    ]);
    let mapping = marker_level_mapping(&markdown);

    let headers = detector.detect_marker_headers(&markdown, "Report", &mapping);

    assert_eq!(
        headers,
        vec![candidate(1, "Scope", 1), candidate(3, "Method details", 2)]
    );
}

#[test]
fn detect_semantic_headers_requires_following_content() {
    let detector = HeaderDetector::new().expect("detector should build");
    let markdown = lines(&[
        "Executive Summary",
        "",
        "body text continues here.",
        "Published March 2024",
        "Details follow",
        "---",
        "1. Introduction",
        "More body",
    ]);

    let headers = detector.detect_semantic_headers(&markdown, "Report");

    assert_eq!(
        headers,
        vec![
            candidate(3, "Executive Summary", 0),
            candidate(3, "Introduction", 6),
        ]
    );
}

#[test]
fn detect_semantic_headers_keeps_words_that_contain_month_abbreviations() {
    let detector = HeaderDetector::new().expect("detector should build");
    let markdown = lines(&["Market Outlook", "Demand remains firm"]);

    let headers = detector.detect_semantic_headers(&markdown, "Report");
    assert_eq!(headers, vec![candidate(3, "Market Outlook", 0)]);
}

#[test]
fn detect_semantic_headers_skips_title_line() {
    let detector = HeaderDetector::new().expect("detector should build");
    let markdown = lines(&["Annual Report 2024", "Body text"]);

    assert!(
        detector
            .detect_semantic_headers(&markdown, "annual report 2024")
            .is_empty()
    );
}

#[test]
fn merge_candidates_is_idempotent() {
    let list = vec![candidate(3, "Introduction", 1), candidate(2, "Scope", 4)];

    assert_eq!(merge_candidates(list.clone(), list.clone()), list);
}

#[test]
fn merge_candidates_prefers_explicit_level_and_sorts_by_line() {
    let explicit = vec![candidate(1, "Scope", 4)];
    let semantic = vec![candidate(3, "Method", 9), candidate(3, "scope ", 4), candidate(3, "Intro", 0)];

    assert_eq!(
        merge_candidates(explicit, semantic),
        vec![
            candidate(3, "Intro", 0),
            candidate(1, "Scope", 4),
            candidate(3, "Method", 9),
        ]
    );
}

#[test]
fn resolve_headers_drops_unmatched_candidates() {
    let layout = DocumentLayout {
        pages: vec![page_with_blocks(
            0,
            vec![single_line_block(span_at(
                "Completely unrelated paragraph text about budgets",
                11.0,
                false,
                Rect::new(72.0, 100.0, 400.0, 112.0),
            ))],
        )],
        bookmarks: Vec::new(),
    };
    let rows = FeatureExtractor::new()
        .expect("extractor should build")
        .generate_feature_rows(&layout);
    let markdown = MarkdownDocument::from_pages(&lines(&["Introduction\nBody"]), &[]);

    let resolved = resolve_headers(
        vec![candidate(3, "Introduction", 0)],
        &markdown,
        &rows,
        DEFAULT_SIMILARITY_CUTOFF,
    );
    assert!(resolved.is_empty());
}

#[test]
fn resolve_headers_defaults_out_of_range_lines_to_first_page() {
    let rows = FeatureExtractor::new()
        .expect("extractor should build")
        .generate_feature_rows(&annual_report_layout());
    let markdown = MarkdownDocument::from_pages(&lines(&["Executive Summary"]), &[]);

    let resolved = resolve_headers(
        vec![candidate(3, "Executive Summary", 42)],
        &markdown,
        &rows,
        DEFAULT_SIMILARITY_CUTOFF,
    );

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].page, 1);
    assert_eq!(resolved[0].features, rows[1]);
}

#[test]
fn marker_title_requires_single_marker() {
    let detector = HeaderDetector::new().expect("detector should build");

    assert_eq!(
        marker_title(&detector, &lines(&["Intro", "## Sub", "**# Big Title**"])),
        Some("Big Title".to_string())
    );
    assert_eq!(marker_title(&detector, &lines(&["## Sub", "#"])), None);
}

#[test]
fn first_page_title_prefers_largest_left_aligned_span() {
    let detector = HeaderDetector::new().expect("detector should build");
    let page = page_with_blocks(
        0,
        vec![
            single_line_block(span_at(
                "Page 1 of 10",
                30.0,
                false,
                Rect::new(72.0, 20.0, 200.0, 50.0),
            )),
            single_line_block(span_at(
                "Far right label",
                40.0,
                false,
                Rect::new(500.0, 60.0, 600.0, 100.0),
            )),
            single_line_block(span_at(
                "Annual Report 2024",
                24.0,
                true,
                Rect::new(90.0, 120.0, 350.0, 148.0),
            )),
            single_line_block(span_at(
                "Prepared for shareholders",
                12.0,
                false,
                Rect::new(90.0, 160.0, 300.0, 172.0),
            )),
        ],
    );
    let layout = DocumentLayout {
        pages: vec![page],
        bookmarks: Vec::new(),
    };

    assert_eq!(
        first_page_title(&detector, &layout),
        Some("Annual Report 2024".to_string())
    );
}

#[test]
fn filename_title_title_cases_stem() {
    assert_eq!(
        filename_title(Path::new("reports/annual_report-final.pdf")),
        "Annual Report Final"
    );
}

#[test]
fn annual_report_heading_survives_when_classified_as_h3() {
    let pipeline = layout_pipeline();
    let layout = annual_report_layout();

    let annotated = pipeline.annotate_layout(&layout, &[], Path::new("annual.pdf"));
    assert_eq!(annotated.title, "Annual Report 2024");
    assert_eq!(annotated.outline.len(), 1);
    assert_eq!(annotated.outline[0].text, "Executive Summary");
    assert_eq!(annotated.outline[0].page, 0);

    let outline = assemble_outline(&annotated, &stub_classifier(vec![0.0, 0.1, 0.8, 0.1]))
        .expect("classification should succeed");
    assert_eq!(outline.title, "Annual Report 2024");
    assert_eq!(
        outline.outline,
        vec![OutlineEntry {
            text: "Executive Summary".to_string(),
            level: HeadingLevel::H3,
            page: 0,
        }]
    );
}

#[test]
fn annual_report_heading_is_filtered_when_classified_as_other() {
    let pipeline = layout_pipeline();
    let annotated =
        pipeline.annotate_layout(&annual_report_layout(), &[], Path::new("annual.pdf"));

    let outline = assemble_outline(&annotated, &stub_classifier(vec![0.0, 0.1, 0.1, 0.8]))
        .expect("classification should succeed");
    assert_eq!(outline.title, "Annual Report 2024");
    assert!(outline.outline.is_empty());
}

#[test]
fn empty_document_falls_back_to_filename_title() {
    let pipeline = layout_pipeline();

    let annotated = pipeline.annotate_layout(
        &DocumentLayout::default(),
        &[],
        Path::new("input/empty_quarterly-report.pdf"),
    );
    assert_eq!(annotated.title, "Empty Quarterly Report");
    assert!(annotated.outline.is_empty());

    let outline = assemble_outline(&annotated, &stub_classifier(vec![1.0, 0.0, 0.0, 0.0]))
        .expect("empty outline is valid");
    assert!(outline.outline.is_empty());
}

#[test]
fn failed_annotation_records_error_and_filename_title() {
    let annotated = failed_annotation(
        Path::new("docs/broken_file.pdf"),
        "pdftohtml returned non-zero exit status",
    );
    assert_eq!(annotated.title, "Broken File");
    assert!(annotated.outline.is_empty());
    assert_eq!(
        annotated.error.as_deref(),
        Some("pdftohtml returned non-zero exit status")
    );

    let outline = failed_outline(Path::new("docs/broken_file.pdf"), "boom");
    assert_eq!(outline.title, "Broken File");
    assert!(outline.outline.is_empty());
    assert_eq!(outline.error.as_deref(), Some("boom"));
}

#[test]
fn similarity_ratio_counts_shared_characters_over_both_lengths() {
    let ratio = similarity_ratio("Introduction", "Chapter 1: Introduction");
    assert!((ratio - 24.0 / 35.0).abs() < 1e-9);

    assert_eq!(similarity_ratio("", ""), 1.0);
    assert_eq!(similarity_ratio("Scope", ""), 0.0);
    assert_eq!(similarity_ratio("Scope", "Scope"), 1.0);
}

#[test]
fn closest_row_matches_heading_embedded_in_longer_block() {
    let layout = DocumentLayout {
        pages: vec![page_with_blocks(
            0,
            vec![single_line_block(span_at(
                "Chapter 1: Introduction",
                16.0,
                true,
                Rect::new(72.0, 100.0, 320.0, 118.0),
            ))],
        )],
        bookmarks: Vec::new(),
    };
    let rows = FeatureExtractor::new()
        .expect("extractor should build")
        .generate_feature_rows(&layout);

    let matched = closest_row("Introduction", 1, &rows, DEFAULT_SIMILARITY_CUTOFF)
        .expect("heading should match its block");
    assert_eq!(matched.full_text, "Chapter 1: Introduction");

    assert!(closest_row("Introduction", 2, &rows, DEFAULT_SIMILARITY_CUTOFF).is_none());
}

#[test]
fn digit_ratio_counts_only_ascii_digits() {
    let layout = DocumentLayout {
        pages: vec![page_with_blocks(
            0,
            vec![single_line_block(span_at(
                "Phase ½ 10",
                12.0,
                false,
                Rect::new(72.0, 100.0, 200.0, 112.0),
            ))],
        )],
        bookmarks: Vec::new(),
    };
    let rows = FeatureExtractor::new()
        .expect("extractor should build")
        .generate_feature_rows(&layout);

    assert_eq!(rows[0].digit_ratio, 0.2);
}

#[test]
fn detect_marker_headers_skips_boilerplate() {
    let detector = HeaderDetector::new().expect("detector should build");
    let markdown = lines(&[
        "# Report",
        "## Scope",
        "## Copyright Notice",
        "## Page 3",
        "## Author Details",
        "## Date of Issue",
        "## © Acme Corp",
        "## Pagination",
    ]);
    let mapping = marker_level_mapping(&markdown);

    let headers = detector.detect_marker_headers(&markdown, "Report", &mapping);

    assert_eq!(
        headers,
        vec![candidate(1, "Scope", 1), candidate(1, "Pagination", 7)]
    );
}

#[test]
fn detect_semantic_headers_skips_boilerplate() {
    let detector = HeaderDetector::new().expect("detector should build");
    let markdown = lines(&[
        "Copyright Notice",
        "all rights reserved.",
        "Page 3 of 10",
        "continued text.",
        "Author Details",
        "written by the team.",
        "Date Of Issue",
        "issued last spring.",
        "© Acme Corp",
        "registered trademark.",
        "Paging Strategy",
        "Body text follows.",
    ]);

    let headers = detector.detect_semantic_headers(&markdown, "Report");
    assert_eq!(headers, vec![candidate(3, "Paging Strategy", 10)]);
}

#[test]
fn recover_outline_keeps_error_chain_and_filename_title() {
    let err = anyhow::anyhow!("exit status 1").context("failed to run pdftohtml");

    let outline = recover_outline(Path::new("scans/field-notes_07.pdf"), err);
    assert_eq!(outline.title, "Field Notes 07");
    assert!(outline.outline.is_empty());
    assert_eq!(
        outline.error.as_deref(),
        Some("failed to run pdftohtml: exit status 1")
    );
}
