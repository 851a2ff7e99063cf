use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::layout::{DocumentLayout, Line, PageLayout, Rect, Span};

use super::linguistic::{TextAnalyzer, is_title_word, is_upper_text, round_to};
use super::style::{StyleProfile, build_style_profile, round_font_size};

const DEFAULT_GAP_THRESHOLD: f64 = 5.0;
const INDENT_TOLERANCE: f64 = 5.0;
const CENTER_TOLERANCE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub page_num: usize,
    pub block_num: usize,
    pub full_text: String,
    pub font_size: i64,
    pub text_length: usize,
    pub number_of_words: usize,
    pub number_of_spaces: usize,
    pub number_of_letters: usize,
    pub font_size_rank: i64,
    pub is_bold: bool,
    pub is_in_table: bool,
    pub normalized_y_pos: f64,
    pub is_centered: bool,
    pub is_all_caps: bool,
    pub starts_with_number_or_bullet: bool,
    pub space_above: f64,
    pub noun_verb_ratio: f64,
    pub stopword_percentage: f64,
    pub rel_font_size: f64,
    pub indent_cluster: i64,
    pub ends_with_colon: bool,
    pub punct_density: f64,
    pub is_title_case: bool,
    pub digit_ratio: f64,
    pub is_first_page: bool,
    pub font_family_hash: u8,
    pub lines_in_block: usize,
    pub avg_word_length: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureColumn {
    PageNum,
    BlockNum,
    FontSize,
    TextLength,
    NumberOfWords,
    NumberOfSpaces,
    NumberOfLetters,
    FontSizeRank,
    IsBold,
    IsInTable,
    NormalizedYPos,
    IsCentered,
    IsAllCaps,
    StartsWithNumberOrBullet,
    SpaceAbove,
    NounVerbRatio,
    StopwordPercentage,
    RelFontSize,
    IndentCluster,
    EndsWithColon,
    PunctDensity,
    IsTitleCase,
    DigitRatio,
    IsFirstPage,
    FontFamilyHash,
    LinesInBlock,
    AvgWordLength,
    PrevLabel,
}

impl FeatureColumn {
    pub const ALL: [FeatureColumn; 28] = [
        Self::PageNum,
        Self::BlockNum,
        Self::FontSize,
        Self::TextLength,
        Self::NumberOfWords,
        Self::NumberOfSpaces,
        Self::NumberOfLetters,
        Self::FontSizeRank,
        Self::IsBold,
        Self::IsInTable,
        Self::NormalizedYPos,
        Self::IsCentered,
        Self::IsAllCaps,
        Self::StartsWithNumberOrBullet,
        Self::SpaceAbove,
        Self::NounVerbRatio,
        Self::StopwordPercentage,
        Self::RelFontSize,
        Self::IndentCluster,
        Self::EndsWithColon,
        Self::PunctDensity,
        Self::IsTitleCase,
        Self::DigitRatio,
        Self::IsFirstPage,
        Self::FontFamilyHash,
        Self::LinesInBlock,
        Self::AvgWordLength,
        Self::PrevLabel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PageNum => "page_num",
            Self::BlockNum => "block_num",
            Self::FontSize => "font_size",
            Self::TextLength => "text_length",
            Self::NumberOfWords => "number_of_words",
            Self::NumberOfSpaces => "number_of_spaces",
            Self::NumberOfLetters => "number_of_letters",
            Self::FontSizeRank => "font_size_rank",
            Self::IsBold => "is_bold",
            Self::IsInTable => "is_in_table",
            Self::NormalizedYPos => "normalized_y_pos",
            Self::IsCentered => "is_centered",
            Self::IsAllCaps => "is_all_caps",
            Self::StartsWithNumberOrBullet => "starts_with_number_or_bullet",
            Self::SpaceAbove => "space_above",
            Self::NounVerbRatio => "noun_verb_ratio",
            Self::StopwordPercentage => "stopword_percentage",
            Self::RelFontSize => "rel_font_size",
            Self::IndentCluster => "indent_cluster",
            Self::EndsWithColon => "ends_with_colon",
            Self::PunctDensity => "punct_density",
            Self::IsTitleCase => "is_title_case",
            Self::DigitRatio => "digit_ratio",
            Self::IsFirstPage => "is_first_page",
            Self::FontFamilyHash => "font_family_hash",
            Self::LinesInBlock => "lines_in_block",
            Self::AvgWordLength => "avg_word_length",
            Self::PrevLabel => "prev_label",
        }
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureColumn {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        match Self::ALL.iter().find(|column| column.as_str() == trimmed) {
            Some(column) => Ok(*column),
            None => bail!("unknown feature column: {trimmed}"),
        }
    }
}

impl FeatureRow {
    pub fn value(&self, column: FeatureColumn) -> Option<f64> {
        let flag = |value: bool| if value { 1.0 } else { 0.0 };
        let value = match column {
            FeatureColumn::PageNum => self.page_num as f64,
            FeatureColumn::BlockNum => self.block_num as f64,
            FeatureColumn::FontSize => self.font_size as f64,
            FeatureColumn::TextLength => self.text_length as f64,
            FeatureColumn::NumberOfWords => self.number_of_words as f64,
            FeatureColumn::NumberOfSpaces => self.number_of_spaces as f64,
            FeatureColumn::NumberOfLetters => self.number_of_letters as f64,
            FeatureColumn::FontSizeRank => self.font_size_rank as f64,
            FeatureColumn::IsBold => flag(self.is_bold),
            FeatureColumn::IsInTable => flag(self.is_in_table),
            FeatureColumn::NormalizedYPos => self.normalized_y_pos,
            FeatureColumn::IsCentered => flag(self.is_centered),
            FeatureColumn::IsAllCaps => flag(self.is_all_caps),
            FeatureColumn::StartsWithNumberOrBullet => flag(self.starts_with_number_or_bullet),
            FeatureColumn::SpaceAbove => self.space_above,
            FeatureColumn::NounVerbRatio => self.noun_verb_ratio,
            FeatureColumn::StopwordPercentage => self.stopword_percentage,
            FeatureColumn::RelFontSize => self.rel_font_size,
            FeatureColumn::IndentCluster => self.indent_cluster as f64,
            FeatureColumn::EndsWithColon => flag(self.ends_with_colon),
            FeatureColumn::PunctDensity => self.punct_density,
            FeatureColumn::IsTitleCase => flag(self.is_title_case),
            FeatureColumn::DigitRatio => self.digit_ratio,
            FeatureColumn::IsFirstPage => flag(self.is_first_page),
            FeatureColumn::FontFamilyHash => f64::from(self.font_family_hash),
            FeatureColumn::LinesInBlock => self.lines_in_block as f64,
            FeatureColumn::AvgWordLength => self.avg_word_length,
            FeatureColumn::PrevLabel => return None,
        };
        Some(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageStatistics {
    pub gap_threshold: f64,
    pub indent_centers: Vec<f64>,
}

pub fn compute_gap_and_indents(lines: &[&Line]) -> PageStatistics {
    let mut gaps = lines
        .windows(2)
        .map(|pair| pair[1].bbox.y0 - pair[0].bbox.y1)
        .collect::<Vec<f64>>();
    let gap_threshold = percentile(&mut gaps, 90.0).unwrap_or(DEFAULT_GAP_THRESHOLD);

    let mut lefts = lines.iter().map(|line| line.bbox.x0).collect::<Vec<f64>>();
    lefts.sort_by(f64::total_cmp);

    let mut clusters = Vec::<Vec<f64>>::new();
    for x in lefts {
        match clusters.last_mut() {
            Some(cluster) if cluster.last().is_some_and(|last| (last - x).abs() < INDENT_TOLERANCE) => {
                cluster.push(x)
            }
            _ => clusters.push(vec![x]),
        }
    }

    let indent_centers = clusters
        .iter()
        .map(|cluster| cluster.iter().sum::<f64>() / cluster.len() as f64)
        .collect();

    PageStatistics {
        gap_threshold,
        indent_centers,
    }
}

fn percentile(values: &mut [f64], percent: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let rank = percent / 100.0 * (values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(values[lower] + (values[upper] - values[lower]) * fraction)
}

pub fn cluster_indent(x0: f64, centers: &[f64]) -> i64 {
    centers
        .iter()
        .position(|center| (center - x0).abs() < INDENT_TOLERANCE)
        .map(|index| index as i64)
        .unwrap_or(-1)
}

pub fn should_merge(previous: &[&Line], next: &Line, stats: &PageStatistics) -> bool {
    let Some(last) = previous.last() else {
        return false;
    };
    let (Some(previous_span), Some(next_span)) = (last.spans.first(), next.spans.first()) else {
        return false;
    };

    let previous_style = (round_font_size(previous_span.size), previous_span.bold);
    let next_style = (round_font_size(next_span.size), next_span.bold);
    if previous_style != next_style {
        return false;
    }

    let previous_text = previous
        .iter()
        .flat_map(|line| line.spans.iter())
        .map(|span| span.text.as_str())
        .collect::<Vec<&str>>()
        .join(" ");
    let previous_text = previous_text.trim();

    if previous_text.ends_with(['-', '–', '—']) {
        return true;
    }
    if previous_text.ends_with(['.', '!', '?', ';', '…']) {
        return false;
    }

    if next.bbox.y0 - last.bbox.y1 > stats.gap_threshold {
        return false;
    }

    cluster_indent(last.bbox.x0, &stats.indent_centers)
        == cluster_indent(next.bbox.x0, &stats.indent_centers)
}

#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    analyzer: TextAnalyzer,
    bullet_regex: Regex,
}

impl FeatureExtractor {
    pub fn new() -> Result<Self> {
        let bullet_regex = Regex::new(r"^\s*(\d+(\.\d+)*\.?|[A-Za-z]\.|[•-])")
            .context("failed to compile leading numbering regex")?;

        Ok(Self {
            analyzer: TextAnalyzer::new()?,
            bullet_regex,
        })
    }

    pub fn generate_feature_rows(&self, layout: &DocumentLayout) -> Vec<FeatureRow> {
        let profile = build_style_profile(layout);
        layout
            .pages
            .iter()
            .flat_map(|page| self.page_rows(page, &profile))
            .collect()
    }

    fn page_rows(&self, page: &PageLayout, profile: &StyleProfile) -> Vec<FeatureRow> {
        let page_num = page.index + 1;
        let lines = page.lines().collect::<Vec<&Line>>();
        let stats = compute_gap_and_indents(&lines);
        let mut previous_y1 = 0.0;
        let mut rows = Vec::new();

        for (block_num, block) in page.blocks.iter().enumerate() {
            let Some((first, rest)) = block.lines.split_first() else {
                continue;
            };

            let mut sub_blocks = Vec::<Vec<&Line>>::new();
            let mut current = vec![first];
            for line in rest {
                if should_merge(&current, line, &stats) {
                    current.push(line);
                } else {
                    sub_blocks.push(std::mem::replace(&mut current, vec![line]));
                }
            }
            sub_blocks.push(current);

            for sub_block in sub_blocks {
                let spans = sub_block
                    .iter()
                    .flat_map(|line| line.spans.iter())
                    .collect::<Vec<&Span>>();
                let Some(&leading) = spans.first() else {
                    continue;
                };
                let text = spans
                    .iter()
                    .map(|span| span.text.as_str())
                    .collect::<Vec<&str>>()
                    .join(" ")
                    .trim()
                    .to_string();
                if text.is_empty() {
                    continue;
                }

                let bbox = sub_block[0].bbox;
                let space_above = round_to(bbox.y0 - previous_y1, 2);
                previous_y1 = bbox.y1;

                rows.push(self.build_row(RowContext {
                    page,
                    page_num,
                    block_num,
                    text,
                    spans: &spans,
                    leading,
                    bbox,
                    space_above,
                    indent_cluster: cluster_indent(bbox.x0, &stats.indent_centers),
                    profile,
                }));
            }
        }

        rows
    }

    fn build_row(&self, ctx: RowContext<'_>) -> FeatureRow {
        let text = ctx.text;
        let words = text.split_whitespace().collect::<Vec<&str>>();
        let word_count = words.len();
        let char_count = text.chars().count();
        let ratios = self.analyzer.ratios(&text);

        let digits = text.chars().filter(char::is_ascii_digit).count();
        let punctuation = text.chars().filter(|c| c.is_ascii_punctuation()).count();
        let word_chars = words.iter().map(|word| word.chars().count()).sum::<usize>();

        let mut line_tops = ctx
            .spans
            .iter()
            .map(|span| span.bbox.y0.to_bits())
            .collect::<Vec<u64>>();
        line_tops.sort_unstable();
        line_tops.dedup();

        let page_width = ctx.page.width;
        let page_height = ctx.page.height;
        let normalized_y_pos = if page_height > 0.0 {
            round_to(ctx.bbox.y0 / page_height, 2)
        } else {
            0.0
        };

        FeatureRow {
            page_num: ctx.page_num,
            block_num: ctx.block_num,
            font_size: round_font_size(ctx.leading.size),
            text_length: char_count,
            number_of_words: word_count,
            number_of_spaces: text.matches(' ').count(),
            number_of_letters: text.chars().filter(|c| c.is_alphabetic()).count(),
            font_size_rank: ctx.profile.rank(ctx.leading.size),
            is_bold: ctx.leading.bold,
            is_in_table: ctx.page.drawings.iter().any(|rect| ctx.bbox.intersects(rect)),
            normalized_y_pos,
            is_centered: ((page_width - ctx.bbox.width()) / 2.0 - ctx.bbox.x0).abs()
                < CENTER_TOLERANCE,
            is_all_caps: is_upper_text(&text) && char_count > 1,
            starts_with_number_or_bullet: self.bullet_regex.is_match(&text),
            space_above: ctx.space_above,
            noun_verb_ratio: ratios.noun_verb_ratio,
            stopword_percentage: ratios.stopword_percentage,
            rel_font_size: round_to(ctx.leading.size / ctx.profile.average_size(), 2),
            indent_cluster: ctx.indent_cluster,
            ends_with_colon: text.ends_with(':'),
            punct_density: round_to(punctuation as f64 / word_count.max(1) as f64, 2),
            is_title_case: words
                .iter()
                .filter(|word| word.chars().count() > 1)
                .all(|word| is_title_word(word)),
            digit_ratio: round_to(digits as f64 / char_count.max(1) as f64, 2),
            is_first_page: ctx.page_num == 1,
            font_family_hash: font_family_hash(&ctx.leading.font),
            lines_in_block: line_tops.len(),
            avg_word_length: round_to(word_chars as f64 / word_count.max(1) as f64, 2),
            full_text: text,
        }
    }
}

struct RowContext<'a> {
    page: &'a PageLayout,
    page_num: usize,
    block_num: usize,
    text: String,
    spans: &'a [&'a Span],
    leading: &'a Span,
    bbox: Rect,
    space_above: f64,
    indent_cluster: i64,
    profile: &'a StyleProfile,
}

pub fn font_family_hash(font: &str) -> u8 {
    let family = font.split(',').next().unwrap_or_default();
    let digest = Sha256::digest(family.as_bytes());
    digest[0]
}
