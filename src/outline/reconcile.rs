use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::features::FeatureRow;
use super::headers::HeaderCandidate;
use super::markdown::MarkdownDocument;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedHeader {
    pub level: u8,
    pub text: String,
    pub line_number: usize,
    pub page: usize,
    pub features: FeatureRow,
}

pub fn merge_candidates(
    explicit: Vec<HeaderCandidate>,
    semantic: Vec<HeaderCandidate>,
) -> Vec<HeaderCandidate> {
    let mut seen = HashSet::<(String, usize)>::new();
    let mut merged = explicit
        .into_iter()
        .chain(semantic)
        .filter(|candidate| {
            seen.insert((candidate.text.trim().to_lowercase(), candidate.line_number))
        })
        .collect::<Vec<HeaderCandidate>>();

    merged.sort_by_key(|candidate| candidate.line_number);
    merged
}

pub fn resolve_headers(
    candidates: Vec<HeaderCandidate>,
    markdown: &MarkdownDocument,
    rows: &[FeatureRow],
    cutoff: f64,
) -> Vec<ResolvedHeader> {
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let page = markdown.page_of_line(candidate.line_number);
            let text = candidate.text.trim().to_string();
            let features = closest_row(&text, page, rows, cutoff)?;
            Some(ResolvedHeader {
                level: candidate.level,
                text,
                line_number: candidate.line_number,
                page,
                features: features.clone(),
            })
        })
        .collect()
}

pub fn closest_row<'a>(
    text: &str,
    page: usize,
    rows: &'a [FeatureRow],
    cutoff: f64,
) -> Option<&'a FeatureRow> {
    let mut best: Option<(f64, &FeatureRow)> = None;

    for row in rows.iter().filter(|row| row.page_num == page) {
        let score = similarity_ratio(text, row.full_text.trim());
        if score < cutoff {
            continue;
        }
        if best.is_none_or(|(best_score, _)| score > best_score) {
            best = Some((score, row));
        }
    }

    best.map(|(_, row)| row)
}

// 2 * M / T over chars, where M is the longest common subsequence length
pub fn similarity_ratio(left: &str, right: &str) -> f64 {
    let left = left.chars().collect::<Vec<char>>();
    let right = right.chars().collect::<Vec<char>>();
    let total = left.len() + right.len();
    if total == 0 {
        return 1.0;
    }

    let mut previous = vec![0usize; right.len() + 1];
    let mut current = vec![0usize; right.len() + 1];
    for left_char in &left {
        for (index, right_char) in right.iter().enumerate() {
            current[index + 1] = if left_char == right_char {
                previous[index] + 1
            } else {
                current[index].max(previous[index + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    2.0 * previous[right.len()] as f64 / total as f64
}
