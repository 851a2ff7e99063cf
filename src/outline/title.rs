use std::path::Path;

use crate::layout::DocumentLayout;

use super::headers::HeaderDetector;

const TITLE_MAX_LEFT_FRACTION: f64 = 0.6;
const TITLE_MIN_CHARS: usize = 5;
const TITLE_MIN_ALNUM_RATIO: f64 = 0.7;
const TITLE_MAX_WORDS: usize = 10;

pub fn determine_title(
    detector: &HeaderDetector,
    lines: &[String],
    layout: &DocumentLayout,
    pdf_path: &Path,
) -> String {
    marker_title(detector, lines)
        .or_else(|| first_page_title(detector, layout))
        .unwrap_or_else(|| filename_title(pdf_path))
}

pub fn marker_title(detector: &HeaderDetector, lines: &[String]) -> Option<String> {
    lines.iter().find_map(|line| {
        let line = line.trim().replace("**", "").replace('*', "");
        let is_single_marker = line.matches('#').count() == 1
            && line.starts_with('#')
            && !detector.clean_text(&line).is_empty();
        is_single_marker.then(|| line[1..].trim().to_string())
    })
}

pub fn first_page_title(detector: &HeaderDetector, layout: &DocumentLayout) -> Option<String> {
    let page = layout.pages.first()?;
    let max_left = page.width * TITLE_MAX_LEFT_FRACTION;

    let mut largest = 0.0;
    let mut candidates = Vec::<String>::new();
    for span in page.spans() {
        if span.bbox.x0 > max_left {
            continue;
        }

        let text = span.text.trim();
        let char_count = text.chars().count();
        if char_count <= TITLE_MIN_CHARS
            || detector.is_boilerplate(text)
            || text.chars().all(|c| c.is_ascii_digit())
        {
            continue;
        }

        let alnum = text
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .count();
        if span.size > largest && alnum as f64 / char_count as f64 > TITLE_MIN_ALNUM_RATIO {
            largest = span.size;
            candidates = vec![text.to_string()];
        } else if span.size == largest {
            candidates.push(text.to_string());
        }
    }

    candidates
        .into_iter()
        .find(|candidate| candidate.split_whitespace().count() <= TITLE_MAX_WORDS)
}

pub fn filename_title(pdf_path: &Path) -> String {
    let stem = pdf_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    title_case(&stem.replace(['_', '-'], " "))
}

fn title_case(input: &str) -> String {
    let mut previous_cased = false;
    input
        .chars()
        .flat_map(|character| {
            let converted = if previous_cased {
                character.to_lowercase().collect::<Vec<char>>()
            } else {
                character.to_uppercase().collect::<Vec<char>>()
            };
            previous_cased = character.is_alphabetic();
            converted
        })
        .collect()
}
