use crate::layout::{Line, PageLayout};

use super::linguistic::{is_alpha_word, is_heading_stop_word};

const DEFAULT_PAGE_FONT_SIZE: f64 = 12.0;
const TABLE_ROW_MAX_Y_SPREAD: f64 = 2.0;
const TABLE_ROW_MIN_X_SPREAD: f64 = 100.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkdownDocument {
    pub lines: Vec<String>,
    pub line_pages: Vec<usize>,
}

impl MarkdownDocument {
    pub fn from_pages(primary: &[String], fallback: &[String]) -> Self {
        let page_count = primary.len().max(fallback.len());
        let mut document = Self::default();

        for index in 0..page_count {
            let primary_text = primary.get(index).map(|page| page.trim()).unwrap_or_default();
            let text = if primary_text.is_empty() {
                fallback.get(index).map(|page| page.trim()).unwrap_or_default()
            } else {
                primary_text
            };

            for line in text.split('\n') {
                document.lines.push(line.to_string());
                document.line_pages.push(index + 1);
            }
        }

        document
    }

    pub fn page_of_line(&self, line_number: usize) -> usize {
        self.line_pages.get(line_number).copied().unwrap_or(1)
    }
}

pub fn project_pages(pages: &[PageLayout]) -> Vec<String> {
    pages.iter().map(project_page).collect()
}

pub fn project_page(page: &PageLayout) -> String {
    let sizes = page.spans().map(|span| span.size).collect::<Vec<f64>>();
    let average = if sizes.is_empty() {
        DEFAULT_PAGE_FONT_SIZE
    } else {
        sizes.iter().sum::<f64>() / sizes.len() as f64
    };

    let mut output = Vec::<String>::new();
    for line in page.lines() {
        if line.spans.is_empty() {
            continue;
        }
        let text = line.text();
        if text.is_empty() {
            continue;
        }

        if let Some(first) = text.chars().next().filter(|c| matches!(c, '●' | '•' | '-')) {
            output.push(format!("- {}", text[first.len_utf8()..].trim()));
            continue;
        }

        if is_table_row(line) {
            let cells = line
                .spans
                .iter()
                .map(|span| span.text.trim())
                .collect::<Vec<&str>>();
            output.push(format!("| {} |", cells.join(" | ")));
            output.push(format!("| {} |", vec!["---"; cells.len()].join(" | ")));
            continue;
        }

        let line_size =
            line.spans.iter().map(|span| span.size).sum::<f64>() / line.spans.len() as f64;
        match heading_marker(&text, line_size, average) {
            Some(marker) => output.push(format!("{marker} {text}")),
            None => output.push(text),
        }
    }

    output.join("\n").trim().to_string()
}

fn is_table_row(line: &Line) -> bool {
    if line.spans.len() < 2 {
        return false;
    }

    let tops = line
        .spans
        .iter()
        .map(|span| (span.bbox.y0 * 10.0).round() / 10.0)
        .collect::<Vec<f64>>();
    if spread(&tops) >= TABLE_ROW_MAX_Y_SPREAD {
        return false;
    }

    let lefts = line.spans.iter().map(|span| span.bbox.x0).collect::<Vec<f64>>();
    spread(&lefts) > TABLE_ROW_MIN_X_SPREAD
}

fn spread(values: &[f64]) -> f64 {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    max - min
}

fn heading_marker(text: &str, line_size: f64, page_average: f64) -> Option<&'static str> {
    if line_size <= page_average * 1.2 {
        return None;
    }

    let words = text.split_whitespace().collect::<Vec<&str>>();
    let heading_cased = words.iter().all(|word| {
        !is_alpha_word(word)
            || word.chars().next().is_some_and(char::is_uppercase)
            || is_heading_stop_word(word)
    });
    let all_stop_words = words.iter().all(|word| is_heading_stop_word(word));
    let any_alpha = words.iter().any(|word| is_alpha_word(word));

    if !heading_cased || all_stop_words || !any_alpha {
        return None;
    }

    if line_size > page_average * 1.8 {
        Some("#")
    } else if line_size > page_average * 1.4 {
        Some("##")
    } else {
        Some("###")
    }
}
