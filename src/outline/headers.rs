use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::linguistic::{is_alpha_word, is_heading_stop_word};

const DEEPEST_LEVEL: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderCandidate {
    pub level: u8,
    pub text: String,
    pub line_number: usize,
}

#[derive(Debug, Clone)]
pub struct HeaderDetector {
    month_regex: Regex,
    boilerplate_regex: Regex,
    ordinal_regex: Regex,
    text_cleanup_regex: Regex,
}

impl HeaderDetector {
    pub fn new() -> Result<Self> {
        let month_regex = Regex::new(
            r"(?i)\b(?:january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|oct|nov|dec)\b",
        )
        .context("failed to compile month name regex")?;
        let boilerplate_regex = Regex::new(r"(?i)\b(?:page|copyright|author|date)\b|©")
            .context("failed to compile boilerplate regex")?;
        let ordinal_regex = Regex::new(
            r"^\s*(?:\d+(?:\.\d+)*\.?|[A-Za-z][.)]|[ivxlcdmIVXLCDM]+[.)]|[-•●*])\s+",
        )
        .context("failed to compile ordinal prefix regex")?;
        let text_cleanup_regex =
            Regex::new(r"[^\w\s\.,]").context("failed to compile header cleanup regex")?;

        Ok(Self {
            month_regex,
            boilerplate_regex,
            ordinal_regex,
            text_cleanup_regex,
        })
    }

    pub fn is_boilerplate(&self, text: &str) -> bool {
        self.boilerplate_regex.is_match(text)
    }

    pub fn clean_text(&self, text: &str) -> String {
        self.text_cleanup_regex.replace_all(text, "").trim().to_string()
    }

    fn is_suppressed(&self, line: &str) -> bool {
        self.month_regex.is_match(line) || self.boilerplate_regex.is_match(line)
    }

    pub fn detect_marker_headers(
        &self,
        lines: &[String],
        title: &str,
        mapping: &BTreeMap<usize, u8>,
    ) -> Vec<HeaderCandidate> {
        let title_key = normalize_title_key(title);
        let mut headers = Vec::new();

        for (line_number, raw) in lines.iter().enumerate() {
            let line = raw.trim();
            if normalize_title_key(line) == title_key {
                continue;
            }
            if !line.starts_with('#') || self.is_suppressed(line) {
                continue;
            }

            let depth = line.matches('#').count();
            let level = mapping.get(&depth).copied().unwrap_or(DEEPEST_LEVEL);
            let text = self.clean_text(line.trim_start_matches('#'));
            if text.is_empty() {
                continue;
            }

            headers.push(HeaderCandidate {
                level,
                text,
                line_number,
            });
        }

        headers
    }

    pub fn detect_semantic_headers(&self, lines: &[String], title: &str) -> Vec<HeaderCandidate> {
        let title_key = normalize_title_key(title);
        let mut headers = Vec::new();

        for (line_number, raw) in lines.iter().enumerate() {
            if normalize_title_key(raw) == title_key {
                continue;
            }

            let line = raw.trim();
            if line.starts_with('#')
                || line.contains('|')
                || line.contains("---")
                || line.contains("...")
                || self.is_suppressed(line)
            {
                continue;
            }

            let stripped = self.ordinal_regex.replace(line, "");
            let cleaned = stripped
                .chars()
                .filter(|c| c.is_alphanumeric() || c.is_whitespace())
                .collect::<String>();
            let cleaned = cleaned.trim();

            if !looks_like_label(cleaned) {
                continue;
            }
            if !has_following_content(&lines[line_number + 1..]) {
                continue;
            }

            let text = self.clean_text(stripped.trim().trim_matches('_').trim());
            headers.push(HeaderCandidate {
                level: DEEPEST_LEVEL,
                text,
                line_number,
            });
        }

        headers
    }
}

fn looks_like_label(cleaned: &str) -> bool {
    let words = cleaned.split_whitespace().collect::<Vec<&str>>();
    let short_capitalized = !cleaned.is_empty()
        && words.len() <= 10
        && cleaned.chars().next().is_some_and(char::is_uppercase)
        && !words.iter().all(|word| is_heading_stop_word(word))
        && words.iter().any(|word| is_alpha_word(word));

    // cleaning strips ':' so the second arm never fires
    short_capitalized || cleaned.ends_with(':')
}

fn has_following_content(rest: &[String]) -> bool {
    for next in rest {
        let next = next.trim();
        if next.contains("---") {
            return false;
        }
        if !next.is_empty() {
            return true;
        }
    }
    false
}

pub fn marker_level_mapping(lines: &[String]) -> BTreeMap<usize, u8> {
    let depths = lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| line.starts_with('#'))
        .map(|line| line.matches('#').count())
        .filter(|depth| *depth > 1)
        .collect::<BTreeSet<usize>>();

    depths
        .into_iter()
        .enumerate()
        .map(|(index, depth)| (depth, (index + 1).min(DEEPEST_LEVEL as usize) as u8))
        .collect()
}

pub fn normalize_title_key(text: &str) -> String {
    text.to_lowercase()
        .replace("**", "")
        .replace(['*', '#'], "")
        .trim()
        .to_string()
}
