use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::{Block, DocumentLayout, Line, PageLayout, Rect, Span};

const BLOCK_GAP_FACTOR: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub title: String,
    pub page: usize,
    pub depth: usize,
}

#[derive(Debug, Clone)]
struct FontSpec {
    size: f64,
    family: String,
}

pub(super) fn extract_layout_with_pdftohtml(
    pdf_path: &Path,
    max_pages: Option<usize>,
) -> Result<DocumentLayout> {
    let mut command = Command::new("pdftohtml");
    command
        .arg("-xml")
        .arg("-i")
        .arg("-q")
        .arg("-zoom")
        .arg("1")
        .arg("-fontfullname")
        .arg("-f")
        .arg("1");
    if let Some(max_pages) = max_pages {
        command.arg("-l").arg(max_pages.to_string());
    }
    command.arg(pdf_path).arg("-stdout");

    let output = command
        .output()
        .with_context(|| format!("failed to execute pdftohtml for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftohtml returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let xml = String::from_utf8_lossy(&output.stdout);
    parse_pdftohtml_xml(&xml)
        .with_context(|| format!("failed to parse pdftohtml output for {}", pdf_path.display()))
}

pub(super) fn parse_pdftohtml_xml(xml: &str) -> Result<DocumentLayout> {
    let element_regex = Regex::new(
        r#"(?s)<page\b(?P<page>[^>]*)>|<fontspec\b(?P<font>[^>]*)/>|<text\b(?P<text_attrs>[^>]*)>(?P<text_body>.*?)</text>|(?P<outline_open><outline>)|(?P<outline_close></outline>)|<item\b(?P<item_attrs>[^>]*)>(?P<item_body>.*?)</item>"#,
    )
    .context("failed to compile pdftohtml element regex")?;
    let attribute_regex =
        Regex::new(r#"([A-Za-z_]+)="([^"]*)""#).context("failed to compile attribute regex")?;
    let tag_regex = Regex::new(r"<[^>]+>").context("failed to compile markup tag regex")?;

    let mut fonts = HashMap::<String, FontSpec>::new();
    let mut page_spans = Vec::<(PageLayout, Vec<Span>)>::new();
    let mut bookmarks = Vec::<Bookmark>::new();
    let mut outline_depth = 0usize;

    for captures in element_regex.captures_iter(xml) {
        if let Some(attrs) = captures.name("page") {
            let attrs = parse_attributes(&attribute_regex, attrs.as_str());
            let page = PageLayout {
                index: page_spans.len(),
                width: numeric_attribute(&attrs, "width").unwrap_or(0.0),
                height: numeric_attribute(&attrs, "height").unwrap_or(0.0),
                ..PageLayout::default()
            };
            page_spans.push((page, Vec::new()));
            continue;
        }

        if let Some(attrs) = captures.name("font") {
            let attrs = parse_attributes(&attribute_regex, attrs.as_str());
            if let Some(id) = attrs.get("id") {
                fonts.insert(
                    id.clone(),
                    FontSpec {
                        size: numeric_attribute(&attrs, "size").unwrap_or(0.0),
                        family: attrs.get("family").cloned().unwrap_or_default(),
                    },
                );
            }
            continue;
        }

        if captures.name("text_attrs").is_some() {
            let Some((_, spans)) = page_spans.last_mut() else {
                continue;
            };
            if let Some(span) = span_from_text_element(&captures, &attribute_regex, &tag_regex, &fonts)
            {
                spans.push(span);
            }
            continue;
        }

        if captures.name("outline_open").is_some() {
            outline_depth += 1;
            continue;
        }

        if captures.name("outline_close").is_some() {
            outline_depth = outline_depth.saturating_sub(1);
            continue;
        }

        if let Some(attrs) = captures.name("item_attrs") {
            let attrs = parse_attributes(&attribute_regex, attrs.as_str());
            let body = captures
                .name("item_body")
                .map(|value| value.as_str())
                .unwrap_or_default();
            let title = decode_entities(&tag_regex.replace_all(body, ""));
            let page = attrs
                .get("page")
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(0);
            if !title.is_empty() && page > 0 {
                bookmarks.push(Bookmark {
                    title,
                    page,
                    depth: outline_depth.saturating_sub(1),
                });
            }
        }
    }

    let pages = page_spans
        .into_iter()
        .map(|(mut page, spans)| {
            page.blocks = group_spans_into_blocks(spans);
            page
        })
        .collect();

    Ok(DocumentLayout { pages, bookmarks })
}

fn span_from_text_element(
    captures: &Captures<'_>,
    attribute_regex: &Regex,
    tag_regex: &Regex,
    fonts: &HashMap<String, FontSpec>,
) -> Option<Span> {
    let attrs = parse_attributes(attribute_regex, captures.name("text_attrs")?.as_str());
    let body = captures.name("text_body")?.as_str();

    let text = decode_entities(&tag_regex.replace_all(body, ""));
    if text.is_empty() {
        return None;
    }

    let top = numeric_attribute(&attrs, "top")?;
    let left = numeric_attribute(&attrs, "left")?;
    let width = numeric_attribute(&attrs, "width").unwrap_or(0.0);
    let height = numeric_attribute(&attrs, "height").unwrap_or(0.0);

    let font = attrs.get("font").and_then(|id| fonts.get(id));
    let size = font.map(|spec| spec.size).unwrap_or(height);
    let family = font.map(|spec| spec.family.clone()).unwrap_or_default();
    let bold = body.contains("<b>") || family.to_ascii_lowercase().contains("bold");

    Some(Span {
        text,
        size,
        font: family,
        bold,
        bbox: Rect::new(left, top, left + width, top + height),
    })
}

fn parse_attributes(attribute_regex: &Regex, raw: &str) -> HashMap<String, String> {
    attribute_regex
        .captures_iter(raw)
        .filter_map(|captures| {
            let key = captures.get(1)?.as_str().to_string();
            let value = captures.get(2)?.as_str().to_string();
            Some((key, value))
        })
        .collect()
}

fn numeric_attribute(attrs: &HashMap<String, String>, key: &str) -> Option<f64> {
    attrs.get(key).and_then(|value| value.trim().parse::<f64>().ok())
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&#160;", " ")
        .replace('\u{00a0}', " ")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

pub(super) fn group_spans_into_blocks(mut spans: Vec<Span>) -> Vec<Block> {
    spans.sort_by(|a, b| {
        a.bbox
            .y0
            .total_cmp(&b.bbox.y0)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let mut lines = Vec::<Vec<Span>>::new();
    for span in spans {
        let center = (span.bbox.y0 + span.bbox.y1) / 2.0;
        let joins_line = lines.last().is_some_and(|line| {
            let y0 = line.iter().map(|s| s.bbox.y0).fold(f64::INFINITY, f64::min);
            let y1 = line
                .iter()
                .map(|s| s.bbox.y1)
                .fold(f64::NEG_INFINITY, f64::max);
            center >= y0 && center <= y1
        });

        match lines.last_mut() {
            Some(line) if joins_line => line.push(span),
            _ => lines.push(vec![span]),
        }
    }

    let mut blocks = Vec::<Vec<Line>>::new();
    for mut spans in lines {
        spans.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
        let line = Line::from_spans(spans);

        let target = blocks.iter().rposition(|block| {
            let Some(previous) = block.last() else {
                return false;
            };
            let gap = line.bbox.y0 - previous.bbox.y1;
            let limit = previous.bbox.height().max(line.bbox.height()) * BLOCK_GAP_FACTOR;
            let overlaps = line.bbox.x0 < previous.bbox.x1 && previous.bbox.x0 < line.bbox.x1;
            overlaps && gap <= limit
        });

        match target {
            Some(index) => blocks[index].push(line),
            None => blocks.push(vec![line]),
        }
    }

    let mut blocks = blocks.into_iter().map(Block::from_lines).collect::<Vec<Block>>();
    blocks.sort_by(|a, b| {
        a.bbox
            .y0
            .total_cmp(&b.bbox.y0)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
    blocks
}

fn extract_pages_with_pdftotext(
    pdf_path: &Path,
    max_pages: Option<usize>,
) -> Result<Vec<String>> {
    let mut command = Command::new("pdftotext");
    command.arg("-enc").arg("UTF-8").arg("-f").arg("1");
    if let Some(max_pages) = max_pages {
        command.arg("-l").arg(max_pages.to_string());
    }
    command.arg(pdf_path).arg("-");

    let output = command
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    // pdftotext terminates every page with a form feed
    if pages.last().is_some_and(|page| page.trim().is_empty()) {
        pages.pop();
    }

    Ok(pages)
}

pub fn structural_markdown_pages(
    pdf_path: &Path,
    bookmarks: &[Bookmark],
    max_pages: Option<usize>,
) -> Result<Vec<String>> {
    let pages = extract_pages_with_pdftotext(pdf_path, max_pages)?;
    Ok(inject_bookmark_markers(pages, bookmarks))
}

pub(super) fn inject_bookmark_markers(mut pages: Vec<String>, bookmarks: &[Bookmark]) -> Vec<String> {
    for bookmark in bookmarks {
        let Some(page) = pages.get_mut(bookmark.page.saturating_sub(1)) else {
            continue;
        };
        let target = normalize_for_bookmark(&bookmark.title);
        if target.is_empty() {
            continue;
        }

        let mut lines = page.lines().map(str::to_string).collect::<Vec<String>>();
        let position = lines.iter().position(|line| {
            !line.trim_start().starts_with('#') && normalize_for_bookmark(line) == target
        });
        let Some(position) = position else {
            continue;
        };

        let markers = "#".repeat(bookmark.depth + 2);
        lines[position] = format!("{} {}", markers, lines[position].trim());
        *page = lines.join("\n");
    }

    pages
}

fn normalize_for_bookmark(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

pub fn command_version(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}
