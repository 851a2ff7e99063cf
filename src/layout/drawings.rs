use std::path::Path;

use anyhow::{Context, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object};

use super::{DocumentLayout, Rect};

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

pub(super) fn extract_drawing_rects(
    pdf_path: &Path,
    layout: &DocumentLayout,
) -> Result<Vec<Vec<Rect>>> {
    let document = Document::load(pdf_path)
        .with_context(|| format!("failed to load {} for drawing extraction", pdf_path.display()))?;
    let page_ids = document.get_pages();

    let mut per_page = Vec::with_capacity(layout.pages.len());
    for page in &layout.pages {
        let page_number = (page.index + 1) as u32;
        let Some(page_id) = page_ids.get(&page_number) else {
            per_page.push(Vec::new());
            continue;
        };

        let raw = document.get_page_content(*page_id).with_context(|| {
            format!(
                "failed to read content stream for {} page {}",
                pdf_path.display(),
                page_number
            )
        })?;
        let content = Content::decode(&raw).with_context(|| {
            format!(
                "failed to decode content stream for {} page {}",
                pdf_path.display(),
                page_number
            )
        })?;

        per_page.push(rects_from_operations(&content.operations, page.height));
    }

    Ok(per_page)
}

pub(super) fn rects_from_operations(operations: &[Operation], page_height: f64) -> Vec<Rect> {
    let mut ctm = IDENTITY;
    let mut stack = Vec::<Matrix>::new();
    let mut rects = Vec::new();

    for operation in operations {
        match operation.operator.as_str() {
            "q" => stack.push(ctm),
            "Q" => ctm = stack.pop().unwrap_or(IDENTITY),
            "cm" => {
                if let Some(values) = numeric_operands::<6>(&operation.operands) {
                    ctm = multiply(&values, &ctm);
                }
            }
            "re" => {
                let Some([x, y, w, h]) = numeric_operands::<4>(&operation.operands) else {
                    continue;
                };
                let corners = [(x, y), (x + w, y), (x, y + h), (x + w, y + h)]
                    .map(|(px, py)| transform(&ctm, px, py));
                let min_x = corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
                let max_x = corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
                let min_y = corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
                let max_y = corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

                rects.push(Rect::new(
                    min_x,
                    page_height - max_y,
                    max_x,
                    page_height - min_y,
                ));
            }
            _ => {}
        }
    }

    rects
}

fn numeric_operands<const N: usize>(operands: &[Object]) -> Option<[f64; N]> {
    if operands.len() < N {
        return None;
    }

    let mut values = [0.0; N];
    for (slot, operand) in values.iter_mut().zip(operands) {
        *slot = match operand {
            Object::Integer(value) => *value as f64,
            other => other.as_float().ok()? as f64,
        };
    }
    Some(values)
}

fn multiply(left: &Matrix, right: &Matrix) -> Matrix {
    [
        left[0] * right[0] + left[1] * right[2],
        left[0] * right[1] + left[1] * right[3],
        left[2] * right[0] + left[3] * right[2],
        left[2] * right[1] + left[3] * right[3],
        left[4] * right[0] + left[5] * right[2] + right[4],
        left[4] * right[1] + left[5] * right[3] + right[5],
    ]
}

fn transform(matrix: &Matrix, x: f64, y: f64) -> (f64, f64) {
    (
        matrix[0] * x + matrix[2] * y + matrix[4],
        matrix[1] * x + matrix[3] * y + matrix[5],
    )
}
