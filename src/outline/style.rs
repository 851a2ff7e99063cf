use std::collections::{BTreeMap, BTreeSet};

use crate::layout::DocumentLayout;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleProfile {
    ranks: BTreeMap<i64, i64>,
}

impl StyleProfile {
    pub fn rank(&self, size: f64) -> i64 {
        self.ranks.get(&round_font_size(size)).copied().unwrap_or(-1)
    }

    #[cfg(test)]
    pub fn ranks(&self) -> &BTreeMap<i64, i64> {
        &self.ranks
    }

    // mean of the distinct rounded sizes, not of every span
    pub fn average_size(&self) -> f64 {
        if self.ranks.is_empty() {
            return 1.0;
        }
        let total = self.ranks.keys().map(|size| *size as f64).sum::<f64>();
        total / self.ranks.len() as f64
    }
}

pub fn round_font_size(size: f64) -> i64 {
    size.round_ties_even() as i64
}

pub fn build_style_profile(layout: &DocumentLayout) -> StyleProfile {
    let sizes = layout
        .spans()
        .map(|span| round_font_size(span.size))
        .collect::<BTreeSet<i64>>();

    let ranks = sizes
        .into_iter()
        .rev()
        .enumerate()
        .map(|(rank, size)| (size, rank as i64))
        .collect();

    StyleProfile { ranks }
}
