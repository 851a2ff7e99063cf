use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::model::{AnnotatedEntry, HeadingLevel, OutlineEntry};
use crate::outline::{FeatureColumn, FeatureRow};

mod boosted;

pub use boosted::BoostedTrees;

pub const OTHER_LABEL: usize = 3;
pub const CLASS_COUNT: usize = 4;
const EXPECTED_MODEL_TYPE: &str = "xgb";

pub trait LevelModel {
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>>;
}

pub struct LevelClassifier {
    columns: Vec<FeatureColumn>,
    model: Box<dyn LevelModel + Send + Sync>,
}

#[derive(Debug, Deserialize)]
struct BundleObject {
    #[serde(default)]
    model_type: Option<String>,
    feature_columns: Vec<String>,
    booster: Value,
}

impl LevelClassifier {
    pub fn new(mut columns: Vec<FeatureColumn>, model: Box<dyn LevelModel + Send + Sync>) -> Self {
        if !columns.contains(&FeatureColumn::PrevLabel) {
            columns.push(FeatureColumn::PrevLabel);
        }
        Self { columns, model }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read classifier bundle: {}", path.display()))?;
        let classifier = Self::from_bundle_json(&raw)
            .with_context(|| format!("invalid classifier bundle: {}", path.display()))?;

        info!(
            path = %path.display(),
            columns = classifier.columns.len(),
            "loaded level classifier"
        );
        Ok(classifier)
    }

    pub fn from_bundle_json(raw: &str) -> Result<Self> {
        let document: Value =
            serde_json::from_str(raw).context("classifier bundle is not valid JSON")?;

        let (booster, names, model_type) = match document {
            Value::Object(_) => {
                let bundle: BundleObject = serde_json::from_value(document)
                    .context("failed to parse classifier bundle object")?;
                let model_type = bundle
                    .model_type
                    .unwrap_or_else(|| EXPECTED_MODEL_TYPE.to_string());
                (bundle.booster, bundle.feature_columns, model_type)
            }
            Value::Array(items) => {
                let arity = items.len();
                let mut items = items.into_iter();
                let (Some(booster), Some(names)) = (items.next(), items.next()) else {
                    bail!("expected a 2 or 3 element classifier bundle, found {arity}");
                };
                let model_type = match (items.next(), items.next()) {
                    (None, None) => EXPECTED_MODEL_TYPE.to_string(),
                    (Some(Value::String(model_type)), None) => model_type,
                    (Some(other), None) => bail!("model type must be a string, found {other}"),
                    (Some(_), Some(_)) | (None, Some(_)) => {
                        bail!("expected a 2 or 3 element classifier bundle, found {arity}")
                    }
                };
                let names = serde_json::from_value::<Vec<String>>(names)
                    .context("feature columns must be a list of strings")?;
                (booster, names, model_type)
            }
            other => bail!("classifier bundle must be an object or array, found {other}"),
        };

        if model_type != EXPECTED_MODEL_TYPE {
            bail!("expected {EXPECTED_MODEL_TYPE} model type, found {model_type}");
        }

        let mut columns = names
            .iter()
            .map(|name| name.parse::<FeatureColumn>())
            .collect::<Result<Vec<FeatureColumn>>>()?;
        if !columns.contains(&FeatureColumn::PrevLabel) {
            columns.push(FeatureColumn::PrevLabel);
        }

        let trees = BoostedTrees::from_value(booster, &columns)?;
        Ok(Self::new(columns, Box::new(trees)))
    }

    pub fn feature_vector(&self, row: &FeatureRow, previous_label: usize) -> Result<Vec<f64>> {
        self.columns
            .iter()
            .map(|column| match column {
                FeatureColumn::PrevLabel => Ok(previous_label as f64),
                other => row
                    .value(*other)
                    .with_context(|| format!("feature column {other} has no value")),
            })
            .collect()
    }

    pub fn predict_label(&self, row: &FeatureRow, previous_label: usize) -> Result<usize> {
        let features = self.feature_vector(row, previous_label)?;
        let probabilities = self.model.predict_proba(&features)?;
        if probabilities.len() != CLASS_COUNT {
            bail!(
                "classifier returned {} class probabilities, expected {}",
                probabilities.len(),
                CLASS_COUNT
            );
        }

        let mut best = 0;
        for (index, probability) in probabilities.iter().enumerate() {
            if *probability > probabilities[best] {
                best = index;
            }
        }
        Ok(best)
    }

    // strictly sequential: each prediction feeds the next header's prev_label
    pub fn classify(&self, entries: &[AnnotatedEntry]) -> Result<Vec<OutlineEntry>> {
        let (_, outline) = entries.iter().try_fold(
            (OTHER_LABEL, Vec::new()),
            |(previous_label, mut outline), entry| -> Result<(usize, Vec<OutlineEntry>)> {
                let label = self.predict_label(&entry.features, previous_label)?;
                if let Some(level) = HeadingLevel::from_label(label) {
                    outline.push(OutlineEntry {
                        text: entry.text.clone(),
                        level,
                        page: entry.page,
                    });
                }
                Ok((label, outline))
            },
        )?;

        Ok(outline)
    }
}
