use std::fmt;

use serde::{Deserialize, Serialize};

use crate::outline::FeatureRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    pub fn from_label(label: usize) -> Option<Self> {
        match label {
            0 => Some(Self::H1),
            1 => Some(Self::H2),
            2 => Some(Self::H3),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::H1 => "H1",
            Self::H2 => "H2",
            Self::H3 => "H3",
        }
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedEntry {
    pub text: String,
    pub page: usize,
    pub features: FeatureRow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedOutline {
    pub title: String,
    pub outline: Vec<AnnotatedEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub text: String,
    pub level: HeadingLevel,
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub title: String,
    pub outline: Vec<OutlineEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolVersions {
    pub pdf_outline: String,
    pub pdftotext: Option<String>,
    pub pdftohtml: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceEntry {
    pub filename: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedDocument {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchCounts {
    pub pdf_count: usize,
    pub processed_count: usize,
    pub failed_count: usize,
    pub heading_count: usize,
    pub empty_outline_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub input_dir: String,
    pub output_dir: String,
    pub model_path: String,
    pub tool_versions: ToolVersions,
    pub counts: BatchCounts,
    pub source_hashes: Vec<SourceEntry>,
    pub failures: Vec<FailedDocument>,
}
