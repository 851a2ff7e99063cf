use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::SourceEntry;
use crate::util::sha256_file;

pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    discover_with_extension(dir, "pdf")
}

pub fn discover_annotated(dir: &Path) -> Result<Vec<PathBuf>> {
    discover_with_extension(dir, "json")
}

pub fn source_entry(path: &Path) -> Result<SourceEntry> {
    Ok(SourceEntry {
        filename: file_name(path)?,
        sha256: sha256_file(path)?,
    })
}

pub fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))
}

fn discover_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    let entries = fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(extension))
            .unwrap_or(false);

        if matches {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}
