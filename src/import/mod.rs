//! Input documents
//!
//! - `reference-texts.json`: `{ "texts": [ { id, unit_slug, section_slug, title, body, key_terms? } ] }`
//! - `unit*.json`: `{ "unit": { "name", ... }, "sections": [ { "questions": [ { question_text, reference_text_ids? } ] } ] }`
//!
//! Unknown fields are ignored; the unit files carry much more than the
//! linker reads.

pub mod texts;

pub use texts::{ImportStats, TextImporter};

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TextRecord {
    pub id: String,
    pub unit_slug: String,
    pub section_slug: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub key_terms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReferenceTextsFile {
    texts: Vec<TextRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnitInfo {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionEntry {
    pub question_text: String,
    #[serde(default)]
    pub reference_text_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectionData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnitFile {
    pub unit: UnitInfo,
    pub sections: Vec<SectionData>,
}

/// A parsed unit file together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedUnit {
    pub file_name: String,
    pub data: UnitFile,
}

/// Parse and validate the reference text document. Any problem is fatal
/// and surfaces before a single row is written.
pub fn load_reference_texts(path: &Path) -> Result<Vec<TextRecord>> {
    let raw = std::fs::read_to_string(path)?;
    let file: ReferenceTextsFile = serde_json::from_str(&raw)
        .map_err(|e| Error::InvalidData(format!("{}: {}", path.display(), e)))?;
    validate_texts(&file.texts)?;
    Ok(file.texts)
}

pub fn validate_texts(texts: &[TextRecord]) -> Result<()> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (i, text) in texts.iter().enumerate() {
        if text.id.trim().is_empty() {
            errors.push(format!("text {}: missing 'id'", i + 1));
        } else if !seen.insert(text.id.as_str()) {
            errors.push(format!("text {}: duplicate id '{}'", i + 1, text.id));
        }
        if text.title.trim().is_empty() {
            errors.push(format!("text {}: missing 'title'", i + 1));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidData(errors.join("; ")))
    }
}

/// Unit files in `dir` matching `pattern`, sorted by file name.
pub fn unit_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = dir.join(pattern);
    let full = full.to_str().ok_or_else(|| {
        Error::Config(format!("data directory is not valid UTF-8: {}", dir.display()))
    })?;
    let paths = glob::glob(full)
        .map_err(|e| Error::Config(format!("bad unit pattern '{}': {}", pattern, e)))?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| Error::Io(e.into_error()))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub fn load_unit(path: &Path) -> Result<LoadedUnit> {
    let raw = std::fs::read_to_string(path)?;
    let data: UnitFile = serde_json::from_str(&raw)
        .map_err(|e| Error::InvalidData(format!("{}: {}", path.display(), e)))?;
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok(LoadedUnit { file_name, data })
}

/// Load every unit file up front so a malformed one stops the stage before
/// any link is written.
pub fn load_units(dir: &Path, pattern: &str) -> Result<Vec<LoadedUnit>> {
    unit_files(dir, pattern)?.iter().map(|p| load_unit(p)).collect()
}
