//! Unit document writer.
//!
//! Documents are plain JSON objects, pretty-printed with two-space indent.
//! Non-ASCII text is written as UTF-8, never `\u` escaped.

use std::path::{Path, PathBuf};

use crate::error::ScrapeResult;
use crate::types::UnitDocument;

/// Render a document as it is stored on disk.
pub fn to_json(document: &UnitDocument) -> ScrapeResult<String> {
    Ok(serde_json::to_string_pretty(document.as_json())?)
}

/// Write `unit_<n>.json` into `dir`, creating the directory if needed and
/// replacing any previous file. Returns the written path.
pub fn write_unit(dir: &Path, document: &UnitDocument) -> ScrapeResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(document.unit.file_name());
    std::fs::write(&path, to_json(document)?)?;
    Ok(path)
}
