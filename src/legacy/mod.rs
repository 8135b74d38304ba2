// Legacy file-based stores

pub mod discover;

use std::path::Path;
use serde::de::DeserializeOwned;

use crate::error::Result;

pub use discover::{discover_databases, discover_template_files, LegacyDatabase, TemplateFiles};

/// Load one serialized legacy document
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    log::debug!("Loading {}", path.display());
    let content = std::fs::read_to_string(path)?;
    // Files written on Windows may start with a byte order mark
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    Ok(serde_json::from_str(content)?)
}
