// Discovery of legacy file databases and template files

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::constants::{
    ANALYSIS_FOLDER, DASHBOARD_TEMPLATE_EXT, LEGACY_DB_EXT, TEAMS_FOLDER, TEAM_TEMPLATE_EXT,
};
use crate::error::Result;

/// One legacy `<name>.ldb` directory and the project files it holds
#[derive(Debug, Clone)]
pub struct LegacyDatabase {
    pub name: String,
    pub dir: PathBuf,
    pub project_files: Vec<PathBuf>,
}

/// Template files found under the legacy root
#[derive(Debug, Clone, Default)]
pub struct TemplateFiles {
    pub teams: Vec<PathBuf>,
    pub dashboards: Vec<PathBuf>,
}

impl TemplateFiles {
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty() && self.dashboards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.teams.len() + self.dashboards.len()
    }
}

/// Discover every legacy database directly under `db_dir`
pub fn discover_databases(db_dir: &Path) -> Result<Vec<LegacyDatabase>> {
    let mut databases = Vec::new();

    if !db_dir.is_dir() {
        log::warn!("Legacy database root {} does not exist", db_dir.display());
        return Ok(databases);
    }

    for dir in list_entries(db_dir)? {
        if !dir.is_dir() {
            continue;
        }
        let Some(name) = database_name(&dir) else {
            continue;
        };

        let project_files = list_entries(&dir)?
            .into_iter()
            .filter(|f| f.is_file() && !has_extension(f, LEGACY_DB_EXT))
            .collect();

        databases.push(LegacyDatabase {
            name,
            dir,
            project_files,
        });
    }

    Ok(databases)
}

/// Discover the shared team and dashboard templates.
/// Returns `None` when the `teams` folder does not exist.
pub fn discover_template_files(db_dir: &Path) -> Result<Option<TemplateFiles>> {
    let teams_dir = db_dir.join(TEAMS_FOLDER);
    if !teams_dir.is_dir() {
        return Ok(None);
    }

    let teams = list_entries(&teams_dir)?
        .into_iter()
        .filter(|f| f.is_file() && has_extension(f, TEAM_TEMPLATE_EXT))
        .collect();

    let analysis_dir = db_dir.join(ANALYSIS_FOLDER);
    let dashboards = if analysis_dir.is_dir() {
        list_entries(&analysis_dir)?
            .into_iter()
            .filter(|f| f.is_file() && has_extension(f, DASHBOARD_TEMPLATE_EXT))
            .collect()
    } else {
        Vec::new()
    };

    Ok(Some(TemplateFiles { teams, dashboards }))
}

/// Every regular file directly inside `dir`, sorted. Missing dirs are empty.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    Ok(list_entries(dir)?.into_iter().filter(|p| p.is_file()).collect())
}

/// Logical database name: directory name minus the `.ldb` suffix
pub fn database_name(dir: &Path) -> Option<String> {
    let file_name = dir.file_name()?.to_str()?;
    let suffix = format!(".{}", LEGACY_DB_EXT);
    let lower = file_name.to_lowercase();
    if !lower.ends_with(&suffix) {
        return None;
    }
    Some(file_name[..file_name.len() - suffix.len()].to_string())
}

/// Check a file extension, ignoring case
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Direct children of `dir`, sorted by path for consistent ordering
fn list_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
        })?;
        entries.push(entry.into_path());
    }
    entries.sort();
    Ok(entries)
}
