// Migration configuration: where the legacy data lives and where it goes

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DB_FOLDER, DEFAULT_STORAGE_FOLDER, DEFAULT_TEMPLATES_FOLDER, VAS_HOME_FOLDER,
};
use crate::error::{MigrationError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Legacy root: `*.ldb` directories plus `teams/` and `analysis/`
    pub db_dir: PathBuf,
    /// Templates root; migrated template files are archived in `backup/` below it
    pub templates_dir: PathBuf,
    /// Destination document stores
    pub storage_dir: PathBuf,
    /// Worker threads for the parallel phases
    pub workers: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self::with_root(&default_root())
    }
}

impl MigrationConfig {
    /// Lay out all folders below a single root
    pub fn with_root(root: &Path) -> Self {
        Self {
            db_dir: root.join(DEFAULT_DB_FOLDER),
            templates_dir: root.join(DEFAULT_TEMPLATES_FOLDER),
            storage_dir: root.join(DEFAULT_STORAGE_FOLDER),
            workers: default_workers(),
        }
    }

    /// Load a JSON config file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MigrationError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(MigrationError::Config("workers must be at least 1".to_string()));
        }
        if self.db_dir.as_os_str().is_empty() || self.storage_dir.as_os_str().is_empty() {
            return Err(MigrationError::Config("db_dir and storage_dir are required".to_string()));
        }
        Ok(())
    }
}

/// ~/.vas, or ./.vas when no home directory can be determined
pub fn default_root() -> PathBuf {
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(VAS_HOME_FOLDER),
        None => PathBuf::from(VAS_HOME_FOLDER),
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_with_root_layout() {
        let config = MigrationConfig::with_root(Path::new("/data/vas"));
        assert_eq!(config.db_dir, PathBuf::from("/data/vas/db"));
        assert_eq!(config.templates_dir, PathBuf::from("/data/vas/templates"));
        assert_eq!(config.storage_dir, PathBuf::from("/data/vas/storage"));
        assert!(config.workers >= 1);
    }

    #[test]
    fn test_load_partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("migrate.json");
        std::fs::write(&path, r#"{"db_dir": "/legacy", "workers": 3}"#).unwrap();

        let config = MigrationConfig::load(&path).unwrap();
        assert_eq!(config.db_dir, PathBuf::from("/legacy"));
        assert_eq!(config.workers, 3);
        assert_eq!(config.storage_dir, MigrationConfig::default().storage_dir);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("migrate.json");
        std::fs::write(&path, r#"{"workers": 0}"#).unwrap();

        assert!(matches!(MigrationConfig::load(&path), Err(MigrationError::Config(_))));
    }
}
