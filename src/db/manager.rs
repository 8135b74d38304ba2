// Registry of destination stores, addressed by logical name

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use regex::Regex;

use crate::constants::{STORE_EXT, STORE_NAME_PATTERN, TEMPLATES_STORE_NAME};
use crate::error::{MigrationError, Result};

use super::storage::Storage;

#[derive(Debug)]
pub struct StorageManager {
    storage_dir: PathBuf,
    databases: Mutex<Vec<Arc<Storage>>>,
    templates: Mutex<Option<Arc<Storage>>>,
}

/// Lower-case `name` and check it is a legal store name.
pub fn normalize_store_name(name: &str) -> Result<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(STORE_NAME_PATTERN).expect("store name pattern is a valid regex")
    });

    let lower = name.to_lowercase();
    if !pattern.is_match(&lower) {
        return Err(MigrationError::InvalidDatabaseName(name.to_string()));
    }
    Ok(lower)
}

impl StorageManager {
    /// Open the registry and every store already present in `storage_dir`.
    pub fn new(storage_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(storage_dir)?;

        let manager = Self {
            storage_dir: storage_dir.to_path_buf(),
            databases: Mutex::new(Vec::new()),
            templates: Mutex::new(None),
        };
        manager.update_databases()?;
        Ok(manager)
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    fn lock_databases(&self) -> Result<MutexGuard<'_, Vec<Arc<Storage>>>> {
        self.databases
            .lock()
            .map_err(|_| MigrationError::Other("Storage registry lock poisoned".to_string()))
    }

    fn store_path(&self, name: &str) -> PathBuf {
        self.storage_dir.join(format!("{}.{}", name, STORE_EXT))
    }

    /// Register every store file found on disk except the templates store.
    fn update_databases(&self) -> Result<()> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.storage_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(STORE_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if stem != TEMPLATES_STORE_NAME {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();

        let mut databases = self.lock_databases()?;
        for name in names {
            match Storage::open(&self.store_path(&name), &name) {
                Ok(storage) => databases.push(Arc::new(storage)),
                Err(e) => log::warn!("Could not open store {}: {}", name, e),
            }
        }
        Ok(())
    }

    /// Create a new store. Fails if a store with the same name is already
    /// registered; use [`StorageManager::find`] to reuse it.
    pub fn add(&self, name: &str) -> Result<Arc<Storage>> {
        let name = normalize_store_name(name)?;
        if name == TEMPLATES_STORE_NAME {
            return Err(MigrationError::InvalidDatabaseName(name));
        }

        let mut databases = self.lock_databases()?;
        if databases.iter().any(|d| d.name() == name) {
            return Err(MigrationError::DatabaseExists(name));
        }

        log::info!("Creating new database {}", name);
        let storage = Arc::new(Storage::open(&self.store_path(&name), &name)?);
        databases.push(Arc::clone(&storage));
        Ok(storage)
    }

    /// Registered store with the given logical name (case-insensitive).
    pub fn find(&self, name: &str) -> Option<Arc<Storage>> {
        let name = name.to_lowercase();
        let databases = self.databases.lock().ok()?;
        databases.iter().find(|d| d.name() == name).cloned()
    }

    pub fn databases(&self) -> Result<Vec<Arc<Storage>>> {
        Ok(self.lock_databases()?.clone())
    }

    /// The shared templates store, opened on first use.
    pub fn templates(&self) -> Result<Arc<Storage>> {
        let mut templates = self
            .templates
            .lock()
            .map_err(|_| MigrationError::Other("Templates store lock poisoned".to_string()))?;

        if let Some(storage) = templates.as_ref() {
            return Ok(Arc::clone(storage));
        }

        let storage = Arc::new(Storage::open(
            &self.store_path(TEMPLATES_STORE_NAME),
            TEMPLATES_STORE_NAME,
        )?);
        *templates = Some(Arc::clone(&storage));
        Ok(storage)
    }
}
