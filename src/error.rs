// VAS Migration Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid database name: {0:?}")]
    InvalidDatabaseName(String),

    #[error("Database already exists: {0}")]
    DatabaseExists(String),

    #[error("Database schema version {found} is newer than this build supports (max {supported})")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Remap error: {0}")]
    Remap(String),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, MigrationError>;
