// VAS legacy migration - library entry point

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod hash;
pub mod legacy;
pub mod migration;
pub mod model;
pub mod progress;
pub mod remap;

pub use config::MigrationConfig;
pub use db::{Storage, StorageManager};
pub use error::{MigrationError, Result};
pub use migration::{CancellationToken, DatabaseMigration, MigrationReport};
pub use progress::{JsonLinesReporter, LogReporter, NullReporter, ProgressReport};
