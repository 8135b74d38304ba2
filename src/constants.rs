// VAS Migration Constants
// Legacy layout values must match what pre-document-store releases wrote to disk.

// Legacy layout
pub const LEGACY_DB_EXT: &str = "ldb";
pub const TEAMS_FOLDER: &str = "teams";
pub const ANALYSIS_FOLDER: &str = "analysis";
pub const TEAM_TEMPLATE_EXT: &str = "ltt";
pub const DASHBOARD_TEMPLATE_EXT: &str = "lct";

// Backup locations
pub const DB_BACKUP_FOLDER: &str = "old";
pub const TEMPLATES_BACKUP_FOLDER: &str = "backup";

// Destination store
pub const STORE_EXT: &str = "vasdb";
pub const TEMPLATES_STORE_NAME: &str = "templates";
pub const STORE_NAME_PATTERN: &str = r"^[a-z][a-z0-9_$()+\-]*$";
pub const DB_MAJOR_VERSION: u32 = 1;
pub const DB_MINOR_VERSION: u32 = 0;
pub const COMPACT_AFTER_DAYS: i64 = 2;

// Document versions stamped on migrated aggregates
pub const PROJECT_VERSION: u32 = 1;
pub const TEAM_VERSION: u32 = 1;
pub const DASHBOARD_VERSION: u32 = 1;

// Document types
pub const DOC_TYPE_PROJECT: &str = "Project";
pub const DOC_TYPE_TEAM: &str = "Team";
pub const DOC_TYPE_DASHBOARD: &str = "Dashboard";

// Hashing
pub const HASH_CHUNK_SIZE: usize = 1_048_576; // 1MB

// Default paths (relative to the user home)
pub const VAS_HOME_FOLDER: &str = ".vas";
pub const DEFAULT_DB_FOLDER: &str = "db";
pub const DEFAULT_TEMPLATES_FOLDER: &str = "templates";
pub const DEFAULT_STORAGE_FOLDER: &str = "storage";

// Backup name clash resolution
pub const MAX_UNIQUE_SUFFIX: u32 = 1000;
