// Structured outcome of a migration run

use std::path::{Path, PathBuf};

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Discover,
    Seed,
    OpenDatabase,
    Load,
    Remap,
    Insert,
    Backup,
}

/// One unit (file, aggregate or database) that could not be migrated
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitFailure {
    pub unit: String,
    pub stage: FailureStage,
    pub error: String,
}

impl UnitFailure {
    pub fn new(unit: impl Into<String>, stage: FailureStage, error: impl ToString) -> Self {
        Self {
            unit: unit.into(),
            stage,
            error: error.to_string(),
        }
    }

    pub fn for_path(path: &Path, stage: FailureStage, error: impl ToString) -> Self {
        Self::new(path.display().to_string(), stage, error)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseStatus {
    /// Every project was migrated
    Migrated,
    /// Some projects failed; the rest were migrated
    Partial,
    /// The destination could not be opened; sources left in place
    Skipped,
    /// Stopped by cancellation; sources left in place
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseReport {
    pub name: String,
    pub source_dir: PathBuf,
    pub destination: Option<String>,
    pub projects_total: usize,
    pub projects_migrated: usize,
    pub status: DatabaseStatus,
    pub failures: Vec<UnitFailure>,
    pub backup_path: Option<PathBuf>,
}

impl DatabaseReport {
    pub fn new(name: &str, source_dir: &Path, projects_total: usize) -> Self {
        Self {
            name: name.to_string(),
            source_dir: source_dir.to_path_buf(),
            destination: None,
            projects_total,
            projects_migrated: 0,
            status: DatabaseStatus::Migrated,
            failures: Vec::new(),
            backup_path: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == DatabaseStatus::Migrated && self.failures.is_empty()
    }

    /// Sources are relocated only once every project was processed
    pub fn should_back_up(&self) -> bool {
        matches!(self.status, DatabaseStatus::Migrated | DatabaseStatus::Partial)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TemplatesStatus {
    /// The legacy `teams` folder does not exist
    MissingRoot,
    /// Nothing to migrate
    Empty,
    Migrated,
    /// Template discovery itself failed
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatesReport {
    pub status: TemplatesStatus,
    pub teams_total: usize,
    pub teams_migrated: usize,
    pub dashboards_total: usize,
    pub dashboards_migrated: usize,
    pub failures: Vec<UnitFailure>,
    pub backed_up: Vec<PathBuf>,
}

impl TemplatesReport {
    pub fn with_status(status: TemplatesStatus) -> Self {
        Self {
            status,
            teams_total: 0,
            teams_migrated: 0,
            dashboards_total: 0,
            dashboards_migrated: 0,
            failures: Vec::new(),
            backed_up: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        match self.status {
            TemplatesStatus::Empty => true,
            TemplatesStatus::Migrated => self.failures.is_empty(),
            TemplatesStatus::MissingRoot | TemplatesStatus::Failed | TemplatesStatus::Cancelled => {
                false
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub databases: Vec<DatabaseReport>,
    pub templates: TemplatesReport,
    /// Failures not tied to one database or template
    pub failures: Vec<UnitFailure>,
    pub cancelled: bool,
}

impl MigrationReport {
    /// True only if no document failed and the run was not cancelled
    pub fn succeeded(&self) -> bool {
        !self.cancelled
            && self.failures.is_empty()
            && self.databases.iter().all(DatabaseReport::succeeded)
            && self.templates.succeeded()
    }

    pub fn all_failures(&self) -> impl Iterator<Item = &UnitFailure> {
        self.failures
            .iter()
            .chain(self.databases.iter().flat_map(|d| d.failures.iter()))
            .chain(self.templates.failures.iter())
    }

    pub fn projects_migrated(&self) -> usize {
        self.databases.iter().map(|d| d.projects_migrated).sum()
    }
}
