// Legacy database migration orchestrator
//
// A run has two strictly ordered phases: every legacy project database first,
// then the shared team and dashboard templates, so that team names seen in
// projects are registered before standalone team files are migrated.

pub mod backup;
pub mod projects;
pub mod report;
pub mod templates;

#[cfg(test)]
mod tests;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::MigrationConfig;
use crate::db::StorageManager;
use crate::error::{MigrationError, Result};
use crate::model::{Dashboard, Team};
use crate::progress::ProgressReport;
use crate::remap::IdMaps;

pub use report::{
    DatabaseReport, DatabaseStatus, FailureStage, MigrationReport, TemplatesReport,
    TemplatesStatus, UnitFailure,
};

/// Cooperative cancellation shared with the caller. Units that have not
/// started when it fires are skipped and their sources stay in place.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of one unit of work inside a fork-join phase
pub(crate) enum Unit<T> {
    Done(T),
    Failed(UnitFailure),
    Cancelled,
}

/// Run one unit, turning a panic into a failure so siblings keep going.
pub(crate) fn guard_unit<T>(
    unit: &str,
    stage: FailureStage,
    f: impl FnOnce() -> std::result::Result<T, UnitFailure>,
) -> Unit<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Unit::Done(value),
        Ok(Err(failure)) => {
            log::error!("{} failed during {:?}: {}", failure.unit, failure.stage, failure.error);
            Unit::Failed(failure)
        }
        Err(_) => {
            log::error!("{} panicked during {:?} (recovered)", unit, stage);
            Unit::Failed(UnitFailure::new(unit, stage, "panicked (recovered)"))
        }
    }
}

pub struct DatabaseMigration {
    config: MigrationConfig,
    manager: Arc<StorageManager>,
    progress: Arc<dyn ProgressReport>,
    cancel: CancellationToken,
    pool: rayon::ThreadPool,
}

impl DatabaseMigration {
    pub fn new(
        config: MigrationConfig,
        manager: Arc<StorageManager>,
        progress: Arc<dyn ProgressReport>,
    ) -> Result<Self> {
        config.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("migrate-{}", i))
            .build()
            .map_err(|e| MigrationError::Other(format!("Cannot start worker pool: {}", e)))?;

        Ok(Self {
            config,
            manager,
            progress,
            cancel: CancellationToken::new(),
            pool,
        })
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run the whole migration. Never fails: every problem is recorded in
    /// the returned report.
    pub fn start(&self) -> MigrationReport {
        let maps = IdMaps::new();
        let mut failures = Vec::new();

        if let Err(e) = self.seed_maps(&maps) {
            log::warn!("Could not read previously migrated templates: {}", e);
            failures.push(UnitFailure::new("templates", FailureStage::Seed, e));
        }

        let databases = match self.migrate_projects_databases(&maps) {
            Ok(databases) => databases,
            Err(e) => {
                log::error!("Could not migrate project databases: {}", e);
                failures.push(UnitFailure::for_path(&self.config.db_dir, FailureStage::Discover, e));
                Vec::new()
            }
        };

        let templates = self.migrate_teams_and_dashboards(&maps);

        let report = MigrationReport {
            databases,
            templates,
            failures,
            cancelled: self.is_cancelled(),
        };

        if report.succeeded() {
            log::info!("Migration finished: {} projects migrated", report.projects_migrated());
        } else {
            log::warn!(
                "Migration finished with {} failures",
                report.all_failures().count()
            );
        }
        report
    }

    /// Register names already present in the templates store so a re-run
    /// keeps the identifiers of the first run.
    fn seed_maps(&self, maps: &IdMaps) -> Result<()> {
        let templates = self.manager.templates()?;

        for team in templates.retrieve_all::<Team>()? {
            maps.teams.register(&team.name, team.id);
        }
        for dashboard in templates.retrieve_all::<Dashboard>()? {
            maps.dashboards.register(&dashboard.name, dashboard.id);
            for score in dashboard.scores() {
                maps.scores.register(&score.name, score.id);
            }
            for card in dashboard.penalty_cards() {
                maps.penalties.register(&card.name, card.id);
            }
        }

        log::debug!(
            "Seeded {} teams and {} dashboards from the templates store",
            maps.teams.len(),
            maps.dashboards.len()
        );
        Ok(())
    }
}
