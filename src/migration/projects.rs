// Phase 1: legacy project databases

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use uuid::Uuid;

use crate::constants::DB_BACKUP_FOLDER;
use crate::db::Storage;
use crate::error::Result;
use crate::legacy::{self, discover_databases, LegacyDatabase};
use crate::model::Project;
use crate::progress::ProgressCounter;
use crate::remap::{self, IdMaps};

use super::backup::move_dir_replacing;
use super::{
    guard_unit, DatabaseMigration, DatabaseReport, DatabaseStatus, FailureStage, Unit,
    UnitFailure,
};

impl DatabaseMigration {
    /// Migrate every legacy database, then move the processed ones to `old/`.
    pub fn migrate_projects_databases(&self, maps: &IdMaps) -> Result<Vec<DatabaseReport>> {
        let task = Uuid::new_v4();
        self.progress.report(0.0, "Migrating databases", task);

        let legacy_databases = discover_databases(&self.config.db_dir)?;
        let total = legacy_databases.len();
        let mut reports = Vec::with_capacity(total);

        for (idx, legacy) in legacy_databases.iter().enumerate() {
            let report = if self.is_cancelled() {
                let mut report =
                    DatabaseReport::new(&legacy.name, &legacy.dir, legacy.project_files.len());
                report.status = DatabaseStatus::Cancelled;
                report
            } else {
                self.migrate_db(maps, legacy)
            };
            reports.push(report);

            let fraction = (idx + 1) as f64 / total as f64;
            self.progress
                .report(fraction, &format!("Migrated database {}", legacy.name), task);
        }

        // Now that all the databases have been migrated, move the old ones to a backup directory
        let backup_dir = self.config.db_dir.join(DB_BACKUP_FOLDER);
        for report in reports.iter_mut().filter(|r| r.should_back_up()) {
            let Some(dir_name) = report.source_dir.file_name() else {
                continue;
            };
            let dest = backup_dir.join(dir_name);
            match move_dir_replacing(&report.source_dir, &dest) {
                Ok(()) => report.backup_path = Some(dest),
                Err(e) => {
                    log::error!("Could not back up {}: {}", report.source_dir.display(), e);
                    report
                        .failures
                        .push(UnitFailure::for_path(&report.source_dir, FailureStage::Backup, e));
                }
            }
        }

        self.progress.report(1.0, "Databases migrated", task);
        Ok(reports)
    }

    /// Migrate all projects of one legacy database into its destination store.
    pub fn migrate_db(&self, maps: &IdMaps, legacy: &LegacyDatabase) -> DatabaseReport {
        let task = Uuid::new_v4();
        let mut report = DatabaseReport::new(&legacy.name, &legacy.dir, legacy.project_files.len());

        log::info!("Start migrating {}", legacy.name);

        let database = match self.open_destination(&legacy.name) {
            Ok(database) => database,
            Err(failure) => {
                report.status = DatabaseStatus::Skipped;
                report.failures.push(failure);
                return report;
            }
        };
        report.destination = Some(database.name().to_string());

        let counter = ProgressCounter::new(legacy.project_files.len() * 2);

        // Load every project file; the barrier guarantees all local team
        // names are known before any project is rewritten.
        let loaded: Vec<Unit<(PathBuf, Project)>> = self.pool.install(|| {
            legacy
                .project_files
                .par_iter()
                .map(|file| self.load_project(file, &counter, task))
                .collect()
        });

        let mut projects = Vec::new();
        let mut cancelled = false;
        for unit in loaded {
            match unit {
                Unit::Done(project) => projects.push(project),
                Unit::Failed(failure) => report.failures.push(failure),
                Unit::Cancelled => cancelled = true,
            }
        }

        if let Err(e) = register_teams(maps, &database, &projects) {
            log::error!("Could not read teams stored in {}: {}", database.name(), e);
            report
                .failures
                .push(UnitFailure::new(database.name(), FailureStage::Seed, e));
        }

        let migrated: Vec<Unit<()>> = self.pool.install(|| {
            projects
                .into_par_iter()
                .map(|(file, project)| {
                    self.rewrite_and_insert(file, project, maps, &database, &counter, task)
                })
                .collect()
        });

        for unit in migrated {
            match unit {
                Unit::Done(()) => report.projects_migrated += 1,
                Unit::Failed(failure) => report.failures.push(failure),
                Unit::Cancelled => cancelled = true,
            }
        }

        report.status = if cancelled {
            DatabaseStatus::Cancelled
        } else if report.failures.is_empty() {
            DatabaseStatus::Migrated
        } else {
            DatabaseStatus::Partial
        };

        log::info!(
            "Database {} migrated: {} of {} projects",
            legacy.name,
            report.projects_migrated,
            report.projects_total
        );
        report
    }

    /// Create the destination store, or reuse it when it already exists.
    fn open_destination(&self, name: &str) -> std::result::Result<Arc<Storage>, UnitFailure> {
        match self.manager.add(name) {
            Ok(database) => Ok(database),
            Err(add_error) => match self.manager.find(name) {
                Some(database) => {
                    log::info!("Reusing existing database {}", database.name());
                    Ok(database)
                }
                None => {
                    log::error!("Database with name {} could not be opened: {}", name, add_error);
                    Err(UnitFailure::new(name, FailureStage::OpenDatabase, add_error))
                }
            },
        }
    }

    fn load_project(
        &self,
        file: &Path,
        counter: &ProgressCounter,
        task: Uuid,
    ) -> Unit<(PathBuf, Project)> {
        if self.is_cancelled() {
            return Unit::Cancelled;
        }

        let unit = file.display().to_string();
        log::info!("Migrating project {}", unit);
        let result = guard_unit(&unit, FailureStage::Load, || {
            legacy::load::<Project>(file)
                .map(|project| (file.to_path_buf(), project))
                .map_err(|e| UnitFailure::for_path(file, FailureStage::Load, e))
        });

        // A file that did not load never reaches the rewrite step
        let (fraction, title) = match &result {
            Unit::Done((_, project)) => (counter.advance(), project.title()),
            _ => (counter.advance_by(2), file_label(file)),
        };
        self.progress
            .report(fraction, &format!("Imported project {}", title), task);
        result
    }

    fn rewrite_and_insert(
        &self,
        file: PathBuf,
        mut project: Project,
        maps: &IdMaps,
        database: &Storage,
        counter: &ProgressCounter,
        task: Uuid,
    ) -> Unit<()> {
        if self.is_cancelled() {
            return Unit::Cancelled;
        }

        let title = project.title();
        let unit = file.display().to_string();
        let result = guard_unit(&unit, FailureStage::Remap, || {
            remap::migrate_project(&mut project, maps)
                .map_err(|e| UnitFailure::for_path(&file, FailureStage::Remap, e))?;
            database
                .store_project(&project)
                .map_err(|e| UnitFailure::for_path(&file, FailureStage::Insert, e))?;
            Ok(())
        });

        let fraction = counter.advance();
        self.progress
            .report(fraction, &format!("Migrated project {}", title), task);
        result
    }
}

/// Single-threaded registration of team names, strictly between the load
/// and rewrite barriers. Teams already stored in the destination come first,
/// then the loaded projects in file order; the first id seen for a name wins.
/// Project teams are registered even when the stored ones cannot be read.
fn register_teams(
    maps: &IdMaps,
    database: &Storage,
    projects: &[(PathBuf, Project)],
) -> Result<()> {
    let stored = database.team_references();
    if let Ok(references) = &stored {
        for (name, id) in references {
            maps.teams.register(name, *id);
        }
    }

    for (_, project) in projects {
        for team in [&project.local_team_template, &project.visitor_team_template] {
            if !team.id.is_nil() {
                maps.teams.register(&team.name, team.id);
            }
        }
    }

    stored.map(|_| ())
}

fn file_label(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.display().to_string())
}
