// Phase 2: shared team and dashboard templates

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use uuid::Uuid;

use crate::constants::{ANALYSIS_FOLDER, TEAMS_FOLDER, TEMPLATES_BACKUP_FOLDER};
use crate::db::Storage;
use crate::legacy::{self, discover::list_files, discover_template_files, TemplateFiles};
use crate::model::{Dashboard, Team};
use crate::progress::ProgressCounter;
use crate::remap::{self, IdMaps};

use super::backup::move_file_to_dir;
use super::{
    guard_unit, DatabaseMigration, FailureStage, TemplatesReport, TemplatesStatus, Unit,
    UnitFailure,
};

impl DatabaseMigration {
    /// Migrate the standalone team and dashboard templates into the templates
    /// store, then archive every legacy template file.
    pub fn migrate_teams_and_dashboards(&self, maps: &IdMaps) -> TemplatesReport {
        let task = Uuid::new_v4();
        self.progress.report(0.0, "Migrating templates", task);

        if self.is_cancelled() {
            return TemplatesReport::with_status(TemplatesStatus::Cancelled);
        }

        let files = match discover_template_files(&self.config.db_dir) {
            Ok(Some(files)) => files,
            Ok(None) => {
                log::warn!(
                    "Templates folder {} not found",
                    self.config.db_dir.join(TEAMS_FOLDER).display()
                );
                return TemplatesReport::with_status(TemplatesStatus::MissingRoot);
            }
            Err(e) => {
                let mut report = TemplatesReport::with_status(TemplatesStatus::Failed);
                report
                    .failures
                    .push(UnitFailure::for_path(&self.config.db_dir, FailureStage::Discover, e));
                return report;
            }
        };

        if files.is_empty() {
            self.progress.report(1.0, "No templates to migrate", task);
            return TemplatesReport::with_status(TemplatesStatus::Empty);
        }

        let mut report = TemplatesReport::with_status(TemplatesStatus::Migrated);
        report.teams_total = files.teams.len();
        report.dashboards_total = files.dashboards.len();

        // A store that cannot be opened fails every template, but the legacy
        // files are still archived
        match self.manager.templates() {
            Ok(templates) => {
                if !self.migrate_templates(&files, &templates, maps, task, &mut report) {
                    report.status = TemplatesStatus::Cancelled;
                    return report;
                }
            }
            Err(e) => {
                log::error!("Could not open the templates store: {}", e);
                report.status = TemplatesStatus::Failed;
                report
                    .failures
                    .push(UnitFailure::new("templates", FailureStage::OpenDatabase, e));
            }
        }

        // Backup all the templates, migrated or not
        self.back_up_templates(&mut report);

        self.progress.report(1.0, "Templates migrated", task);
        report
    }

    /// Load and migrate every template file into `templates`. Returns false
    /// when the run was cancelled before all units were processed.
    fn migrate_templates(
        &self,
        files: &TemplateFiles,
        templates: &Storage,
        maps: &IdMaps,
        task: Uuid,
        report: &mut TemplatesReport,
    ) -> bool {
        let counter = ProgressCounter::new(files.len() * 2 + 1);
        let (teams, dashboards) = self.load_templates(files, &counter, task, report);

        if self.is_cancelled() {
            return false;
        }

        let (team_units, dashboard_units) = self.pool.install(|| {
            rayon::join(
                || {
                    teams
                        .into_par_iter()
                        .map(|(file, team)| {
                            self.migrate_team_file(file, team, maps, templates, &counter, task)
                        })
                        .collect::<Vec<_>>()
                },
                || {
                    dashboards
                        .into_par_iter()
                        .map(|(file, dashboard)| {
                            self.migrate_dashboard_file(
                                file, dashboard, maps, templates, &counter, task,
                            )
                        })
                        .collect::<Vec<_>>()
                },
            )
        });

        let mut cancelled = false;
        for unit in team_units {
            match unit {
                Unit::Done(()) => report.teams_migrated += 1,
                Unit::Failed(failure) => report.failures.push(failure),
                Unit::Cancelled => cancelled = true,
            }
        }
        for unit in dashboard_units {
            match unit {
                Unit::Done(()) => report.dashboards_migrated += 1,
                Unit::Failed(failure) => report.failures.push(failure),
                Unit::Cancelled => cancelled = true,
            }
        }

        !cancelled
    }

    /// Deserialize the template files one by one in path order
    fn load_templates(
        &self,
        files: &TemplateFiles,
        counter: &ProgressCounter,
        task: Uuid,
        report: &mut TemplatesReport,
    ) -> (Vec<(PathBuf, Team)>, Vec<(PathBuf, Dashboard)>) {
        let mut teams = Vec::with_capacity(files.teams.len());
        for file in &files.teams {
            match legacy::load::<Team>(file) {
                Ok(team) => {
                    self.progress.report(
                        counter.advance(),
                        &format!("Imported team {}", team.name),
                        task,
                    );
                    teams.push((file.clone(), team));
                }
                Err(e) => {
                    log::error!("Error loading team {}: {}", file.display(), e);
                    counter.advance_by(2);
                    report
                        .failures
                        .push(UnitFailure::for_path(file, FailureStage::Load, e));
                }
            }
        }

        let mut dashboards = Vec::with_capacity(files.dashboards.len());
        for file in &files.dashboards {
            match legacy::load::<Dashboard>(file) {
                Ok(dashboard) => {
                    self.progress.report(
                        counter.advance(),
                        &format!("Imported dashboard {}", dashboard.name),
                        task,
                    );
                    dashboards.push((file.clone(), dashboard));
                }
                Err(e) => {
                    log::error!("Error loading dashboard {}: {}", file.display(), e);
                    counter.advance_by(2);
                    report
                        .failures
                        .push(UnitFailure::for_path(file, FailureStage::Load, e));
                }
            }
        }

        (teams, dashboards)
    }

    fn migrate_team_file(
        &self,
        file: PathBuf,
        mut team: Team,
        maps: &IdMaps,
        templates: &Storage,
        counter: &ProgressCounter,
        task: Uuid,
    ) -> Unit<()> {
        if self.is_cancelled() {
            return Unit::Cancelled;
        }

        let unit = file.display().to_string();
        let result = guard_unit(&unit, FailureStage::Remap, || {
            remap::migrate_team(&mut team, &maps.teams)
                .map_err(|e| UnitFailure::for_path(&file, FailureStage::Remap, e))?;
            templates
                .store(&team)
                .map_err(|e| UnitFailure::for_path(&file, FailureStage::Insert, e))?;
            Ok(())
        });

        self.progress.report(
            counter.advance(),
            &format!("Migrated team {}", team.name),
            task,
        );
        result
    }

    fn migrate_dashboard_file(
        &self,
        file: PathBuf,
        mut dashboard: Dashboard,
        maps: &IdMaps,
        templates: &Storage,
        counter: &ProgressCounter,
        task: Uuid,
    ) -> Unit<()> {
        if self.is_cancelled() {
            return Unit::Cancelled;
        }

        let unit = file.display().to_string();
        let result = guard_unit(&unit, FailureStage::Remap, || {
            remap::migrate_dashboard(&mut dashboard, &maps.scores, &maps.penalties)
                .map_err(|e| UnitFailure::for_path(&file, FailureStage::Remap, e))?;
            dashboard.id = maps.dashboards.register(&dashboard.name, dashboard.id);
            templates
                .store(&dashboard)
                .map_err(|e| UnitFailure::for_path(&file, FailureStage::Insert, e))?;
            Ok(())
        });

        self.progress.report(
            counter.advance(),
            &format!("Migrated dashboard {}", dashboard.name),
            task,
        );
        result
    }

    /// Move every file of `teams/` and `analysis/` to the templates backup folder
    fn back_up_templates(&self, report: &mut TemplatesReport) {
        let backup_dir = self.config.templates_dir.join(TEMPLATES_BACKUP_FOLDER);

        for folder in [TEAMS_FOLDER, ANALYSIS_FOLDER] {
            let dir = self.config.db_dir.join(folder);
            let files = match list_files(&dir) {
                Ok(files) => files,
                Err(e) => {
                    report
                        .failures
                        .push(UnitFailure::for_path(&dir, FailureStage::Backup, e));
                    continue;
                }
            };
            for file in files {
                backup_file(&file, &backup_dir, report);
            }
        }
    }
}

fn backup_file(file: &Path, backup_dir: &Path, report: &mut TemplatesReport) {
    match move_file_to_dir(file, backup_dir) {
        Ok(dest) => {
            log::debug!("Moved {} to {}", file.display(), dest.display());
            report.backed_up.push(dest);
        }
        Err(e) => {
            log::error!("Could not back up {}: {}", file.display(), e);
            report
                .failures
                .push(UnitFailure::for_path(file, FailureStage::Backup, e));
        }
    }
}
