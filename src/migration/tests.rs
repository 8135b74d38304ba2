use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use uuid::Uuid;

use super::*;
use crate::config::MigrationConfig;
use crate::constants::DOC_TYPE_PROJECT;
use crate::db::{Document, StorageManager};
use crate::model::dashboard::ScoreButton;
use crate::model::{DashboardButton, Project, ProjectDescription, Score, TimelineEvent};
use crate::progress::ProgressReport;

#[derive(Default)]
struct RecordingReporter {
    reports: Mutex<Vec<(f64, String, Uuid)>>,
}

impl ProgressReport for RecordingReporter {
    fn report(&self, fraction: f64, message: &str, task: Uuid) {
        self.reports
            .lock()
            .unwrap()
            .push((fraction, message.to_string(), task));
    }
}

impl RecordingReporter {
    fn messages(&self) -> Vec<String> {
        self.reports.lock().unwrap().iter().map(|r| r.1.clone()).collect()
    }

    /// Highest fraction reported by the task that emitted `message`
    fn peak_fraction_of(&self, message: &str) -> Option<f64> {
        let reports = self.reports.lock().unwrap();
        let task = reports.iter().find(|r| r.1 == message)?.2;
        reports
            .iter()
            .filter(|r| r.2 == task)
            .map(|r| r.0)
            .reduce(f64::max)
    }
}

struct Fixture {
    _tmp: TempDir,
    config: MigrationConfig,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let mut config = MigrationConfig::with_root(tmp.path());
        config.workers = 4;
        fs::create_dir_all(&config.db_dir).unwrap();
        Self { _tmp: tmp, config }
    }

    fn db_dir(&self) -> &Path {
        &self.config.db_dir
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.config.db_dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn write_project(&self, relative: &str, project: &Project) {
        self.write(relative, &serde_json::to_string_pretty(project).unwrap());
    }

    fn write_team(&self, relative: &str, team: &Team) {
        self.write(relative, &serde_json::to_string(team).unwrap());
    }

    fn run(&self) -> (MigrationReport, Arc<StorageManager>, Arc<RecordingReporter>) {
        let manager = Arc::new(StorageManager::new(&self.config.storage_dir).unwrap());
        let reporter = Arc::new(RecordingReporter::default());
        let migration =
            DatabaseMigration::new(self.config.clone(), manager.clone(), reporter.clone()).unwrap();
        let report = migration.start();
        (report, manager, reporter)
    }
}

fn dashboard_with_goal() -> Dashboard {
    let mut dashboard = Dashboard::new("Football");
    dashboard.buttons.push(DashboardButton::Score(ScoreButton {
        name: "Goal".to_string(),
        score: Score {
            id: Uuid::new_v4(),
            name: "Goal".to_string(),
            points: 1,
        },
    }));
    dashboard
}

fn match_project(title: &str, local: &str, visitor: &str) -> Project {
    let local = Team::new(local);
    let visitor = Team::new(visitor);
    let timeline = vec![TimelineEvent {
        id: Uuid::nil(),
        name: "Goal".to_string(),
        event_type: "Goal".to_string(),
        teams: vec![local.id, visitor.id],
        players: Vec::new(),
        start: 1_000,
        stop: 6_000,
        tags: Vec::new(),
    }];

    Project {
        id: Uuid::new_v4(),
        version: 0,
        description: ProjectDescription {
            title: Some(title.to_string()),
            ..Default::default()
        },
        local_team_template: local,
        visitor_team_template: visitor,
        dashboard: dashboard_with_goal(),
        event_types: Vec::new(),
        timeline,
    }
}

fn find_project<'a>(projects: &'a [Project], title: &str) -> &'a Project {
    projects
        .iter()
        .find(|p| p.title() == title)
        .unwrap_or_else(|| panic!("project {} not stored", title))
}

#[test]
fn test_same_team_name_gets_one_identifier() {
    let fixture = Fixture::new();
    fixture.write_project("league2023.ldb/match1.json", &match_project("Match 1", "Eagles", "Hawks"));
    fixture.write_project("league2023.ldb/match2.json", &match_project("Match 2", "Lions", "Eagles"));
    fixture.write_team("teams/eagles.ltt", &Team::new("Eagles"));

    let (report, manager, _) = fixture.run();
    assert!(report.succeeded(), "{:?}", report);

    let database = manager.find("league2023").unwrap();
    let projects = database.retrieve_all::<Project>().unwrap();
    assert_eq!(projects.len(), 2);

    let first = find_project(&projects, "Match 1");
    let second = find_project(&projects, "Match 2");
    let eagles = first.local_team_template.id;
    assert_eq!(second.visitor_team_template.id, eagles);
    assert!(second.timeline[0].teams.contains(&eagles));
    assert!(!second.timeline[0].id.is_nil());

    // Scores with the same name share one id across projects
    let goal = |p: &Project| p.dashboard.scores().next().unwrap().id;
    assert_eq!(goal(first), goal(second));

    // The standalone template follows the projects
    let templates = manager.templates().unwrap();
    let team = templates.find_by_name::<Team>("Eagles").unwrap().unwrap();
    assert_eq!(team.id, eagles);
}

#[test]
fn test_corrupt_project_does_not_stop_the_others() {
    let fixture = Fixture::new();
    fixture.write_project("league.ldb/match1.json", &match_project("Match 1", "Eagles", "Hawks"));
    fixture.write_project("league.ldb/match2.json", &match_project("Match 2", "Hawks", "Lions"));
    fixture.write("league.ldb/broken.json", "{ \"ID\": ");
    fixture.write_project("cup.ldb/final.json", &match_project("Final", "Eagles", "Lions"));
    fixture.write("teams/.keep", "");

    let (report, manager, _) = fixture.run();
    assert!(!report.succeeded());

    let league = report.databases.iter().find(|d| d.name == "league").unwrap();
    assert_eq!(league.status, DatabaseStatus::Partial);
    assert_eq!(league.projects_total, 3);
    assert_eq!(league.projects_migrated, 2);
    assert_eq!(league.failures.len(), 1);
    assert_eq!(league.failures[0].stage, FailureStage::Load);
    assert!(league.failures[0].unit.ends_with("broken.json"));

    let cup = report.databases.iter().find(|d| d.name == "cup").unwrap();
    assert!(cup.succeeded());

    assert_eq!(manager.find("league").unwrap().count::<Project>().unwrap(), 2);
    assert_eq!(manager.find("cup").unwrap().count::<Project>().unwrap(), 1);

    // Processed databases are moved, broken file included
    assert!(!fixture.db_dir().join("league.ldb").exists());
    assert!(fixture.db_dir().join("old/league.ldb/broken.json").exists());
    assert!(fixture.db_dir().join("old/cup.ldb/final.json").exists());
}

#[test]
fn test_every_template_file_is_backed_up() {
    let fixture = Fixture::new();
    fixture.write_team("teams/eagles.ltt", &Team::new("Eagles"));
    fixture.write("teams/broken.ltt", "not json");
    fixture.write("teams/notes.txt", "kept aside");
    fixture.write("analysis/football.lct", &serde_json::to_string(&dashboard_with_goal()).unwrap());

    let backup = fixture.config.templates_dir.join("backup");
    fs::create_dir_all(&backup).unwrap();
    fs::write(backup.join("eagles.ltt"), "previous run").unwrap();

    let (report, manager, _) = fixture.run();
    let templates = &report.templates;

    assert_eq!(templates.status, TemplatesStatus::Migrated);
    assert!(!templates.succeeded());
    assert_eq!(templates.teams_total, 2);
    assert_eq!(templates.teams_migrated, 1);
    assert_eq!(templates.dashboards_migrated, 1);
    assert_eq!(templates.backed_up.len(), 4);

    assert!(fs::read_dir(fixture.db_dir().join("teams")).unwrap().next().is_none());
    assert!(fs::read_dir(fixture.db_dir().join("analysis")).unwrap().next().is_none());
    assert!(backup.join("eagles_1.ltt").exists());
    assert!(backup.join("broken.ltt").exists());
    assert!(backup.join("notes.txt").exists());
    assert!(backup.join("football.lct").exists());
    assert_eq!(fs::read_to_string(backup.join("eagles.ltt")).unwrap(), "previous run");

    let store = manager.templates().unwrap();
    assert_eq!(store.count::<Team>().unwrap(), 1);
    assert_eq!(store.count::<Dashboard>().unwrap(), 1);
}

#[test]
fn test_empty_templates_short_circuit() {
    let fixture = Fixture::new();
    fs::create_dir_all(fixture.db_dir().join("teams")).unwrap();

    let (report, _, reporter) = fixture.run();

    assert_eq!(report.templates.status, TemplatesStatus::Empty);
    assert!(report.templates.succeeded());
    assert!(report.succeeded());
    assert_eq!(reporter.peak_fraction_of("Migrating templates"), Some(1.0));
    assert!(!fixture.config.templates_dir.join("backup").exists());
}

#[test]
fn test_missing_teams_folder_fails_without_error() {
    let fixture = Fixture::new();
    fixture.write_project("league.ldb/match1.json", &match_project("Match 1", "Eagles", "Hawks"));

    let (report, manager, _) = fixture.run();

    assert_eq!(report.templates.status, TemplatesStatus::MissingRoot);
    assert!(!report.succeeded());
    // Project databases are still migrated
    assert_eq!(manager.find("league").unwrap().count::<Project>().unwrap(), 1);
}

#[test]
fn test_rerun_keeps_identifiers() {
    let fixture = Fixture::new();
    fixture.write_team("teams/eagles.ltt", &Team::new("Eagles"));
    fixture.write_project("league.ldb/match1.json", &match_project("Match 1", "Eagles", "Hawks"));

    let (first, manager, _) = fixture.run();
    assert!(first.succeeded(), "{:?}", first);
    let eagles = manager
        .templates()
        .unwrap()
        .find_by_name::<Team>("Eagles")
        .unwrap()
        .unwrap()
        .id;
    drop(manager);

    // Same names again, with fresh legacy identifiers
    fixture.write_team("teams/eagles.ltt", &Team::new("Eagles"));
    fixture.write_project("league.ldb/match2.json", &match_project("Match 2", "Lions", "Eagles"));

    let (second, manager, _) = fixture.run();
    assert!(second.succeeded(), "{:?}", second);

    let templates = manager.templates().unwrap();
    assert_eq!(templates.count::<Team>().unwrap(), 1);
    assert_eq!(templates.find_by_name::<Team>("Eagles").unwrap().unwrap().id, eagles);

    let projects = manager.find("league").unwrap().retrieve_all::<Project>().unwrap();
    assert_eq!(projects.len(), 2);
    assert_eq!(find_project(&projects, "Match 2").visitor_team_template.id, eagles);
}

#[test]
fn test_invalid_database_name_is_skipped() {
    let fixture = Fixture::new();
    fixture.write_project("2023.ldb/match1.json", &match_project("Match 1", "Eagles", "Hawks"));
    fixture.write("teams/.keep", "");

    let (report, manager, _) = fixture.run();

    let database = &report.databases[0];
    assert_eq!(database.status, DatabaseStatus::Skipped);
    assert_eq!(database.failures[0].stage, FailureStage::OpenDatabase);
    assert!(!report.succeeded());
    assert!(manager.databases().unwrap().is_empty());
    // Sources stay in place for a later attempt
    assert!(fixture.db_dir().join("2023.ldb/match1.json").exists());
}

#[test]
fn test_cancelled_run_leaves_sources_in_place() {
    let fixture = Fixture::new();
    fixture.write_project("league.ldb/match1.json", &match_project("Match 1", "Eagles", "Hawks"));
    fixture.write_team("teams/eagles.ltt", &Team::new("Eagles"));

    let manager = Arc::new(StorageManager::new(&fixture.config.storage_dir).unwrap());
    let migration = DatabaseMigration::new(
        fixture.config.clone(),
        manager,
        Arc::new(RecordingReporter::default()),
    )
    .unwrap();
    migration.cancellation_token().cancel();

    let report = migration.start();

    assert!(report.cancelled);
    assert!(!report.succeeded());
    assert_eq!(report.databases[0].status, DatabaseStatus::Cancelled);
    assert_eq!(report.templates.status, TemplatesStatus::Cancelled);
    assert!(fixture.db_dir().join("league.ldb/match1.json").exists());
    assert!(fixture.db_dir().join("teams/eagles.ltt").exists());
}

#[test]
fn test_progress_reaches_completion() {
    let fixture = Fixture::new();
    fixture.write_project("league.ldb/match1.json", &match_project("Match 1", "Eagles", "Hawks"));
    fixture.write_project("league.ldb/match2.json", &match_project("Match 2", "Lions", "Eagles"));
    fixture.write_team("teams/eagles.ltt", &Team::new("Eagles"));

    let (_, _, reporter) = fixture.run();
    let messages = reporter.messages();

    assert!(messages.contains(&"Imported project Match 1".to_string()));
    assert!(messages.contains(&"Migrated project Match 2".to_string()));
    assert!(messages.contains(&"Migrated team Eagles".to_string()));
    assert_eq!(reporter.peak_fraction_of("Migrating databases"), Some(1.0));
    assert_eq!(reporter.peak_fraction_of("Migrating templates"), Some(1.0));
    assert_eq!(reporter.peak_fraction_of("Imported project Match 1"), Some(1.0));
}

#[test]
fn test_progress_completes_despite_unreadable_files() {
    let fixture = Fixture::new();
    fixture.write_project("league.ldb/match1.json", &match_project("Match 1", "Eagles", "Hawks"));
    fixture.write_project("league.ldb/match2.json", &match_project("Match 2", "Lions", "Eagles"));
    fixture.write("league.ldb/broken.json", "{ \"ID\": ");
    fixture.write_team("teams/eagles.ltt", &Team::new("Eagles"));
    fixture.write("teams/broken.ltt", "not json");

    let (report, _, reporter) = fixture.run();
    assert!(!report.succeeded());

    assert_eq!(reporter.peak_fraction_of("Imported project Match 1"), Some(1.0));
    assert_eq!(reporter.peak_fraction_of("Imported team Eagles"), Some(1.0));

    let reports = reporter.reports.lock().unwrap();
    let templates_task = reports.iter().find(|r| r.1 == "Migrating templates").unwrap().2;
    let last = reports.iter().rev().find(|r| r.2 == templates_task).unwrap();
    assert_eq!((last.0, last.1.as_str()), (1.0, "Templates migrated"));
}

#[test]
fn test_templates_backed_up_when_store_cannot_open() {
    let fixture = Fixture::new();
    fixture.write_team("teams/eagles.ltt", &Team::new("Eagles"));
    fixture.write("analysis/football.lct", &serde_json::to_string(&dashboard_with_goal()).unwrap());
    // A folder where the templates store file should be
    fs::create_dir_all(fixture.config.storage_dir.join("templates.vasdb")).unwrap();

    let (report, _, _) = fixture.run();
    let templates = &report.templates;

    assert_eq!(templates.status, TemplatesStatus::Failed);
    assert!(templates
        .failures
        .iter()
        .any(|f| f.stage == FailureStage::OpenDatabase));
    assert_eq!(templates.backed_up.len(), 2);

    let backup = fixture.config.templates_dir.join("backup");
    assert!(backup.join("eagles.ltt").exists());
    assert!(backup.join("football.lct").exists());
    assert!(!fixture.db_dir().join("teams/eagles.ltt").exists());
    assert!(!report.succeeded());
}

/// Project-typed document that no longer deserializes as a project
#[derive(serde::Serialize, serde::Deserialize)]
struct StaleProject {
    #[serde(rename = "ID")]
    id: Uuid,
    #[serde(rename = "Name")]
    name: String,
}

impl Document for StaleProject {
    const DOC_TYPE: &'static str = DOC_TYPE_PROJECT;

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[test]
fn test_unreadable_stored_teams_are_reported() {
    let fixture = Fixture::new();
    {
        let manager = StorageManager::new(&fixture.config.storage_dir).unwrap();
        let league = manager.add("league").unwrap();
        league
            .store(&StaleProject {
                id: Uuid::new_v4(),
                name: "Old match".to_string(),
            })
            .unwrap();
    }
    fixture.write_project("league.ldb/match1.json", &match_project("Match 1", "Eagles", "Hawks"));
    fixture.write("teams/.keep", "");

    let (report, manager, _) = fixture.run();

    let league = &report.databases[0];
    assert_eq!(league.status, DatabaseStatus::Partial);
    assert_eq!(league.projects_migrated, 1);
    assert_eq!(league.failures.len(), 1);
    assert_eq!(league.failures[0].stage, FailureStage::Seed);
    assert!(!report.succeeded());
    assert_eq!(manager.find("league").unwrap().count::<Project>().unwrap(), 2);
}
