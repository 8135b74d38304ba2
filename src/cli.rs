// VAS migration CLI binary

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use vas_migrate::legacy::{discover_databases, discover_template_files};
use vas_migrate::migration::{DatabaseStatus, MigrationReport, TemplatesStatus};
use vas_migrate::model::{Dashboard, Project, Team};
use vas_migrate::{
    DatabaseMigration, JsonLinesReporter, LogReporter, MigrationConfig, ProgressReport,
    StorageManager,
};

#[derive(Parser)]
#[command(name = "vas-migrate")]
#[command(about = "Migrate legacy VAS databases and templates to the document store", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the migration
    Run {
        #[command(flatten)]
        paths: PathArgs,
        /// Print progress and the final report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what would be migrated without changing anything
    Detect {
        #[command(flatten)]
        paths: PathArgs,
    },

    /// List destination stores and their contents
    List {
        #[command(flatten)]
        paths: PathArgs,
    },
}

#[derive(Args)]
struct PathArgs {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Legacy databases root
    #[arg(long)]
    db_dir: Option<PathBuf>,
    /// Templates root
    #[arg(long)]
    templates_dir: Option<PathBuf>,
    /// Destination stores folder
    #[arg(long)]
    storage_dir: Option<PathBuf>,
    /// Worker threads
    #[arg(short, long)]
    workers: Option<usize>,
}

impl PathArgs {
    /// Defaults, then the config file, then explicit flags
    fn resolve(self) -> Result<MigrationConfig> {
        let mut config = match &self.config {
            Some(path) => MigrationConfig::load(path)
                .with_context(|| format!("Loading config {}", path.display()))?,
            None => MigrationConfig::default(),
        };

        if let Some(dir) = self.db_dir {
            config.db_dir = dir;
        }
        if let Some(dir) = self.templates_dir {
            config.templates_dir = dir;
        }
        if let Some(dir) = self.storage_dir {
            config.storage_dir = dir;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Run { paths, json } => cmd_run(paths.resolve()?, json),
        Commands::Detect { paths } => cmd_detect(paths.resolve()?),
        Commands::List { paths } => cmd_list(paths.resolve()?),
    }
}

fn cmd_run(config: MigrationConfig, json: bool) -> Result<()> {
    let manager = Arc::new(StorageManager::new(&config.storage_dir)?);
    let progress: Arc<dyn ProgressReport> = if json {
        Arc::new(JsonLinesReporter)
    } else {
        Arc::new(LogReporter)
    };

    let migration = DatabaseMigration::new(config, manager, progress)?;
    let report = migration.start();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    if !report.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(report: &MigrationReport) {
    println!();
    println!("Migration {}:", if report.succeeded() { "complete" } else { "finished with errors" });

    if report.databases.is_empty() {
        println!("  No legacy databases found");
    }
    for db in &report.databases {
        println!(
            "  {:<24} {:>4}/{:<4} projects  {}",
            db.name,
            db.projects_migrated,
            db.projects_total,
            status_label(db.status)
        );
    }

    let templates = &report.templates;
    println!(
        "  Templates: {} ({}/{} teams, {}/{} dashboards, {} files backed up)",
        templates_label(templates.status),
        templates.teams_migrated,
        templates.teams_total,
        templates.dashboards_migrated,
        templates.dashboards_total,
        templates.backed_up.len()
    );

    let failures: Vec<_> = report.all_failures().collect();
    if !failures.is_empty() {
        println!();
        println!("Failures:");
        for failure in failures {
            println!("  [{:?}] {}: {}", failure.stage, failure.unit, failure.error);
        }
    }
    if report.cancelled {
        println!();
        println!("Migration was cancelled; unprocessed sources were left in place.");
    }
}

fn status_label(status: DatabaseStatus) -> &'static str {
    match status {
        DatabaseStatus::Migrated => "migrated",
        DatabaseStatus::Partial => "partial",
        DatabaseStatus::Skipped => "skipped",
        DatabaseStatus::Cancelled => "cancelled",
    }
}

fn templates_label(status: TemplatesStatus) -> &'static str {
    match status {
        TemplatesStatus::MissingRoot => "no teams folder",
        TemplatesStatus::Empty => "nothing to migrate",
        TemplatesStatus::Migrated => "migrated",
        TemplatesStatus::Failed => "failed",
        TemplatesStatus::Cancelled => "cancelled",
    }
}

fn cmd_detect(config: MigrationConfig) -> Result<()> {
    let databases = discover_databases(&config.db_dir)?;

    println!("Legacy root: {}", config.db_dir.display());
    println!();
    if databases.is_empty() {
        println!("No legacy databases found.");
    } else {
        println!("{:<24}  {:>8}  {}", "Database", "Projects", "Path");
        println!("{}", "-".repeat(60));
        for db in &databases {
            println!("{:<24}  {:>8}  {}", db.name, db.project_files.len(), db.dir.display());
        }
    }

    println!();
    match discover_template_files(&config.db_dir)? {
        Some(files) => println!(
            "Templates: {} teams, {} dashboards",
            files.teams.len(),
            files.dashboards.len()
        ),
        None => println!("Templates: no teams folder"),
    }

    Ok(())
}

fn cmd_list(config: MigrationConfig) -> Result<()> {
    let manager = StorageManager::new(&config.storage_dir)?;
    let databases = manager.databases()?;

    println!("Stores in {}", config.storage_dir.display());
    println!();

    if databases.is_empty() {
        println!("No databases found. Use 'vas-migrate run' to migrate legacy data.");
    } else {
        println!("{:<24}  {:>8}", "Database", "Projects");
        println!("{}", "-".repeat(34));
        for db in &databases {
            println!("{:<24}  {:>8}", db.name(), db.count::<Project>()?);
        }
    }

    let templates = manager.templates()?;
    println!();
    println!(
        "Templates: {} teams, {} dashboards",
        templates.count::<Team>()?,
        templates.count::<Dashboard>()?
    );

    Ok(())
}
