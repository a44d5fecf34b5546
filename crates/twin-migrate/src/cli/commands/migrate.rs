use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use crate::config::{
    ConfigInput, DestinationTarget, MigrationConfig, load_service_account, resolve_config,
};
use crate::export::JsonExportSource;
use crate::migrate::{MigrationReporter, MigrationSummary, PlanRecorder, TracingReporter, migrate};
use crate::sqlite::SqliteDocumentStore;
use crate::upsert::{Destination, write_plans_artifact};

#[derive(Debug, Clone, Args)]
pub struct MigrateArgs {
    #[arg(long, env = "TWIN_MIGRATE_SOURCE", value_name = "PATH")]
    pub source: Option<PathBuf>,

    #[arg(long, env = "TWIN_MIGRATE_DEST_URI", value_name = "URI")]
    pub dest_uri: Option<String>,

    #[arg(long, env = "TWIN_MIGRATE_DEST_DB", value_name = "NAME")]
    pub dest_db: Option<String>,

    #[arg(long, env = "FIREBASE_SERVICE_ACCOUNT", value_name = "PATH")]
    pub service_account: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long, value_name = "PATH", requires = "dry_run")]
    pub plan_out: Option<PathBuf>,
}

pub fn run(args: &MigrateArgs) -> Result<MigrationSummary> {
    let input = config_input(args)?;
    let config = resolve_config(&input)?;
    execute(&config, args.plan_out.as_deref())
}

pub fn config_input(args: &MigrateArgs) -> Result<ConfigInput> {
    Ok(ConfigInput {
        source: args.source.clone(),
        dest_uri: args.dest_uri.clone(),
        dest_db: args.dest_db.clone(),
        service_account: args.service_account.clone(),
        google_application_credentials: std::env::var_os("GOOGLE_APPLICATION_CREDENTIALS")
            .map(PathBuf::from),
        home_dir: std::env::var_os("HOME").map(PathBuf::from),
        cwd: std::env::current_dir().context("failed to resolve current directory")?,
        dry_run: args.dry_run,
    })
}

pub fn execute(config: &MigrationConfig, plan_out: Option<&Path>) -> Result<MigrationSummary> {
    println!(
        "migrate: start dry_run={} source={} destination={} database={}",
        config.dry_run,
        config.source_path.display(),
        destination_label(&config.destination),
        config.database
    );

    if let Some(path) = &config.service_account {
        let account = load_service_account(path)?;
        tracing::info!(
            project_id = %account.project_id,
            client_email = account.client_email.as_deref().unwrap_or("none"),
            "loaded source credentials"
        );
    }

    let source = JsonExportSource::open(&config.source_path)?;
    for warning in source.warnings() {
        tracing::warn!(%warning, "skipped malformed source entry");
    }
    println!(
        "migrate: checkpoint source_loaded collections={} warnings={}",
        source.collection_paths().len(),
        source.warnings().len()
    );

    let mut tracing_reporter = TracingReporter;
    let mut recording_reporter = (TracingReporter, PlanRecorder::new());
    let reporter: &mut dyn MigrationReporter = if plan_out.is_some() {
        &mut recording_reporter
    } else {
        &mut tracing_reporter
    };

    println!("migrate: stage migrate");
    let summary = if config.dry_run {
        migrate(&source, Destination::DryRun, reporter)?
    } else {
        let mut store = open_store(&config.destination, &config.database)?;
        migrate(&source, Destination::Live(&mut store), reporter)?
    };

    if let Some(path) = plan_out {
        let plans = recording_reporter.1.plans();
        write_plans_artifact(path, plans)?;
        println!(
            "migrate: checkpoint plans_written count={} path={}",
            plans.len(),
            path.display()
        );
    }

    println!("migrate: complete dry_run={} {summary}", config.dry_run);
    Ok(summary)
}

pub fn open_store(target: &DestinationTarget, database: &str) -> Result<SqliteDocumentStore> {
    match target {
        DestinationTarget::SqliteFile(path) => SqliteDocumentStore::open(path, database),
        DestinationTarget::SqliteMemory => SqliteDocumentStore::open_in_memory(database),
    }
}

fn destination_label(target: &DestinationTarget) -> String {
    match target {
        DestinationTarget::SqliteFile(path) => path.display().to_string(),
        DestinationTarget::SqliteMemory => crate::config::SQLITE_MEMORY_URI.to_string(),
    }
}
