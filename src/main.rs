//! Quizseed CLI - reference text setup for the anatomy quiz store

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use quizseed::schema::PsqlRunner;
use quizseed::store::{DataStore, DryRunStore, RestStore};
use quizseed::ui::{self, Icons};
use quizseed::{Pipeline, RunOutcome, Settings};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "quizseed")]
#[command(version)]
#[command(about = "Create the reference_texts table, import reference texts and link them to questions")]
#[command(long_about = r#"
Quizseed prepares the quiz store for reference texts:
  1. checks that the reference_texts table exists (and creates it with psql
     when a database password is given)
  2. imports scripts/data/reference-texts.json, skipping texts already present
  3. links questions declared in scripts/data/unit*.json to their texts

Every step checks before it writes, so the tool can be re-run safely.

Settings come from .env.local (NEXT_PUBLIC_SUPABASE_URL,
SUPABASE_SERVICE_ROLE_KEY) and an optional quizseed.toml.

Example usage:
  quizseed
  quizseed --db-password "$DB_PASSWORD"
  quizseed --dry-run
"#)]
struct Cli {
    /// Database password; when given, a missing table is created via psql
    #[arg(long, value_name = "VALUE")]
    db_password: Option<String>,

    /// Report what would be written without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = log_filter(cli.verbose, EnvFilter::try_from_default_env().ok());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            ui::error(&format!("{:#}", err));
            let code = err
                .downcast_ref::<quizseed::Error>()
                .map_or(1, quizseed::Error::exit_code);
            ExitCode::from(code as u8)
        }
    }
}

/// `--verbose` wins, then `RUST_LOG`, then `info`.
fn log_filter(verbose: bool, from_env: Option<EnvFilter>) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        from_env.unwrap_or_else(|| EnvFilter::new("info"))
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    ui::banner("Anatomy Quiz - reference text setup");

    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    tracing::debug!("{:?}", settings);

    let rest = RestStore::from_settings(&settings)?;
    let dry;
    let store: &dyn DataStore = if cli.dry_run {
        ui::item(Icons::DRY, "Dry run: nothing will be written to the store");
        dry = DryRunStore::new(&rest);
        &dry
    } else {
        &rest
    };

    let psql = cli
        .db_password
        .as_deref()
        .map(|password| PsqlRunner::new(&settings.database, password));

    let mut pipeline = Pipeline::new(&settings, store);
    if cli.dry_run {
        ui::item(Icons::DRY, "Dry run: the migration will not be applied");
        pipeline = pipeline.dry_run();
    } else if let Some(runner) = &psql {
        pipeline = pipeline.with_runner(runner);
    }

    match pipeline.run()? {
        RunOutcome::SchemaHalted => Ok(ExitCode::from(1)),
        RunOutcome::Completed(summary) => {
            println!();
            println!("{} Summary", Icons::STATS);
            println!("{}", summary.table());
            println!();
            if cli.dry_run {
                ui::success("Dry run complete, nothing was written");
            } else {
                ui::success(&format!("{} Setup complete!", Icons::PARTY));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
