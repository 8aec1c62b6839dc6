//! Schema presence check and DDL application
//!
//! A table is either `Missing` or `Present`. `Missing -> Present` happens
//! by running the migration file through a [`SqlRunner`] (only when a
//! database password was given and this is not a dry run) or by the
//! operator applying it by hand and re-running the tool.

pub mod psql;

pub use psql::{run_with_timeout, PsqlRunner, SqlRunner};

use std::path::Path;

use crate::store::DataStore;
use crate::ui::{self, Icons, Spinner};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    Missing,
    Present,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOutcome {
    AlreadyPresent,
    Applied,
    /// Table missing and no way to create it; instructions were printed.
    ManualActionRequired,
}

impl SchemaOutcome {
    pub fn can_proceed(&self) -> bool {
        !matches!(self, Self::ManualActionRequired)
    }
}

/// How a missing table gets created.
#[derive(Clone, Copy)]
pub enum MigrationMode<'a> {
    /// No database password: print the manual steps and halt.
    Manual,
    /// Dry run: never touches the schema, even with a password.
    DryRun,
    /// Run the migration file through this runner.
    Apply(&'a dyn SqlRunner),
}

pub fn table_state<S: DataStore + ?Sized>(store: &S, table: &str) -> Result<SchemaState> {
    Ok(if store.table_exists(table)? {
        SchemaState::Present
    } else {
        SchemaState::Missing
    })
}

fn missing_tables<'t, S: DataStore + ?Sized>(store: &S, tables: &[&'t str]) -> Result<Vec<&'t str>> {
    let mut missing = Vec::new();
    for &table in tables {
        if table_state(store, table)? == SchemaState::Missing {
            missing.push(table);
        }
    }
    Ok(missing)
}

/// Make sure every table in `tables` exists, applying `migration` if the
/// mode allows it. After a migration all of them must be present.
pub fn ensure_tables<S: DataStore + ?Sized>(
    store: &S,
    tables: &[&str],
    migration: &Path,
    mode: MigrationMode<'_>,
) -> Result<SchemaOutcome> {
    let missing = missing_tables(store, tables)?;
    if missing.is_empty() {
        ui::success(&format!("Already present: {}", tables.join(", ")));
        return Ok(SchemaOutcome::AlreadyPresent);
    }

    for table in &missing {
        ui::item(Icons::CLIPBOARD, &format!("Table {} does not exist yet", table));
    }

    let runner = match mode {
        MigrationMode::Apply(runner) => runner,
        MigrationMode::Manual | MigrationMode::DryRun => {
            for line in remediation_lines(migration, matches!(mode, MigrationMode::DryRun)) {
                println!("{}", line);
            }
            return Ok(SchemaOutcome::ManualActionRequired);
        }
    };

    if !migration.is_file() {
        return Err(Error::Migration(format!(
            "migration file not found: {}",
            migration.display()
        )));
    }

    ui::item(
        Icons::WRENCH,
        &format!("Applying {} via {}", migration.display(), runner.describe()),
    );
    let spinner = Spinner::new("Running migration...");
    let result = runner.run_file(migration);
    spinner.finish_and_clear();
    let stdout = result?;

    if !stdout.trim().is_empty() {
        println!("{}", ui::dim(stdout.trim_end()));
    }

    let still_missing = missing_tables(store, tables)?;
    if !still_missing.is_empty() {
        return Err(Error::Migration(format!(
            "{} ran but {} still missing",
            migration.display(),
            still_missing.join(", ")
        )));
    }

    ui::success("Migration applied");
    Ok(SchemaOutcome::Applied)
}

/// Manual steps shown when a table is missing and the migration will not
/// be applied by this run.
pub fn remediation_lines(migration: &Path, dry_run: bool) -> Vec<String> {
    let mut lines = vec![String::new()];
    if dry_run {
        lines.push(format!("{}  A dry run never applies the migration.", Icons::WARN));
        lines.push("   Do one of the following:".to_string());
        lines.push(String::new());
        lines.push("   Option 1: re-run without --dry-run, with the database password".to_string());
    } else {
        lines.push(format!("{}  Creating the table requires the database password.", Icons::WARN));
        lines.push("   Do one of the following:".to_string());
        lines.push(String::new());
        lines.push("   Option 1: re-run with the database password".to_string());
    }
    lines.extend([
        format!("     {}", ui::command("quizseed --db-password YOUR_DB_PASSWORD")),
        String::new(),
        "   Option 2: run the SQL in Supabase Dashboard -> SQL Editor".to_string(),
        format!("     file: {}", migration.display()),
        String::new(),
        "   Then run this tool again.".to_string(),
    ]);
    lines
}
