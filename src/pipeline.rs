//! Orchestrator: schema check, reference text import, question linking.
//!
//! Stages run strictly in order. A schema step that cannot proceed stops
//! the run before anything is written; any error aborts the remaining
//! stages.

use crate::config::Settings;
use crate::import::{self, ImportStats, TextImporter};
use crate::linker::{self, AssociationLinker, LinkStats};
use crate::schema::{self, MigrationMode, SchemaOutcome, SqlRunner};
use crate::store::{DataStore, QUESTION_REFERENCE_TEXTS, REFERENCE_TEXTS};

/// Tables the import and link stages write to.
const REQUIRED_TABLES: &[&str] = &[REFERENCE_TEXTS, QUESTION_REFERENCE_TEXTS];
use crate::ui::{self, Icons};
use crate::Result;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub schema: SchemaOutcome,
    pub import: ImportStats,
    pub links: LinkStats,
}

impl RunSummary {
    pub fn table(&self) -> String {
        ui::summary_table(&[
            ("Texts imported", self.import.imported),
            ("Texts already present", self.import.skipped),
            ("Links created", self.links.created),
            ("Links already present", self.links.skipped),
            ("Questions not found", self.links.questions_not_found),
            ("Unknown reference ids", self.links.unknown_references),
        ])
    }
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// A table is missing and could not be created; instructions were printed.
    SchemaHalted,
}

pub struct Pipeline<'a, S: DataStore + ?Sized> {
    settings: &'a Settings,
    store: &'a S,
    migration: MigrationMode<'a>,
}

impl<'a, S: DataStore + ?Sized> Pipeline<'a, S> {
    pub fn new(settings: &'a Settings, store: &'a S) -> Self {
        Self {
            settings,
            store,
            migration: MigrationMode::Manual,
        }
    }

    /// Allow the schema step to apply the migration itself.
    pub fn with_runner(mut self, runner: &'a dyn SqlRunner) -> Self {
        self.migration = MigrationMode::Apply(runner);
        self
    }

    /// Never apply the migration, whatever runner was given.
    pub fn dry_run(mut self) -> Self {
        self.migration = MigrationMode::DryRun;
        self
    }

    pub fn run(&self) -> Result<RunOutcome> {
        ui::step(1, "Schema check");
        let schema = schema::ensure_tables(
            self.store,
            REQUIRED_TABLES,
            &self.settings.migration,
            self.migration,
        )?;
        if !schema.can_proceed() {
            tracing::info!("Schema step halted: {} not all present", REQUIRED_TABLES.join(", "));
            return Ok(RunOutcome::SchemaHalted);
        }

        let import = self.import_texts()?;
        let links = self.link_questions()?;

        Ok(RunOutcome::Completed(RunSummary {
            schema,
            import,
            links,
        }))
    }

    fn import_texts(&self) -> Result<ImportStats> {
        ui::step(2, "Reference text import");
        let texts = import::load_reference_texts(&self.settings.reference_texts)?;
        ui::item(Icons::MEMO, &format!("Importing {} reference texts", texts.len()));

        let stats = TextImporter::new(self.store).run(&texts)?;
        println!();
        ui::success(&format!("Imported {} reference texts", stats.imported));
        Ok(stats)
    }

    fn link_questions(&self) -> Result<LinkStats> {
        ui::step(3, "Question / text links");
        let units = import::load_units(&self.settings.data_dir, &self.settings.unit_pattern)?;
        tracing::debug!("{} unit files under {}", units.len(), self.settings.data_dir.display());

        let linker = AssociationLinker::new(self.store)?;
        ui::item(
            Icons::CLIPBOARD,
            &format!("Fetched {} reference texts", linker.known_texts()),
        );

        let stats = linker.run(&units)?;
        linker::report(&stats);
        Ok(stats)
    }
}
