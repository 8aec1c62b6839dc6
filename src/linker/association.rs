use std::collections::HashMap;

use serde_json::{json, Value};

use crate::import::LoadedUnit;
use crate::store::rest::truncate;
use crate::store::{
    filter_value, DataStore, InsertOutcome, Query, QUESTIONS, QUESTION_REFERENCE_TEXTS,
    REFERENCE_TEXTS,
};
use crate::ui::{self, Icons};
use crate::Result;

const QUESTION_PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub created: usize,
    pub skipped: usize,
    pub questions_not_found: usize,
    pub unknown_references: usize,
    /// Literal texts that matched no question row.
    pub unmatched_questions: Vec<String>,
}

/// `text_id` -> row id of every reference text currently in the store.
pub fn reference_text_ids<S: DataStore + ?Sized>(store: &S) -> Result<HashMap<String, Value>> {
    let rows = store.get(REFERENCE_TEXTS, &Query::new().select(&["id", "text_id"]))?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let text_id = row.get("text_id")?.as_str()?.to_string();
            let id = row.get("id")?.clone();
            Some((text_id, id))
        })
        .collect())
}

/// Attaches reference texts to questions declared in unit files.
///
/// Questions are matched by their literal `question_text`; any wording
/// change in the store orphans the declaration, which shows up in
/// [`LinkStats::unmatched_questions`].
pub struct AssociationLinker<'a, S: DataStore + ?Sized> {
    store: &'a S,
    text_ids: HashMap<String, Value>,
}

impl<'a, S: DataStore + ?Sized> AssociationLinker<'a, S> {
    /// Build the linker, fetching the `text_id` map from the store.
    pub fn new(store: &'a S) -> Result<Self> {
        let text_ids = reference_text_ids(store)?;
        Ok(Self { store, text_ids })
    }

    pub fn known_texts(&self) -> usize {
        self.text_ids.len()
    }

    pub fn run(&self, units: &[LoadedUnit]) -> Result<LinkStats> {
        let mut stats = LinkStats::default();

        for unit in units {
            println!();
            ui::item(
                Icons::FOLDER,
                &format!("{} ({})", unit.data.unit.name, unit.file_name),
            );

            for section in &unit.data.sections {
                for question in &section.questions {
                    if question.reference_text_ids.is_empty() {
                        continue;
                    }
                    self.link_question(&question.question_text, &question.reference_text_ids, &mut stats)?;
                }
            }
        }

        tracing::info!(
            "Linking done: {} created, {} skipped, {} questions not found",
            stats.created,
            stats.skipped,
            stats.questions_not_found
        );
        Ok(stats)
    }

    fn link_question(&self, question_text: &str, ref_ids: &[String], stats: &mut LinkStats) -> Result<()> {
        let Some(question_id) = self.resolve_question(question_text)? else {
            tracing::debug!("question not found: {}", question_text);
            stats.questions_not_found += 1;
            stats.unmatched_questions.push(question_text.to_string());
            return Ok(());
        };

        for (idx, text_id) in ref_ids.iter().enumerate() {
            let Some(ref_id) = self.text_ids.get(text_id) else {
                tracing::debug!("unknown reference text id {}", text_id);
                ui::warn(&format!("Unknown reference text id: {}", text_id));
                stats.unknown_references += 1;
                continue;
            };

            let key = Query::new()
                .eq("question_id", filter_value(&question_id))
                .eq("reference_text_id", filter_value(ref_id));
            let row = json!({
                "question_id": question_id,
                "reference_text_id": ref_id,
                "sort_order": idx,
            });

            match self.store.insert_if_absent(QUESTION_REFERENCE_TEXTS, &key, &row)? {
                InsertOutcome::Inserted(_) => stats.created += 1,
                InsertOutcome::AlreadyPresent => stats.skipped += 1,
            }
        }
        Ok(())
    }

    fn resolve_question(&self, question_text: &str) -> Result<Option<Value>> {
        let rows = self.store.get(
            QUESTIONS,
            &Query::new().eq("question_text", question_text).select(&["id"]),
        )?;
        if rows.len() > 1 {
            tracing::debug!("{} questions share the text {:?}; using the first", rows.len(), question_text);
            ui::warn(&format!(
                "{} questions match \"{}\", linking the first",
                rows.len(),
                truncate(question_text, QUESTION_PREVIEW_CHARS)
            ));
        }
        Ok(rows.into_iter().next().and_then(|row| row.get("id").cloned()))
    }
}

/// Print the outcome, listing questions whose text matched nothing.
pub fn report(stats: &LinkStats) {
    println!();
    ui::success(&format!("Created {} links", stats.created));
    if stats.skipped > 0 {
        ui::summary_row("Already linked, skipped:", &stats.skipped.to_string());
    }
    if stats.unknown_references > 0 {
        ui::summary_row("Unknown reference ids:", &stats.unknown_references.to_string());
    }
    if stats.questions_not_found > 0 {
        ui::summary_row(
            "Questions not in the store (import questions first):",
            &stats.questions_not_found.to_string(),
        );
        for text in &stats.unmatched_questions {
            println!("    - {}", ui::dim(&truncate(text, QUESTION_PREVIEW_CHARS)));
        }
    }
}
