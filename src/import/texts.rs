use serde_json::{json, Value};

use super::TextRecord;
use crate::store::{DataStore, InsertOutcome, Query, REFERENCE_TEXTS};
use crate::ui;
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub total: usize,
    pub imported: usize,
    pub skipped: usize,
}

/// Inserts reference texts that are not in the store yet, keyed by `text_id`.
pub struct TextImporter<'a, S: DataStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: DataStore + ?Sized> TextImporter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn run(&self, texts: &[TextRecord]) -> Result<ImportStats> {
        let mut stats = ImportStats {
            total: texts.len(),
            ..Default::default()
        };

        for text in texts {
            let key = Query::new().eq("text_id", text.id.as_str());
            // sort_order follows this run's insertion sequence, not the table size
            let row = to_row(text, stats.imported);

            match self.store.insert_if_absent(REFERENCE_TEXTS, &key, &row)? {
                InsertOutcome::AlreadyPresent => {
                    tracing::debug!("reference text {} already present", text.id);
                    ui::skipped(&text.title);
                    stats.skipped += 1;
                }
                InsertOutcome::Inserted(_) => {
                    ui::added(&text.title);
                    stats.imported += 1;
                }
            }
        }

        tracing::info!(
            "Imported {} of {} reference texts ({} already present)",
            stats.imported,
            stats.total,
            stats.skipped
        );
        Ok(stats)
    }
}

fn to_row(text: &TextRecord, sort_order: usize) -> Value {
    json!({
        "text_id": text.id,
        "unit_slug": text.unit_slug,
        "section_slug": text.section_slug,
        "title": text.title,
        "body": text.body,
        "key_terms": text.key_terms,
        "sort_order": sort_order,
    })
}
