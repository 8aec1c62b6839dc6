//! Store Layer - table-oriented access to the remote data API
//!
//! Tables touched by this crate:
//! - reference_texts(id, text_id, unit_slug, section_slug, title, body, key_terms, sort_order)
//! - questions(id, question_text, ...)
//! - question_reference_texts(question_id, reference_text_id, sort_order)

pub mod dry_run;
pub mod memory;
pub mod rest;

pub use dry_run::DryRunStore;
pub use memory::MemoryStore;
pub use rest::RestStore;

use serde_json::Value;

use crate::Result;

pub const REFERENCE_TEXTS: &str = "reference_texts";
pub const QUESTIONS: &str = "questions";
pub const QUESTION_REFERENCE_TEXTS: &str = "question_reference_texts";

/// One row as returned by the table API.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

/// A filtered read: field-operator-value triples plus projection and limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub select: Vec<String>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op: FilterOp::Eq,
            value: value.into(),
        });
        self
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.select = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query parameters in PostgREST form: `field=eq.value`, `select=a,b`, `limit=n`.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .filters
            .iter()
            .map(|f| (f.field.clone(), format!("{}.{}", f.op.as_str(), f.value)))
            .collect();
        if !self.select.is_empty() {
            params.push(("select".to_string(), self.select.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    /// Columns the filters constrain, used as the conflict target of an insert.
    pub fn key_columns(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.field.as_str()).collect()
    }
}

/// Result of [`DataStore::insert_if_absent`].
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Row),
    AlreadyPresent,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Blocking access to a table-oriented data API.
pub trait DataStore {
    /// Filtered read. Any non-success status is an error.
    fn get(&self, table: &str, query: &Query) -> Result<Vec<Row>>;

    /// Insert one row and return the created representation.
    fn post(&self, table: &str, row: &Value) -> Result<Row>;

    /// Whether `table` answers a minimal read with a success status.
    /// Row count plays no part.
    fn table_exists(&self, table: &str) -> Result<bool>;

    /// Insert `row` unless a row matching `key` already exists.
    fn insert_if_absent(&self, table: &str, key: &Query, row: &Value) -> Result<InsertOutcome> {
        let existing = key.clone().limit(1);
        if !self.get(table, &existing)?.is_empty() {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        self.post(table, row).map(InsertOutcome::Inserted)
    }
}

impl<S: DataStore + ?Sized> DataStore for &S {
    fn get(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        (**self).get(table, query)
    }

    fn post(&self, table: &str, row: &Value) -> Result<Row> {
        (**self).post(table, row)
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        (**self).table_exists(table)
    }

    fn insert_if_absent(&self, table: &str, key: &Query, row: &Value) -> Result<InsertOutcome> {
        (**self).insert_if_absent(table, key, row)
    }
}

/// Render a JSON scalar the way it appears in an `eq.` filter.
pub fn filter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
