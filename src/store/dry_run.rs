//! Dry-run wrapper: reads see the wrapped store plus pending writes,
//! writes never leave the process.

use serde_json::Value;

use super::{DataStore, MemoryStore, Query, Row};
use crate::Result;

pub struct DryRunStore<S> {
    inner: S,
    pending: MemoryStore,
}

impl<S: DataStore> DryRunStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            pending: MemoryStore::new(),
        }
    }

    /// Rows that would have been written to `table`.
    pub fn pending(&self, table: &str) -> Vec<Row> {
        self.pending.rows(table)
    }
}

impl<S: DataStore> DataStore for DryRunStore<S> {
    fn get(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        let mut rows = self.inner.get(table, query)?;
        if self.pending.has_table(table) {
            rows.extend(self.pending.get(table, query)?);
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn post(&self, table: &str, row: &Value) -> Result<Row> {
        tracing::debug!("dry run: skipping POST {}", table);
        self.pending.create_table(table);
        self.pending.post(table, row)
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        self.inner.table_exists(table)
    }
}
