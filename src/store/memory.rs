//! In-memory table store
//!
//! Stands in for the remote API in tests and backs the dry-run overlay.
//! Tables must be created before they answer reads, mirroring a missing
//! relation on the real server.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use serde_json::Value;

use super::{filter_value, DataStore, Query, Row};
use crate::{Error, Result};

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RefCell<BTreeMap<String, Vec<Row>>>,
    next_id: Cell<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table if it does not exist yet.
    pub fn create_table(&self, table: &str) {
        self.tables.borrow_mut().entry(table.to_string()).or_default();
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.borrow().contains_key(table)
    }

    /// All rows of `table` in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables.borrow().get(table).cloned().unwrap_or_default()
    }

    pub fn count(&self, table: &str) -> usize {
        self.tables.borrow().get(table).map_or(0, Vec::len)
    }

    fn missing(method: &'static str, table: &str) -> Error {
        Error::Http {
            method,
            table: table.to_string(),
            status: 404,
            body: format!("relation \"public.{}\" does not exist", table),
        }
    }

    fn matches(row: &Row, query: &Query) -> bool {
        query.filters.iter().all(|f| {
            row.get(&f.field)
                .map(|v| filter_value(v) == f.value)
                .unwrap_or(false)
        })
    }

    fn project(row: &Row, query: &Query) -> Row {
        if query.select.is_empty() || query.select.iter().any(|c| c == "*") {
            return row.clone();
        }
        query
            .select
            .iter()
            .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
            .collect()
    }
}

/// Well-formed (version 4 layout) uuid built from a counter, so ids minted
/// here are accepted by uuid-typed filters on a real server.
fn synthetic_uuid(n: u64) -> String {
    format!("00000000-0000-4000-8000-{:012x}", n & 0xffff_ffff_ffff)
}

impl DataStore for MemoryStore {
    fn get(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        let tables = self.tables.borrow();
        let rows = tables.get(table).ok_or_else(|| Self::missing("GET", table))?;
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(rows
            .iter()
            .filter(|row| Self::matches(row, query))
            .take(limit)
            .map(|row| Self::project(row, query))
            .collect())
    }

    fn post(&self, table: &str, row: &Value) -> Result<Row> {
        let mut row = match row {
            Value::Object(map) => map.clone(),
            other => {
                return Err(Error::InvalidData(format!(
                    "insert into {} expects an object, got {}",
                    table, other
                )))
            }
        };
        let mut tables = self.tables.borrow_mut();
        let rows = tables.get_mut(table).ok_or_else(|| Self::missing("POST", table))?;

        if !row.contains_key("id") {
            let id = self.next_id.get() + 1;
            self.next_id.set(id);
            row.insert("id".to_string(), Value::String(synthetic_uuid(id)));
        }
        rows.push(row.clone());
        Ok(row)
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.has_table(table))
    }
}
