//! Materialized query results

use crate::value::SqlValue;
use parking_lot::Mutex;
use sluice_runtime::{ScriptObject, ScriptValue};

/// A fully fetched result with a forward-only fetch cursor.
///
/// Produced on a worker thread and handed to the script as an object
/// handle; the sync accessors run on the interpreter thread.
#[derive(Debug)]
pub struct SqlResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    affected_rows: u64,
    cursor: Mutex<usize>,
}

impl ScriptObject for SqlResultSet {
    const TYPE_NAME: &'static str = "SQLResultSet";
}

impl SqlResultSet {
    /// Result of a statement that produced rows
    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        let affected_rows = rows.len() as u64;
        Self {
            columns,
            rows,
            affected_rows,
            cursor: Mutex::new(0),
        }
    }

    /// Result of a statement that only changed rows
    pub fn with_affected(affected_rows: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows,
            cursor: Mutex::new(0),
        }
    }

    pub fn num_fields(&self) -> usize {
        self.columns.len()
    }

    /// Column name by 1-based position
    pub fn field_name(&self, index: usize) -> Option<&str> {
        let index = index.checked_sub(1)?;
        self.columns.get(index).map(String::as_str)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Whether there is anything to fetch at all
    pub fn has_result(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Next row as a record keyed by column name, or `None` past the end
    pub fn fetch_row(&self) -> Option<ScriptValue> {
        let mut cursor = self.cursor.lock();
        let row = self.rows.get(*cursor)?;
        *cursor += 1;
        let fields = self
            .columns
            .iter()
            .cloned()
            .zip(row.iter().cloned().map(SqlValue::into_script))
            .collect();
        Some(ScriptValue::Record(fields))
    }
}
