use crate::models::{KeySet, TableSchema, Value};
use crate::processors::CleanReport;

/// Rows as read from a source, before any typing.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Canonical column name: trimmed, lower-case, without a UTF-8 BOM.
    pub fn canonical_name(header: &str) -> String {
        header.trim_start_matches('\u{feff}').trim().to_lowercase()
    }

    /// Index of the first header matching `name` case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| Self::canonical_name(h) == name)
    }
}

/// Rows that satisfy their table's schema, in schema field order.
#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub schema: &'static TableSchema,
    pub rows: Vec<Vec<Value>>,
    pub report: CleanReport,
}

impl CleanedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn table_name(&self) -> &'static str {
        self.schema.name
    }

    /// Distinct values of one column, shaped like a committed key lookup.
    pub fn column_values(&self, column: &str) -> KeySet {
        match self.schema.position(column) {
            Some(idx) => self.rows.iter().map(|row| row[idx].clone()).collect(),
            None => KeySet::new(),
        }
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.schema.position(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }
}
