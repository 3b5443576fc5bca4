use crate::error::{ProcessingError, Result};
use crate::models::{
    CleanedTable, FieldSpec, KeySet, OnInvalid, ParseFailure, RawTable, TableKind, TableSchema,
    Value,
};
use crate::processors::{CleanReport, DropReason};
use crate::utils::{normalize_missing, truncate_chars};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Committed key sets of parent tables, keyed by (table, column).
#[derive(Debug, Clone, Default)]
pub struct ParentKeys {
    keys: HashMap<(String, String), KeySet>,
}

impl ParentKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: &str, column: &str, values: KeySet) {
        self.keys
            .insert((table.to_string(), column.to_string()), values);
    }

    pub fn with(mut self, table: &str, column: &str, values: KeySet) -> Self {
        self.insert(table, column, values);
        self
    }

    pub fn get(&self, table: &str, column: &str) -> Option<&KeySet> {
        self.keys.get(&(table.to_string(), column.to_string()))
    }
}

/// Applies one table's schema to a raw record set.
///
/// Rows that cannot satisfy the schema are dropped and counted; the pass only
/// fails when the source lacks one of the schema's columns.
pub struct Cleaner {
    schema: &'static TableSchema,
}

impl Cleaner {
    pub fn new(kind: TableKind) -> Self {
        Self {
            schema: kind.schema(),
        }
    }

    pub fn clean(&self, raw: &RawTable, parents: &ParentKeys) -> Result<CleanedTable> {
        let schema = self.schema;
        let columns = self.project(raw)?;
        let mut report = CleanReport::new(schema.name, raw.len());

        let foreign_keys: Vec<(usize, &'static str, &'static str, Option<&KeySet>)> = schema
            .foreign_keys
            .iter()
            .filter_map(|fk| {
                let idx = schema.position(fk.column)?;
                let keys = parents.get(fk.parent_table, fk.parent_column);
                if keys.is_none() {
                    warn!(
                        "No committed {}.{} keys available; every {} row will fail its {} check",
                        fk.parent_table, fk.parent_column, schema.name, fk.column
                    );
                }
                Some((idx, fk.column, fk.parent_table, keys))
            })
            .collect();

        let key_positions = schema.key_positions();
        let mut seen_keys: HashSet<Vec<Value>> = HashSet::with_capacity(raw.len());
        let mut rows = Vec::with_capacity(raw.len());

        'rows: for raw_row in &raw.rows {
            let mut row = Vec::with_capacity(schema.fields.len());

            for (field, &col) in schema.fields.iter().zip(&columns) {
                let cell = normalize_missing(raw_row.get(col).map(String::as_str));
                let value = match fit_to_field(field, cell, &mut report) {
                    Ok(value) => value,
                    Err(failure) => match field.on_invalid {
                        OnInvalid::DropRow => {
                            report.record_drop(DropReason::from_parse_failure(field.name, failure));
                            continue 'rows;
                        }
                        OnInvalid::Default(default) => {
                            report.record_default(field.name);
                            default.to_value()
                        }
                    },
                };

                row.push(value);
            }

            for &(idx, column, parent_table, keys) in &foreign_keys {
                if !keys.is_some_and(|set| set.contains(&row[idx])) {
                    report.record_drop(DropReason::ForeignKey {
                        column,
                        parent_table,
                    });
                    continue 'rows;
                }
            }

            let key: Vec<Value> = key_positions.iter().map(|&i| row[i].clone()).collect();
            if !seen_keys.insert(key) {
                report.record_drop(DropReason::Duplicate);
                continue;
            }

            rows.push(row);
        }

        report.output_rows = rows.len();
        info!(
            "After cleaning {} has {} of {} rows",
            schema.name,
            rows.len(),
            raw.len()
        );

        Ok(CleanedTable {
            schema,
            rows,
            report,
        })
    }

    /// Map every schema field to its source column.
    fn project(&self, raw: &RawTable) -> Result<Vec<usize>> {
        let mut missing = Vec::new();
        let columns: Vec<usize> = self
            .schema
            .fields
            .iter()
            .filter_map(|field| {
                let idx = raw.column_index(field.name);
                if idx.is_none() {
                    missing.push(field.name.to_string());
                }
                idx
            })
            .collect();

        if !missing.is_empty() {
            return Err(ProcessingError::MissingColumns {
                table: self.schema.name,
                columns: missing,
            });
        }

        Ok(columns)
    }
}

/// Parse a cell and cut text to the field's length.
///
/// Text is cut on a character boundary and loses trailing whitespace, so a
/// value that is cut down to an NA marker counts as missing.
fn fit_to_field(
    field: &FieldSpec,
    cell: Option<&str>,
    report: &mut CleanReport,
) -> std::result::Result<Value, ParseFailure> {
    let mut value = field.parse(cell)?;

    if let (Some(max_len), Value::Text(text)) = (field.max_len(), &mut value) {
        if truncate_chars(text, max_len) {
            let trimmed = text.trim_end().len();
            text.truncate(trimmed);
            report.record_truncation(field.name);
            if normalize_missing(Some(text.as_str())).is_none() {
                return Err(ParseFailure::Missing);
            }
        }
    }

    Ok(value)
}
