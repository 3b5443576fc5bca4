use crate::models::ParseFailure;
use std::collections::BTreeMap;
use std::fmt;

/// Why a source row did not survive cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DropReason {
    MissingRequired { column: &'static str },
    ParseFailure { column: &'static str },
    OutOfRange { column: &'static str },
    ForeignKey {
        column: &'static str,
        parent_table: &'static str,
    },
    Duplicate,
}

impl DropReason {
    pub fn from_parse_failure(column: &'static str, failure: ParseFailure) -> Self {
        match failure {
            ParseFailure::Missing => DropReason::MissingRequired { column },
            ParseFailure::Malformed => DropReason::ParseFailure { column },
            ParseFailure::OutOfRange => DropReason::OutOfRange { column },
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::MissingRequired { column } => write!(f, "missing {}", column),
            DropReason::ParseFailure { column } => write!(f, "unparseable {}", column),
            DropReason::OutOfRange { column } => write!(f, "{} out of range", column),
            DropReason::ForeignKey {
                column,
                parent_table,
            } => write!(f, "{} not found in {}", column, parent_table),
            DropReason::Duplicate => f.write_str("duplicate key"),
        }
    }
}

/// Per-rule counts for one cleaning pass.
#[derive(Debug, Clone, Default)]
pub struct CleanReport {
    pub table: &'static str,
    pub input_rows: usize,
    pub output_rows: usize,
    pub dropped: BTreeMap<DropReason, usize>,
    pub defaulted_fields: BTreeMap<&'static str, usize>,
    pub truncated_fields: BTreeMap<&'static str, usize>,
}

impl CleanReport {
    pub fn new(table: &'static str, input_rows: usize) -> Self {
        Self {
            table,
            input_rows,
            ..Default::default()
        }
    }

    pub fn record_drop(&mut self, reason: DropReason) {
        *self.dropped.entry(reason).or_insert(0) += 1;
    }

    pub fn record_default(&mut self, column: &'static str) {
        *self.defaulted_fields.entry(column).or_insert(0) += 1;
    }

    pub fn record_truncation(&mut self, column: &'static str) {
        *self.truncated_fields.entry(column).or_insert(0) += 1;
    }

    pub fn total_dropped(&self) -> usize {
        self.dropped.values().sum()
    }

    pub fn dropped_for(&self, reason: DropReason) -> usize {
        self.dropped.get(&reason).copied().unwrap_or(0)
    }

    /// Rows dropped for a foreign-key miss, whichever column it was.
    pub fn foreign_key_drops(&self) -> usize {
        self.dropped
            .iter()
            .filter(|(reason, _)| matches!(reason, DropReason::ForeignKey { .. }))
            .map(|(_, count)| count)
            .sum()
    }

    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str(&format!("=== Cleaning Report: {} ===\n", self.table));
        summary.push_str(&format!("Input Rows: {}\n", self.input_rows));
        summary.push_str(&format!(
            "Output Rows: {} ({:.1}%)\n",
            self.output_rows,
            percentage(self.output_rows, self.input_rows)
        ));
        summary.push_str(&format!("Dropped Rows: {}\n", self.total_dropped()));

        for (reason, count) in &self.dropped {
            summary.push_str(&format!("  {}: {}\n", reason, count));
        }

        if !self.defaulted_fields.is_empty() {
            summary.push_str("Defaulted Values:\n");
            for (column, count) in &self.defaulted_fields {
                summary.push_str(&format!("  {}: {}\n", column, count));
            }
        }

        if !self.truncated_fields.is_empty() {
            summary.push_str("Truncated Values:\n");
            for (column, count) in &self.truncated_fields {
                summary.push_str(&format!("  {}: {}\n", column, count));
            }
        }

        summary
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}
