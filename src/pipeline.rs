//! The four-table load.
//!
//! Tables are processed strictly in parent-first order. Each step reads its
//! source file, cleans it against the keys its parents actually committed,
//! and loads it in one transaction. A failing table is recorded and the run
//! moves on; its children then see whatever the store already holds.

use crate::config::PipelineConfig;
use crate::database::{KeySource, Sink};
use crate::error::{ProcessingError, Result};
use crate::models::{CleanedTable, TableKind};
use crate::processors::{CleanReport, Cleaner, ParentKeys};
use crate::readers::CsvTableReader;
use crate::utils::ProgressReporter;
use std::collections::HashMap;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    Loaded { inserted: u64 },
    Checked,
    Failed { error: String },
}

#[derive(Debug, Clone)]
pub struct TableOutcome {
    pub table: TableKind,
    pub report: Option<CleanReport>,
    pub status: TableStatus,
}

impl TableOutcome {
    fn failed(table: TableKind, report: Option<CleanReport>, err: &ProcessingError) -> Self {
        error!("Failed to process {}: {}", table, err);
        Self {
            table,
            report,
            status: TableStatus::Failed {
                error: err.to_string(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, TableStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineSummary {
    pub outcomes: Vec<TableOutcome>,
}

impl PipelineSummary {
    pub fn outcome(&self, table: TableKind) -> Option<&TableOutcome> {
        self.outcomes.iter().find(|o| o.table == table)
    }

    pub fn failed_tables(&self) -> Vec<TableKind> {
        self.outcomes
            .iter()
            .filter(|o| o.is_failed())
            .map(|o| o.table)
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| !o.is_failed())
    }

    pub fn total_inserted(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                TableStatus::Loaded { inserted } => inserted,
                _ => 0,
            })
            .sum()
    }

    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Load Summary ===\n");
        for outcome in &self.outcomes {
            let status = match &outcome.status {
                TableStatus::Loaded { inserted } => format!("loaded {} rows", inserted),
                TableStatus::Checked => "checked".to_string(),
                TableStatus::Failed { error } => format!("FAILED: {}", error),
            };
            summary.push_str(&format!("{:<16} {}\n", outcome.table.table_name(), status));
        }

        let failed = self.failed_tables();
        if !failed.is_empty() {
            let names: Vec<&str> = failed.iter().map(|t| t.table_name()).collect();
            summary.push_str(&format!("\nFailed tables: {}\n", names.join(", ")));
        }

        for report in self.outcomes.iter().filter_map(|o| o.report.as_ref()) {
            summary.push('\n');
            summary.push_str(&report.generate_summary());
        }

        summary
    }
}

/// Parent key sets a table needs, looked up table by table.
async fn committed_parents<S: KeySource + ?Sized>(store: &S, table: TableKind) -> Result<ParentKeys> {
    let mut parents = ParentKeys::new();
    for fk in table.schema().foreign_keys {
        let parent = TableKind::from_table_name(fk.parent_table)?;
        let values = store.existing_values(parent, fk.parent_column).await?;
        info!(
            "{} committed {} distinct {} values",
            fk.parent_table,
            values.len(),
            fk.parent_column
        );
        parents.insert(fk.parent_table, fk.parent_column, values);
    }
    Ok(parents)
}

pub struct EtlPipeline<S> {
    store: S,
    config: PipelineConfig,
    reader: CsvTableReader,
    show_progress: bool,
}

impl<S: KeySource + Sink> EtlPipeline<S> {
    pub fn new(store: S, config: PipelineConfig) -> Self {
        Self {
            store,
            config,
            reader: CsvTableReader::new(),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Hand the store back, closing the run.
    pub fn into_store(self) -> S {
        self.store
    }

    pub async fn run(&mut self) -> PipelineSummary {
        let progress = ProgressReporter::new_spinner("Starting load", !self.show_progress);
        let mut summary = PipelineSummary::default();

        for table in TableKind::LOAD_ORDER {
            progress.set_message(&format!("Loading {}", table));
            let outcome = self.process(table).await;
            summary.outcomes.push(outcome);
        }

        progress.finish_with_message(&format!(
            "Loaded {} rows, {} failed tables",
            summary.total_inserted(),
            summary.failed_tables().len()
        ));
        if summary.all_succeeded() {
            info!("All tables loaded");
        } else {
            warn!("{} tables failed", summary.failed_tables().len());
        }
        summary
    }

    async fn process(&mut self, table: TableKind) -> TableOutcome {
        let cleaned = match self.extract_and_clean(table).await {
            Ok(cleaned) => cleaned,
            Err(e) => return TableOutcome::failed(table, None, &e),
        };

        if cleaned.is_empty() {
            warn!("No rows to load into {}", table);
            return TableOutcome {
                table,
                report: Some(cleaned.report),
                status: TableStatus::Loaded { inserted: 0 },
            };
        }

        match self.store.load(&cleaned).await {
            Ok(inserted) => TableOutcome {
                table,
                report: Some(cleaned.report),
                status: TableStatus::Loaded { inserted },
            },
            Err(e) => TableOutcome::failed(table, Some(cleaned.report), &e),
        }
    }

    async fn extract_and_clean(&self, table: TableKind) -> Result<CleanedTable> {
        let path = self.config.path_for(table);
        info!("Reading {} from {}", table, path.display());
        let raw = self.reader.read_table(&path)?;
        let parents = committed_parents(&self.store, table).await?;
        Cleaner::new(table).clean(&raw, &parents)
    }
}

/// Result of cleaning the source files against each other.
#[derive(Debug, Clone, Default)]
pub struct SourceCheck {
    pub summary: PipelineSummary,
    pub tables: Vec<CleanedTable>,
}

/// Clean every source file without a store: each child is checked against
/// the keys of its cleaned parent file.
pub fn check_sources(config: &PipelineConfig, reader: &CsvTableReader) -> SourceCheck {
    let mut check = SourceCheck::default();
    let mut cleaned: HashMap<TableKind, CleanedTable> = HashMap::new();

    for table in TableKind::LOAD_ORDER {
        let mut parents = ParentKeys::new();
        for fk in table.schema().foreign_keys {
            match TableKind::from_table_name(fk.parent_table)
                .ok()
                .and_then(|p| cleaned.get(&p))
            {
                Some(parent) => parents.insert(
                    fk.parent_table,
                    fk.parent_column,
                    parent.column_values(fk.parent_column),
                ),
                None => warn!("{} has no cleaned parent {}", table, fk.parent_table),
            }
        }

        let result = reader
            .read_table(&config.path_for(table))
            .and_then(|raw| Cleaner::new(table).clean(&raw, &parents));

        match result {
            Ok(table_rows) => {
                check.summary.outcomes.push(TableOutcome {
                    table,
                    report: Some(table_rows.report.clone()),
                    status: TableStatus::Checked,
                });
                cleaned.insert(table, table_rows);
            }
            Err(e) => check
                .summary
                .outcomes
                .push(TableOutcome::failed(table, None, &e)),
        }
    }

    check.tables = TableKind::LOAD_ORDER
        .iter()
        .filter_map(|t| cleaned.remove(t))
        .collect();
    check
}
