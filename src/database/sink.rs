use crate::error::Result;
use crate::models::{CleanedTable, TableSchema, Value};
use crate::utils::constants::DEFAULT_PAGE_SIZE;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Transaction};
use tracing::{debug, info, warn};

/// Write side of the load.
#[async_trait::async_trait]
pub trait Sink: Send {
    /// Insert every row of `table`, skipping rows whose key already exists.
    /// All-or-nothing per table. Returns the number of rows actually written.
    /// The pipeline never calls this with an empty table.
    async fn load(&mut self, table: &CleanedTable) -> Result<u64>;
}

#[async_trait::async_trait]
impl Sink for Client {
    async fn load(&mut self, table: &CleanedTable) -> Result<u64> {
        let tx = self.transaction().await?;
        match insert_pages(&tx, table).await {
            Ok(inserted) => {
                tx.commit().await?;
                info!(
                    "Loaded {} of {} rows into {}",
                    inserted,
                    table.len(),
                    table.table_name()
                );
                Ok(inserted)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback of {} failed: {}", table.table_name(), rollback);
                }
                Err(e)
            }
        }
    }
}

async fn insert_pages(tx: &Transaction<'_>, table: &CleanedTable) -> Result<u64> {
    let mut inserted = 0;
    for (page, rows) in table.rows.chunks(DEFAULT_PAGE_SIZE).enumerate() {
        let sql = insert_sql(table.schema, rows.len());
        let params: Vec<&(dyn ToSql + Sync)> = rows
            .iter()
            .flat_map(|row| row.iter().map(Value::as_sql))
            .collect();

        let written = tx.execute(sql.as_str(), &params).await?;
        debug!(
            "{} page {}: {} of {} rows written",
            table.table_name(),
            page,
            written,
            rows.len()
        );
        inserted += written;
    }
    Ok(inserted)
}

/// Multi-row conflict-tolerant insert with `rows` placeholder tuples.
pub fn insert_sql(schema: &TableSchema, rows: usize) -> String {
    let width = schema.fields.len();
    let tuples: Vec<String> = (0..rows)
        .map(|r| {
            let placeholders: Vec<String> =
                (1..=width).map(|c| format!("${}", r * width + c)).collect();
            format!("({})", placeholders.join(", "))
        })
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES {} ON CONFLICT DO NOTHING",
        schema.name,
        schema.column_names().join(", "),
        tuples.join(", ")
    )
}
