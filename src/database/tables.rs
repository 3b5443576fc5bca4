use crate::error::Result;
use crate::models::{TableKind, TableSchema};
use tokio_postgres::Client;
use tracing::{error, info};

/// `CREATE TABLE IF NOT EXISTS` for one table, derived from its schema.
pub fn create_table_sql(schema: &TableSchema) -> String {
    let mut lines: Vec<String> = schema
        .fields
        .iter()
        .map(|f| {
            let null = if f.is_required() || schema.key.contains(&f.name) {
                " NOT NULL"
            } else {
                ""
            };
            format!("    {} {}{}", f.name, f.sql_type(), null)
        })
        .collect();

    lines.push(format!("    PRIMARY KEY ({})", schema.key.join(", ")));
    for fk in schema.foreign_keys {
        lines.push(format!(
            "    FOREIGN KEY ({}) REFERENCES {} ({})",
            fk.column, fk.parent_table, fk.parent_column
        ));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
        schema.name,
        lines.join(",\n")
    )
}

/// DDL for every table, parents first.
pub fn schema_sql() -> String {
    TableKind::LOAD_ORDER
        .iter()
        .map(|kind| create_table_sql(kind.schema()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn create_tables(client: &Client) -> Result<()> {
    if let Err(e) = client.batch_execute(&schema_sql()).await {
        error!("Failed to create tables: {}", e);
        return Err(e.into());
    }
    info!("Ensured {} tables exist", TableKind::LOAD_ORDER.len());
    Ok(())
}
