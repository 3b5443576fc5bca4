use crate::error::{ProcessingError, Result};
use crate::models::{FieldKind, FieldSpec, KeySet, TableKind, Value};
use tokio_postgres::{Client, Row};
use tracing::debug;

/// Read side of the load: which key values a committed table already holds.
#[async_trait::async_trait]
pub trait KeySource: Send + Sync {
    /// Distinct non-null values of `column` in `table`.
    async fn existing_values(&self, table: TableKind, column: &str) -> Result<KeySet>;
}

#[async_trait::async_trait]
impl KeySource for Client {
    async fn existing_values(&self, table: TableKind, column: &str) -> Result<KeySet> {
        // identifiers come from the schema, never from the caller's string
        let schema = table.schema();
        let field = schema
            .field(column)
            .ok_or_else(|| ProcessingError::UnknownColumn {
                table: schema.name,
                column: column.to_string(),
            })?;

        let sql = format!(
            "SELECT DISTINCT {c} FROM {t} WHERE {c} IS NOT NULL",
            c = field.name,
            t = schema.name
        );
        let values = self
            .query(sql.as_str(), &[])
            .await?
            .iter()
            .map(|row| read_value(row, field))
            .collect::<Result<KeySet>>()?;

        debug!("{}.{} holds {} distinct values", schema.name, field.name, values.len());
        Ok(values)
    }
}

fn read_value(row: &Row, field: &FieldSpec) -> Result<Value> {
    Ok(match field.kind {
        FieldKind::Text { .. } => Value::Text(row.try_get(0)?),
        FieldKind::Integer { .. } => Value::Integer(row.try_get(0)?),
        FieldKind::Timestamp => Value::Timestamp(row.try_get(0)?),
    })
}
