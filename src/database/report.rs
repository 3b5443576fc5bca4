use crate::error::Result;
use crate::models::ViewingRecord;
use crate::utils::constants::{CLIENT_TABLE, EPG_STAT_TABLE};
use const_format::concatcp;
use tokio_postgres::Client;
use tracing::info;

/// Per-subscriber, per-category viewing totals for segmentation.
#[async_trait::async_trait]
pub trait ReportSource: Send + Sync {
    async fn viewing_records(&self) -> Result<Vec<ViewingRecord>>;
}

#[rustfmt::skip]
const VIEWING_SQL: &str = concatcp!(
    "SELECT    c.client_id, ",
              "c.gender, ",
              "c.age_range, ",
              "e.category, ",
              "e.subcategory, ",
              "CAST(SUM(e.duration) AS BIGINT) AS total_duration ",
    "FROM      ", CLIENT_TABLE, " c ",
    "LEFT JOIN ", EPG_STAT_TABLE, " e ON c.client_id = e.client_id ",
    "GROUP BY  c.client_id, c.gender, c.age_range, e.category, e.subcategory ",
    "ORDER BY  c.client_id"
);

#[async_trait::async_trait]
impl ReportSource for Client {
    async fn viewing_records(&self) -> Result<Vec<ViewingRecord>> {
        let records: Vec<ViewingRecord> = self
            .query(VIEWING_SQL, &[])
            .await?
            .iter()
            .map(|row| -> Result<ViewingRecord> {
                Ok(ViewingRecord {
                    client_id: row.try_get(0)?,
                    gender: row.try_get(1)?,
                    age_range: row.try_get(2)?,
                    category: row.try_get(3)?,
                    subcategory: row.try_get(4)?,
                    total_duration: row.try_get(5)?,
                })
            })
            .collect::<Result<_>>()?;

        info!("Fetched {} viewing aggregates", records.len());
        Ok(records)
    }
}
