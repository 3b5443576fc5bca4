use crate::error::Result;
use crate::models::CleanedTable;
use crate::utils::constants::CSV_DELIMITER;
use csv::WriterBuilder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes cleaned tables back out in the source export format.
pub struct CsvTableWriter {
    delimiter: u8,
}

impl CsvTableWriter {
    pub fn new() -> Self {
        Self {
            delimiter: CSV_DELIMITER,
        }
    }

    pub fn write_table(&self, table: &CleanedTable, path: &Path) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        self.write_to(table, file)?;
        info!("Wrote {} rows to {}", table.len(), path.display());
        Ok(())
    }

    /// Write `table` as `<dir>/<table>.csv` and return the path.
    pub fn write_into_dir(&self, table: &CleanedTable, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.csv", table.table_name()));
        self.write_table(table, &path)?;
        Ok(path)
    }

    pub fn write_to<W: Write>(&self, table: &CleanedTable, out: W) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(out);

        writer.write_record(table.schema.column_names())?;
        for row in &table.rows {
            writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl Default for CsvTableWriter {
    fn default() -> Self {
        Self::new()
    }
}
