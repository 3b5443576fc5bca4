use crate::error::{ProcessingError, Result};
use crate::models::RawTable;
use crate::utils::constants::{CSV_DELIMITER, DEFAULT_BUFFER_SIZE};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

/// Reads delimited exports into a [`RawTable`].
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected, and rows
/// with a different number of cells than the header are kept.
pub struct CsvTableReader {
    delimiter: u8,
}

impl CsvTableReader {
    pub fn new() -> Self {
        Self {
            delimiter: CSV_DELIMITER,
        }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Read a whole file.
    pub fn read_table(&self, path: &Path) -> Result<RawTable> {
        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let (content, _, had_errors) = encoding_rs::UTF_8.decode(&bytes);
        if had_errors {
            warn!(
                "{} contains invalid UTF-8; undecodable bytes were replaced",
                path.display()
            );
        }

        let table = self.read_str(&content)?;
        debug!(
            "Read {} rows with {} columns from {}",
            table.len(),
            table.headers.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse already-decoded text.
    pub fn read_str(&self, content: &str) -> Result<RawTable> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ProcessingError::InvalidFormat(
                "source has no header row".to_string(),
            ));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(RawTable::new(headers, rows))
    }
}

impl Default for CsvTableReader {
    fn default() -> Self {
        Self::new()
    }
}
