// src/process/mod.rs
pub mod normalize;
pub mod utils;

use arrow::{
    array::{ArrayRef, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use csv::ReaderBuilder;
use std::{collections::HashSet, fs::File, io::Read, path::Path, sync::Arc};
use tracing::{debug, info};

use crate::error::{Result, SchemaError};

pub use normalize::{normalize, ColumnLabels, NormalizedTable};

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column names exactly as written in the header row.
    pub headers: Vec<String>,
    /// Every data row, one `String` per header.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Build an all-`Utf8` batch; empty cells stay as empty strings.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let expected = self.headers.len();
        if let Some((row, cells)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != expected)
        {
            return Err(SchemaError::RaggedRow {
                row,
                expected,
                actual: cells.len(),
            }
            .into());
        }

        let fields: Vec<Field> = self
            .headers
            .iter()
            .map(|h| Field::new(h, DataType::Utf8, false))
            .collect();
        let schema = Arc::new(Schema::new(fields));

        let columns: Vec<ArrayRef> = (0..self.headers.len())
            .map(|idx| {
                let col: StringArray = self
                    .rows
                    .iter()
                    .map(|row| Some(row[idx].as_str()))
                    .collect();
                Arc::new(col) as ArrayRef
            })
            .collect();

        Ok(RecordBatch::try_new(schema, columns)?)
    }
}

/// Parse CSV text from any reader into a `RawTable`.
///
/// The header row is required, every record must have as many fields as the
/// header, and header names must be unique.
pub fn read_raw_table<R: Read>(reader: R) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut seen = HashSet::with_capacity(headers.len());
    for h in &headers {
        if !seen.insert(h.as_str()) {
            return Err(SchemaError::DuplicateField(h.clone()).into());
        }
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!(columns = headers.len(), rows = rows.len(), "parsed CSV");
    Ok(RawTable { headers, rows })
}

/// `read_raw_table` followed by `RawTable::to_record_batch`.
pub fn read_raw_batch<R: Read>(reader: R) -> Result<RecordBatch> {
    read_raw_table(reader)?.to_record_batch()
}

/// Open `path` and read the whole sales sheet into memory.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let file = File::open(path.as_ref())?;
    let table = read_raw_table(file)?;
    info!(rows = table.num_rows(), "loaded sales sheet");
    Ok(table)
}

/// `load_csv` followed by `RawTable::to_record_batch`.
pub fn load_raw_batch<P: AsRef<Path>>(path: P) -> Result<RecordBatch> {
    load_csv(path)?.to_record_batch()
}
