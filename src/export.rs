// src/export.rs

use arrow::record_batch::RecordBatch;
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::catalog::DashboardTables;
use crate::error::Result;

/// Write one batch to `path` as a single-row-group Snappy Parquet file.
pub fn write_parquet(batch: &RecordBatch, path: &Path) -> Result<u64> {
    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;

    let bytes = fs::metadata(path)?.len();
    debug!(path = %path.display(), rows = batch.num_rows(), bytes, "wrote parquet");
    Ok(bytes)
}

/// Hand the catalog tables to the presentation layer as `<dir>/<name>.parquet`.
#[tracing::instrument(level = "info", skip(tables), fields(dir = %dir.as_ref().display()))]
pub fn write_tables<P: AsRef<Path>>(dir: P, tables: &DashboardTables) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(DashboardTables::NAMES.len());
    for (name, batch) in tables.iter() {
        let path = dir.join(format!("{}.parquet", name));
        write_parquet(batch, &path)?;
        written.push(path);
    }
    info!(files = written.len(), "exported dashboard tables");
    Ok(written)
}
