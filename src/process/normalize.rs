// src/process/normalize.rs

use arrow::{
    array::{Array, ArrayRef, Float64Array, Float64Builder, StringArray},
    compute::cast,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};
use tracing::{debug, info};

use crate::config::DashboardConfig;
use crate::error::{ParseError, Result, SchemaError};
use crate::process::utils::{internal_name, parse_currency};

/// Two-way lookup between internal column identifiers and their display labels.
///
/// Only renamed columns are stored; every other column is its own label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnLabels {
    to_display: BTreeMap<String, String>,
}

impl ColumnLabels {
    fn insert(&mut self, internal: String, display: String) {
        self.to_display.insert(internal, display);
    }

    /// Label to show for an internal column name.
    pub fn display<'a>(&'a self, internal: &'a str) -> &'a str {
        self.to_display
            .get(internal)
            .map(String::as_str)
            .unwrap_or(internal)
    }

    /// Internal name a display label was renamed to, if it was renamed.
    pub fn internal(&self, display: &str) -> Option<&str> {
        self.to_display
            .iter()
            .find(|(_, d)| d.as_str() == display)
            .map(|(i, _)| i.as_str())
    }

    pub fn renamed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.to_display
            .iter()
            .map(|(i, d)| (i.as_str(), d.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.to_display.is_empty()
    }
}

/// Sales sheet with numeric month columns and space-free column names.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub batch: RecordBatch,
    pub labels: ColumnLabels,
    pub months: Vec<String>,
}

impl NormalizedTable {
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Resolve a column given either its display label or its internal name.
    pub fn resolve<'a>(&'a self, name: &'a str) -> Result<&'a str> {
        let internal = self.labels.internal(name).unwrap_or(name);
        if self.batch.schema().index_of(internal).is_ok() {
            Ok(internal)
        } else {
            Err(SchemaError::MissingField(name.to_string()).into())
        }
    }
}

/// Coerce the month columns of `raw` to `Float64` and rename spaced columns.
///
/// Fails on the first missing required field or unparseable month cell; no
/// partial table is ever returned. `raw` itself is left untouched.
#[tracing::instrument(level = "info", skip_all, fields(rows = raw.num_rows()))]
pub fn normalize(raw: &RecordBatch, config: &DashboardConfig) -> Result<NormalizedTable> {
    let schema = raw.schema();

    // ─── 1) required fields ─────────────────────────────────────────
    let required = config
        .fields
        .required()
        .into_iter()
        .chain(config.months.iter().map(String::as_str));
    for name in required {
        if schema.index_of(name).is_err() {
            return Err(SchemaError::MissingField(name.to_string()).into());
        }
    }

    // ─── 2) convert months, rename the rest ─────────────────────────
    let months: HashSet<&str> = config.months.iter().map(String::as_str).collect();
    let mut fields = Vec::with_capacity(schema.fields().len());
    let mut columns = Vec::with_capacity(raw.num_columns());
    let mut labels = ColumnLabels::default();
    let mut taken: HashSet<String> = HashSet::with_capacity(schema.fields().len());

    for (arr, fld) in raw.columns().iter().zip(schema.fields()) {
        let name = fld.name();

        if months.contains(name.as_str()) {
            let values = month_to_f64(arr, name)?;
            taken.insert(name.clone());
            fields.push(Field::new(name, DataType::Float64, false));
            columns.push(Arc::new(values) as ArrayRef);
            continue;
        }

        let internal = internal_name(name);
        if internal != *name {
            debug!(display = %name, internal = %internal, "renaming column");
            labels.insert(internal.clone(), name.clone());
        }
        if !taken.insert(internal.clone()) {
            return Err(SchemaError::RenameCollision {
                display: name.clone(),
                internal,
            }
            .into());
        }
        fields.push(Field::new(&internal, fld.data_type().clone(), fld.is_nullable()));
        columns.push(arr.clone());
    }

    // a renamed column may also collide with a month or a later column
    if fields.len() != taken.len() {
        let dup = fields
            .iter()
            .map(|f| f.name())
            .find(|n| fields.iter().filter(|f| f.name() == *n).count() > 1)
            .cloned()
            .unwrap_or_default();
        return Err(SchemaError::RenameCollision {
            display: labels.display(&dup).to_string(),
            internal: dup,
        }
        .into());
    }

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    info!(
        rows = batch.num_rows(),
        months = config.months.len(),
        renamed = labels.renamed().count(),
        "normalized sales sheet"
    );

    Ok(NormalizedTable {
        batch,
        labels,
        months: config.months.clone(),
    })
}

/// Text cells go through currency parsing; numeric columns are cast and
/// checked to be finite.
fn month_to_f64(arr: &ArrayRef, field: &str) -> Result<Float64Array> {
    let parse_err = |row: usize, value: String| ParseError {
        row,
        field: field.to_string(),
        value,
    };

    if let Some(sarr) = arr.as_any().downcast_ref::<StringArray>() {
        let mut b = Float64Builder::with_capacity(sarr.len());
        for (row, opt) in sarr.iter().enumerate() {
            let raw = opt.unwrap_or("");
            let v = parse_currency(raw).ok_or_else(|| parse_err(row, raw.to_string()))?;
            b.append_value(v);
        }
        return Ok(b.finish());
    }

    if !arr.data_type().is_numeric() {
        return Err(SchemaError::UnexpectedType {
            field: field.to_string(),
            expected: DataType::Float64,
            actual: arr.data_type().clone(),
        }
        .into());
    }

    let casted = cast(arr, &DataType::Float64)?;
    let farr = casted
        .as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| SchemaError::UnexpectedType {
            field: field.to_string(),
            expected: DataType::Float64,
            actual: casted.data_type().clone(),
        })?;

    for (row, opt) in farr.iter().enumerate() {
        match opt {
            Some(v) if v.is_finite() => {}
            Some(v) => return Err(parse_err(row, v.to_string()).into()),
            None => return Err(parse_err(row, String::new()).into()),
        }
    }
    // drop any validity buffer; every value was checked above
    Ok(Float64Array::from(farr.values().to_vec()))
}
