// src/aggregate.rs

use arrow::{
    array::{Array, ArrayRef, Float64Array, StringArray, StringBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::debug;

use crate::error::{Result, SchemaError};

type GroupKey = Vec<Option<String>>;

/// `SELECT <group_keys>, SUM(<value_field>) AS <value_field> GROUP BY <group_keys>`.
///
/// One output row per key combination present in `batch`, in order of first
/// appearance. Null values are skipped like SQL `SUM`; NaN and infinities are
/// summed as-is and show up in the result.
pub fn aggregate(batch: &RecordBatch, group_keys: &[&str], value_field: &str) -> Result<RecordBatch> {
    let schema = batch.schema();

    let mut seen = HashSet::with_capacity(group_keys.len() + 1);
    for name in group_keys.iter().chain([&value_field]) {
        if !seen.insert(*name) {
            return Err(SchemaError::DuplicateField(name.to_string()).into());
        }
    }

    let mut keys: Vec<&StringArray> = Vec::with_capacity(group_keys.len());
    for name in group_keys {
        let idx = schema
            .index_of(name)
            .map_err(|_| SchemaError::MissingField(name.to_string()))?;
        let col = batch.column(idx);
        let sarr = col
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| SchemaError::UnexpectedType {
                field: name.to_string(),
                expected: DataType::Utf8,
                actual: col.data_type().clone(),
            })?;
        keys.push(sarr);
    }

    let value_idx = schema
        .index_of(value_field)
        .map_err(|_| SchemaError::MissingField(value_field.to_string()))?;
    let value_col = batch.column(value_idx);
    let values = value_col
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| SchemaError::UnexpectedType {
            field: value_field.to_string(),
            expected: DataType::Float64,
            actual: value_col.data_type().clone(),
        })?;

    // ─── accumulate ─────────────────────────────────────────────────
    let mut slots: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<(GroupKey, Option<f64>)> = Vec::new();

    for row in 0..batch.num_rows() {
        let key: GroupKey = keys
            .iter()
            .map(|k| k.is_valid(row).then(|| k.value(row).to_string()))
            .collect();
        let slot = *slots.entry(key).or_insert_with_key(|k| {
            groups.push((k.clone(), None));
            groups.len() - 1
        });
        if values.is_valid(row) {
            let sum = &mut groups[slot].1;
            *sum = Some(sum.unwrap_or(0.0) + values.value(row));
        }
    }

    debug!(
        rows = batch.num_rows(),
        groups = groups.len(),
        keys = ?group_keys,
        "aggregated"
    );

    // ─── build output ───────────────────────────────────────────────
    let mut fields: Vec<Field> = group_keys
        .iter()
        .map(|k| Field::new(*k, DataType::Utf8, true))
        .collect();
    fields.push(Field::new(value_field, DataType::Float64, true));

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(fields.len());
    for i in 0..group_keys.len() {
        let mut b = StringBuilder::with_capacity(groups.len(), groups.len() * 8);
        for (key, _) in &groups {
            b.append_option(key[i].as_deref());
        }
        columns.push(Arc::new(b.finish()));
    }
    let sums: Float64Array = groups.iter().map(|(_, s)| *s).collect();
    columns.push(Arc::new(sums));

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}
