// src/pivot/filter.rs

use arrow::{
    array::{Array, BooleanArray, StringArray},
    compute::{and, filter_record_batch, kernels::cmp},
    datatypes::DataType,
    record_batch::RecordBatch,
};
use std::fmt;

use crate::error::{Result, SchemaError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
}

/// `field <op> value` over a `Utf8` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub op: CompareOp,
    pub value: String,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
        };
        write!(f, "{} {} {:?}", self.field, op, self.value)
    }
}

/// Conjunction of equality tests. An empty predicate keeps every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

impl Predicate {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(field.into(), CompareOp::Eq, value.into())
    }

    #[must_use]
    pub fn not_eq(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(field.into(), CompareOp::NotEq, value.into())
    }

    fn with(mut self, field: String, op: CompareOp, value: String) -> Self {
        self.conditions.push(Condition { field, op, value });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Row mask: `true` where every condition holds.
    pub fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let mut acc = BooleanArray::from(vec![true; batch.num_rows()]);

        for cond in &self.conditions {
            let idx = batch
                .schema()
                .index_of(&cond.field)
                .map_err(|_| SchemaError::MissingField(cond.field.clone()))?;
            let column = batch.column(idx);
            if column.data_type() != &DataType::Utf8 {
                return Err(SchemaError::UnexpectedType {
                    field: cond.field.clone(),
                    expected: DataType::Utf8,
                    actual: column.data_type().clone(),
                }
                .into());
            }

            let scalar = StringArray::new_scalar(&cond.value);
            let hit = match cond.op {
                CompareOp::Eq => cmp::eq(column, &scalar)?,
                CompareOp::NotEq => cmp::neq(column, &scalar)?,
            };
            acc = and(&acc, &hit)?;
        }

        Ok(acc)
    }

    /// Rows of `batch` that satisfy the predicate, as a new batch.
    pub fn apply(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        if self.conditions.is_empty() {
            return Ok(batch.clone());
        }
        let mask = self.mask(batch)?;
        Ok(filter_record_batch(batch, &mask)?)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conditions.is_empty() {
            return write!(f, "TRUE");
        }
        for (i, c) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}
