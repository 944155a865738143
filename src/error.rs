// src/error.rs

use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use std::io;
use thiserror::Error;

/// A month cell whose text is not a number once `$` and `,` are stripped.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("row {row}, field `{field}`: cannot parse {value:?} as a number")]
pub struct ParseError {
    /// 0-based data row (header excluded).
    pub row: usize,
    /// Display name of the offending column.
    pub field: String,
    /// Raw cell text as read from the source.
    pub value: String,
}

/// The table does not have the shape the pipeline needs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("required field `{0}` is missing")]
    MissingField(String),

    #[error("field `{0}` appears more than once in the header")]
    DuplicateField(String),

    #[error("field `{field}` has type {actual}, expected {expected}")]
    UnexpectedType {
        field: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("row {row} has {actual} cells, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("renaming `{display}` to `{internal}` collides with an existing field")]
    RenameCollision { display: String, internal: String },
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
