//! Sales sheet reshaping for the yerba dashboard: load the wide monthly CSV,
//! normalize it, and produce the tidy tables the charts are drawn from.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod pivot;
pub mod process;

pub use aggregate::aggregate;
pub use catalog::{run_catalog, DashboardTables};
pub use config::DashboardConfig;
pub use error::{DashboardError, ParseError, Result, SchemaError};
pub use pivot::{pivot, pivot_with, Predicate, UnpivotSpec};
pub use process::{load_csv, normalize, NormalizedTable, RawTable};
