// src/catalog.rs

use arrow::record_batch::RecordBatch;
use tracing::{info, warn};

use crate::aggregate::aggregate;
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::pivot::{pivot, pivot_with, Predicate, UnpivotSpec};
use crate::process::NormalizedTable;

/// The three chart-ready tables of one dashboard pass.
#[derive(Debug, Clone)]
pub struct DashboardTables {
    /// (scenario, business unit, value): grouped bar comparison.
    pub annual_sales: RecordBatch,
    /// (scenario, month, value): one line per scenario.
    pub monthly_sales: RecordBatch,
    /// (account, month, value): stacked expenses per period.
    pub annual_expenses: RecordBatch,
}

impl DashboardTables {
    pub const NAMES: [&'static str; 3] = ["annual_sales", "monthly_sales", "annual_expenses"];

    /// `(name, table)` pairs in a fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &RecordBatch)> {
        Self::NAMES.into_iter().zip([
            &self.annual_sales,
            &self.monthly_sales,
            &self.annual_expenses,
        ])
    }
}

/// Yearly sales per (scenario, business unit) for the configured year.
pub fn annual_sales_by_scenario_and_unit(
    table: &NormalizedTable,
    config: &DashboardConfig,
) -> Result<RecordBatch> {
    let scenario = table.resolve(&config.fields.scenario)?;
    let unit = table.resolve(&config.fields.business_unit)?;
    let filter = Predicate::all()
        .eq(table.resolve(&config.fields.year)?, &config.literals.year)
        .eq(table.resolve(&config.fields.account)?, &config.literals.sales_account);
    let spec = UnpivotSpec::new(
        &[scenario, unit],
        &table.months,
        &config.output.category,
        &config.output.value,
    );

    let tidy = pivot(&table.batch, &filter, &spec)?;
    aggregate(&tidy, &[scenario, unit], &config.output.value)
}

/// Month-by-month sales of the focus business unit, one series per scenario.
pub fn monthly_sales_for_unit(
    table: &NormalizedTable,
    config: &DashboardConfig,
) -> Result<RecordBatch> {
    let scenario = table.resolve(&config.fields.scenario)?;
    let filter = Predicate::all()
        .eq(table.resolve(&config.fields.year)?, &config.literals.year)
        .eq(table.resolve(&config.fields.account)?, &config.literals.sales_account)
        .eq(
            table.resolve(&config.fields.business_unit)?,
            &config.literals.focus_business_unit,
        );
    let spec = UnpivotSpec::new(
        &[scenario],
        &table.months,
        &config.output.category,
        &config.output.value,
    );

    pivot(&table.batch, &filter, &spec)
}

/// Absolute expense amounts of the actual scenario, per (account, month).
pub fn annual_expenses_by_account(
    table: &NormalizedTable,
    config: &DashboardConfig,
) -> Result<RecordBatch> {
    let account = table.resolve(&config.fields.account)?;
    let filter = Predicate::all()
        .eq(table.resolve(&config.fields.scenario)?, &config.literals.actual_scenario)
        .not_eq(account, &config.literals.sales_account);
    let spec = UnpivotSpec::new(
        &[account],
        &table.months,
        &config.output.expense_period,
        &config.output.value,
    );

    let tidy = pivot_with(&table.batch, &filter, &spec, f64::abs)?;
    aggregate(
        &tidy,
        &[account, config.output.expense_period.as_str()],
        &config.output.value,
    )
}

/// Run every catalog query against the same normalized table.
///
/// The queries only read `table`, so they are evaluated concurrently on the
/// rayon pool; the result is identical to running them one after another.
#[tracing::instrument(level = "info", skip_all, fields(rows = table.num_rows()))]
pub fn run_catalog(table: &NormalizedTable, config: &DashboardConfig) -> Result<DashboardTables> {
    let (annual_sales, (monthly_sales, annual_expenses)) = rayon::join(
        || annual_sales_by_scenario_and_unit(table, config),
        || {
            rayon::join(
                || monthly_sales_for_unit(table, config),
                || annual_expenses_by_account(table, config),
            )
        },
    );

    let tables = DashboardTables {
        annual_sales: annual_sales?,
        monthly_sales: monthly_sales?,
        annual_expenses: annual_expenses?,
    };

    for (name, batch) in tables.iter() {
        if batch.num_rows() == 0 {
            warn!(table = name, "query matched no rows; chart will be empty");
        } else {
            info!(table = name, rows = batch.num_rows(), "query done");
        }
    }
    Ok(tables)
}
