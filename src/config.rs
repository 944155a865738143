// src/config.rs

use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs::File, path::Path};
use tracing::debug;

use crate::error::{DashboardError, Result};
use crate::process::utils::internal_name;

/// Fiscal calendar of the source workbook, in calendar order.
pub static DEFAULT_MONTHS: &[&str] = &[
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// Display names of the categorical columns the catalog queries rely on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub scenario: String,
    pub business_unit: String,
    pub account: String,
    pub year: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            scenario: "Escenario".into(),
            business_unit: "Unidad de Negocio".into(),
            account: "Cuenta".into(),
            year: "Año".into(),
        }
    }
}

impl FieldNames {
    pub fn required(&self) -> [&str; 4] {
        [
            self.scenario.as_str(),
            self.business_unit.as_str(),
            self.account.as_str(),
            self.year.as_str(),
        ]
    }
}

/// Literal values the catalog filters on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLiterals {
    pub year: String,
    pub sales_account: String,
    pub focus_business_unit: String,
    pub actual_scenario: String,
}

impl Default for QueryLiterals {
    fn default() -> Self {
        Self {
            year: "2023".into(),
            sales_account: "Ventas".into(),
            focus_business_unit: "Yerba Mate".into(),
            actual_scenario: "Actual".into(),
        }
    }
}

/// Column names given to the reshaped output tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputNames {
    /// Name of the unpivoted month column.
    pub category: String,
    /// Name of the month column in the expenses table.
    pub expense_period: String,
    /// Name of the amount column in every output table.
    pub value: String,
}

impl Default for OutputNames {
    fn default() -> Self {
        Self {
            category: "Mes".into(),
            expense_period: "Año".into(),
            value: "Ventas".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub months: Vec<String>,
    pub fields: FieldNames,
    pub literals: QueryLiterals,
    pub output: OutputNames,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            months: DEFAULT_MONTHS.iter().map(|m| m.to_string()).collect(),
            fields: FieldNames::default(),
            literals: QueryLiterals::default(),
            output: OutputNames::default(),
        }
    }
}

impl DashboardConfig {
    /// Read a YAML file; omitted keys keep their defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let cfg: Self = serde_yaml::from_reader(file)?;
        cfg.validate()?;
        debug!(path = %path.as_ref().display(), months = cfg.months.len(), "loaded config");
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.months.is_empty() {
            return Err(DashboardError::Config("month list is empty".into()));
        }
        let mut seen = HashSet::new();
        for m in &self.months {
            if m.trim().is_empty() {
                return Err(DashboardError::Config("month name is empty".into()));
            }
            if !seen.insert(m.as_str()) {
                return Err(DashboardError::Config(format!("month `{}` listed twice", m)));
            }
        }

        let names = self
            .fields
            .required()
            .into_iter()
            .chain([
                self.output.category.as_str(),
                self.output.expense_period.as_str(),
                self.output.value.as_str(),
            ]);
        for name in names {
            if name.trim().is_empty() {
                return Err(DashboardError::Config("field name is empty".into()));
            }
        }

        // Output columns sit next to the dimensions each query keeps.
        let sales_dims = [&self.fields.scenario, &self.fields.business_unit];
        distinct_outputs(
            &sales_dims,
            [&self.output.category, &self.output.value],
        )?;
        distinct_outputs(
            &[&self.fields.account],
            [&self.output.expense_period, &self.output.value],
        )?;
        Ok(())
    }
}

/// Output names must differ from each other and from the kept dimensions,
/// in both display and internal spelling.
fn distinct_outputs(dimensions: &[&String], outputs: [&String; 2]) -> Result<()> {
    let mut taken: HashSet<String> = dimensions
        .iter()
        .flat_map(|d| [d.to_string(), internal_name(d)])
        .collect();
    for out in outputs {
        let spellings = [out.clone(), internal_name(out)];
        if spellings.iter().any(|s| taken.contains(s)) {
            return Err(DashboardError::Config(format!(
                "output column `{}` clashes with another column of the same table",
                out
            )));
        }
        taken.extend(spellings);
    }
    Ok(())
}
