// src/pivot/mod.rs
pub mod filter;

use arrow::{
    array::{Array, ArrayRef, Float64Array, Float64Builder, StringArray, UInt32Array},
    compute::take,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::{collections::HashSet, sync::Arc};
use tracing::debug;

use crate::error::{DashboardError, Result, SchemaError};

pub use filter::{CompareOp, Condition, Predicate};

/// Per-value numeric transform applied before the category/value split.
pub type ValueTransform = fn(f64) -> f64;

/// What to unpivot and how to name the result, i.e.
/// `UNPIVOT (<dimensions>, <categories>) ON <categories> INTO NAME <category_column> VALUE <value_column>`.
#[derive(Debug, Clone)]
pub struct UnpivotSpec {
    /// `Utf8` columns copied verbatim onto every expanded row.
    pub dimensions: Vec<String>,
    /// `Float64` columns turned into (category, value) pairs, in this order.
    pub categories: Vec<String>,
    pub category_column: String,
    pub value_column: String,
    pub transform: Option<ValueTransform>,
}

impl UnpivotSpec {
    pub fn new(
        dimensions: &[&str],
        categories: &[String],
        category_column: &str,
        value_column: &str,
    ) -> Self {
        Self {
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            categories: categories.to_vec(),
            category_column: category_column.to_string(),
            value_column: value_column.to_string(),
            transform: None,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: ValueTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    fn output_schema(&self) -> Schema {
        let mut fields: Vec<Field> = self
            .dimensions
            .iter()
            .map(|d| Field::new(d, DataType::Utf8, true))
            .collect();
        fields.push(Field::new(&self.category_column, DataType::Utf8, false));
        fields.push(Field::new(&self.value_column, DataType::Float64, true));
        Schema::new(fields)
    }
}

/// Filter `batch`, then reshape the category columns into long form.
///
/// Output has `rows_passing_filter * categories.len()` rows, source-row major.
pub fn pivot(batch: &RecordBatch, filter: &Predicate, spec: &UnpivotSpec) -> Result<RecordBatch> {
    let filtered = filter.apply(batch)?;
    debug!(
        filter = %filter,
        kept = filtered.num_rows(),
        of = batch.num_rows(),
        "pivot filter"
    );
    unpivot(&filtered, spec)
}

/// `pivot` with a numeric transform applied to every category value first.
pub fn pivot_with(
    batch: &RecordBatch,
    filter: &Predicate,
    spec: &UnpivotSpec,
    transform: ValueTransform,
) -> Result<RecordBatch> {
    let spec = spec.clone().with_transform(transform);
    pivot(batch, filter, &spec)
}

/// Wide → long without filtering.
pub fn unpivot(batch: &RecordBatch, spec: &UnpivotSpec) -> Result<RecordBatch> {
    let n_rows = batch.num_rows();
    let n_cats = spec.categories.len();

    // ─── 1) resolve + type-check every referenced column ────────────
    let mut seen = HashSet::with_capacity(spec.dimensions.len() + 2);
    for name in spec
        .dimensions
        .iter()
        .chain([&spec.category_column, &spec.value_column])
    {
        if !seen.insert(name.as_str()) {
            return Err(SchemaError::DuplicateField(name.clone()).into());
        }
    }

    let mut dims = Vec::with_capacity(spec.dimensions.len());
    for name in &spec.dimensions {
        let col = column_of(batch, name)?;
        expect_type(name, col, DataType::Utf8)?;
        dims.push(col);
    }
    let mut cats: Vec<&Float64Array> = Vec::with_capacity(n_cats);
    for name in &spec.categories {
        let col = column_of(batch, name)?;
        expect_type(name, col, DataType::Float64)?;
        let farr = col
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| DashboardError::from(SchemaError::MissingField(name.clone())))?;
        cats.push(farr);
    }

    // ─── 2) repeat every source row once per category ───────────────
    let out_len = n_rows * n_cats;
    let indices = UInt32Array::from_iter_values(
        (0..n_rows as u32).flat_map(|row| std::iter::repeat(row).take(n_cats)),
    );

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(dims.len() + 2);
    for col in dims {
        columns.push(take(col.as_ref(), &indices, None)?);
    }

    // ─── 3) category names + values, in category order ──────────────
    let category: StringArray = (0..n_rows)
        .flat_map(|_| spec.categories.iter().map(|c| Some(c.as_str())))
        .collect();

    let mut values = Float64Builder::with_capacity(out_len);
    for row in 0..n_rows {
        for farr in &cats {
            // an absent cell stays absent; the transform only sees real values
            values.append_option(farr.is_valid(row).then(|| {
                let v = farr.value(row);
                spec.transform.map_or(v, |f| f(v))
            }));
        }
    }

    columns.push(Arc::new(category));
    columns.push(Arc::new(values.finish()));

    Ok(RecordBatch::try_new(Arc::new(spec.output_schema()), columns)?)
}

fn column_of<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| SchemaError::MissingField(name.to_string()))?;
    Ok(batch.column(idx))
}

fn expect_type(name: &str, col: &ArrayRef, expected: DataType) -> Result<()> {
    if col.data_type() == &expected {
        Ok(())
    } else {
        Err(SchemaError::UnexpectedType {
            field: name.to_string(),
            expected,
            actual: col.data_type().clone(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn months() -> Vec<String> {
        ["Ene", "Feb", "Mar"].iter().map(|m| m.to_string()).collect()
    }

    fn sample() -> Result<RecordBatch> {
        let schema = Schema::new(vec![
            Field::new("Escenario", DataType::Utf8, false),
            Field::new("Unidad_de_Negocio", DataType::Utf8, false),
            Field::new("Cuenta", DataType::Utf8, false),
            Field::new("Ene", DataType::Float64, false),
            Field::new("Feb", DataType::Float64, false),
            Field::new("Mar", DataType::Float64, false),
        ]);
        Ok(RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["Actual", "Budget", "Actual"])) as ArrayRef,
                Arc::new(StringArray::from(vec!["Yerba Mate", "Yerba Mate", "Té"])),
                Arc::new(StringArray::from(vec!["Ventas", "Ventas", "Sueldos"])),
                Arc::new(Float64Array::from(vec![1.0, 10.0, -50.0])),
                Arc::new(Float64Array::from(vec![2.0, 20.0, -60.0])),
                Arc::new(Float64Array::from(vec![3.0, 30.0, 70.0])),
            ],
        )?)
    }

    fn strings(batch: &RecordBatch, name: &str) -> Vec<String> {
        let idx = batch.schema().index_of(name).unwrap();
        batch
            .column(idx)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap()
            .iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect()
    }

    fn nullable_floats(batch: &RecordBatch, name: &str) -> Vec<Option<f64>> {
        let idx = batch.schema().index_of(name).unwrap();
        batch
            .column(idx)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap()
            .iter()
            .collect()
    }

    fn floats(batch: &RecordBatch, name: &str) -> Vec<f64> {
        let idx = batch.schema().index_of(name).unwrap();
        batch
            .column(idx)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap()
            .values()
            .to_vec()
    }

    #[test]
    fn expands_each_row_once_per_category() -> Result<()> {
        let batch = sample()?;
        let spec = UnpivotSpec::new(&["Escenario", "Unidad_de_Negocio"], &months(), "Mes", "Ventas");
        let out = pivot(&batch, &Predicate::all(), &spec)?;

        assert_eq!(out.num_rows(), 3 * 3);
        assert_eq!(
            strings(&out, "Mes"),
            vec!["Ene", "Feb", "Mar", "Ene", "Feb", "Mar", "Ene", "Feb", "Mar"]
        );
        assert_eq!(
            floats(&out, "Ventas"),
            vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0, -50.0, -60.0, 70.0]
        );
        // dimensions copied verbatim from the source row
        assert_eq!(
            strings(&out, "Escenario"),
            vec!["Actual", "Actual", "Actual", "Budget", "Budget", "Budget", "Actual", "Actual", "Actual"]
        );
        assert_eq!(strings(&out, "Unidad_de_Negocio")[8], "Té");

        let names: Vec<String> = out
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, vec!["Escenario", "Unidad_de_Negocio", "Mes", "Ventas"]);
        Ok(())
    }

    #[test]
    fn filter_runs_before_unpivot() -> Result<()> {
        let batch = sample()?;
        let spec = UnpivotSpec::new(&["Escenario"], &months(), "Mes", "Ventas");
        let pred = Predicate::all().eq("Cuenta", "Ventas").eq("Escenario", "Budget");
        let out = pivot(&batch, &pred, &spec)?;
        assert_eq!(out.num_rows(), 3);
        assert_eq!(floats(&out, "Ventas"), vec![10.0, 20.0, 30.0]);
        Ok(())
    }

    #[test]
    fn transform_applies_to_magnitude_only() -> Result<()> {
        let batch = sample()?;
        let spec = UnpivotSpec::new(&["Cuenta"], &months(), "Año", "Ventas");
        let pred = Predicate::all().not_eq("Cuenta", "Ventas");
        let out = pivot_with(&batch, &pred, &spec, f64::abs)?;
        assert_eq!(floats(&out, "Ventas"), vec![50.0, 60.0, 70.0]);
        assert_eq!(strings(&out, "Cuenta"), vec!["Sueldos"; 3]);
        Ok(())
    }

    #[test]
    fn no_dimensions_leaves_category_and_value() -> Result<()> {
        let batch = sample()?;
        let spec = UnpivotSpec::new(&[], &months(), "Mes", "Ventas");
        let out = pivot(&batch, &Predicate::all(), &spec)?;
        assert_eq!(out.num_columns(), 2);
        assert_eq!(out.num_rows(), 9);
        Ok(())
    }

    #[test]
    fn zero_matching_rows_gives_empty_table() -> Result<()> {
        let batch = sample()?;
        let spec = UnpivotSpec::new(&["Escenario"], &months(), "Mes", "Ventas");
        let out = pivot(&batch, &Predicate::all().eq("Cuenta", "Impuestos"), &spec)?;
        assert_eq!(out.num_rows(), 0);
        assert_eq!(out.num_columns(), 3);
        Ok(())
    }

    #[test]
    fn unknown_category_is_schema_error() -> Result<()> {
        let batch = sample()?;
        let cats = vec!["Ene".to_string(), "Abr".to_string()];
        let spec = UnpivotSpec::new(&["Escenario"], &cats, "Mes", "Ventas");
        let err = pivot(&batch, &Predicate::all(), &spec).unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Schema(SchemaError::MissingField(ref f)) if f == "Abr"
        ));
        Ok(())
    }

    #[test]
    fn text_category_is_type_error() -> Result<()> {
        let batch = sample()?;
        let cats = vec!["Cuenta".to_string()];
        let spec = UnpivotSpec::new(&["Escenario"], &cats, "Mes", "Ventas");
        let err = unpivot(&batch, &spec).unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Schema(SchemaError::UnexpectedType { .. })
        ));
        Ok(())
    }

    #[test]
    fn null_cells_stay_null() -> Result<()> {
        let schema = Schema::new(vec![
            Field::new("Escenario", DataType::Utf8, false),
            Field::new("Ene", DataType::Float64, true),
            Field::new("Feb", DataType::Float64, true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["Actual", "Actual"])) as ArrayRef,
                Arc::new(Float64Array::from(vec![None, None])),
                Arc::new(Float64Array::from(vec![Some(-2.0), Some(-4.0)])),
            ],
        )?;
        let cats = vec!["Ene".to_string(), "Feb".to_string()];
        let spec = UnpivotSpec::new(&["Escenario"], &cats, "Mes", "Ventas");
        let out = pivot_with(&batch, &Predicate::all(), &spec, f64::abs)?;

        assert!(out.schema().field_with_name("Ventas")?.is_nullable());
        assert_eq!(
            nullable_floats(&out, "Ventas"),
            vec![None, Some(2.0), None, Some(4.0)]
        );

        // a month with no value anywhere sums to null, not 0
        let sums = crate::aggregate::aggregate(&out, &["Mes"], "Ventas")?;
        assert_eq!(nullable_floats(&sums, "Ventas"), vec![None, Some(6.0)]);
        Ok(())
    }

    #[test]
    fn clashing_output_names_are_rejected() -> Result<()> {
        let batch = sample()?;
        for spec in [
            UnpivotSpec::new(&["Escenario"], &months(), "Escenario", "Ventas"),
            UnpivotSpec::new(&["Cuenta"], &months(), "Mes", "Cuenta"),
            UnpivotSpec::new(&["Escenario"], &months(), "Mes", "Mes"),
        ] {
            let err = unpivot(&batch, &spec).unwrap_err();
            assert!(matches!(
                err,
                DashboardError::Schema(SchemaError::DuplicateField(_))
            ));
        }
        Ok(())
    }
}
