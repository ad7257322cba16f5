//! Covariate selection and feature matrix assembly

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::estimator::Matrix;

/// Numeric covariates used by default
pub const NUMERIC_FEATURES: [&str; 4] = [
    "time_spent",
    "age",
    "days_since_last_visit",
    "pages_viewed",
];

/// Nominal covariates one-hot encoded by default
pub const CATEGORICAL_COLUMNS: [&str; 3] = ["location", "device", "gender"];

/// Which columns of the encoded table form the covariate matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// Numeric columns, taken in this order
    pub numeric: Vec<String>,
    /// Any column whose name starts with one of these is appended
    pub indicator_prefixes: Vec<String>,
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self::from_columns(&NUMERIC_FEATURES, &CATEGORICAL_COLUMNS)
    }
}

impl FeatureSpec {
    /// Build a spec whose indicator prefixes are `<categorical>_`
    pub fn from_columns<N: AsRef<str>, C: AsRef<str>>(numeric: &[N], categorical: &[C]) -> Self {
        Self {
            numeric: numeric.iter().map(|s| s.as_ref().to_string()).collect(),
            indicator_prefixes: categorical
                .iter()
                .map(|c| format!("{}_", c.as_ref()))
                .collect(),
        }
    }
}

/// Select feature column names: the numeric set, then matching indicators
///
/// Indicator columns are taken in table order. Existence of the numeric
/// columns is not checked here; `build_feature_matrix` reports them.
pub fn select_feature_columns(df: &DataFrame, spec: &FeatureSpec) -> Vec<String> {
    let mut names = spec.numeric.clone();

    for name in df.get_column_names() {
        let name = name.as_str();
        let is_indicator = spec
            .indicator_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()));
        if is_indicator && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    names
}

/// Cast the named columns to f64 and pack them into a row-major matrix
pub fn build_feature_matrix(df: &DataFrame, names: &[String]) -> Result<Matrix> {
    let rows = df.height();
    let cols = names.len();
    let mut data = vec![0.0; rows * cols];

    for (j, name) in names.iter().enumerate() {
        let column = df
            .column(name)
            .with_context(|| format!("Feature column '{}' not found", name))?;

        let dtype = column.dtype();
        if !(dtype.is_primitive_numeric() || *dtype == DataType::Boolean) {
            anyhow::bail!(
                "Feature column '{}' must be numeric, found type {}",
                name,
                dtype
            );
        }

        let nulls = column.null_count();
        if nulls > 0 {
            anyhow::bail!(
                "Feature column '{}' contains {} null value(s); fill or drop them before fitting",
                name,
                nulls
            );
        }

        let float_col = column.cast(&DataType::Float64)?;
        for (i, value) in float_col.f64()?.into_iter().enumerate() {
            data[i * cols + j] = value.unwrap_or(f64::NAN);
        }
    }

    Ok(Matrix::new(data, rows, cols)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spec() {
        let spec = FeatureSpec::default();
        assert_eq!(spec.numeric.len(), 4);
        assert_eq!(spec.indicator_prefixes, vec!["location_", "device_", "gender_"]);
    }

    #[test]
    fn test_selects_numeric_then_indicators_in_table_order() {
        let df = df! {
            "gender_M" => [1u8, 0],
            "age" => [30i64, 40],
            "device_tablet" => [0u8, 1],
            "device_mobile" => [1u8, 0],
            "group" => ["control", "treatment"],
        }
        .unwrap();
        let spec = FeatureSpec::from_columns(&["age"], &["device", "gender"]);

        assert_eq!(
            select_feature_columns(&df, &spec),
            vec!["age", "gender_M", "device_tablet", "device_mobile"]
        );
    }

    #[test]
    fn test_prefix_requires_underscore() {
        let df = df! {
            "devices" => [1i32],
            "device_x" => [1u8],
        }
        .unwrap();
        let spec = FeatureSpec::from_columns::<&str, &str>(&[], &["device"]);
        assert_eq!(select_feature_columns(&df, &spec), vec!["device_x"]);
    }

    #[test]
    fn test_build_matrix_is_row_major() {
        let df = df! {
            "a" => [1i64, 2, 3],
            "b" => [0.5f64, 1.5, 2.5],
            "flag" => [true, false, true],
        }
        .unwrap();
        let names = vec!["a".to_string(), "b".to_string(), "flag".to_string()];
        let x = build_feature_matrix(&df, &names).unwrap();

        assert_eq!(x.rows(), 3);
        assert_eq!(x.cols(), 3);
        assert_eq!(x.row(1), &[2.0, 1.5, 0.0]);
    }

    #[test]
    fn test_missing_feature_column_errors() {
        let df = df! { "a" => [1i64] }.unwrap();
        let result = build_feature_matrix(&df, &["time_spent".to_string()]);
        assert!(result.unwrap_err().to_string().contains("time_spent"));
    }

    #[test]
    fn test_string_feature_column_errors() {
        let df = df! { "a" => ["x"] }.unwrap();
        let result = build_feature_matrix(&df, &["a".to_string()]);
        assert!(result.unwrap_err().to_string().contains("must be numeric"));
    }

    #[test]
    fn test_null_feature_value_errors() {
        let df = df! { "a" => [Some(1.0f64), None] }.unwrap();
        let result = build_feature_matrix(&df, &["a".to_string()]);
        assert!(result.unwrap_err().to_string().contains("null"));
    }
}
