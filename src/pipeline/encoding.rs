//! One-hot encoding of nominal covariates
//!
//! Every categorical column is replaced by 0/1 indicator columns named
//! `<column>_<level>`. Levels are sorted and the first one is dropped as the
//! reference level so the indicators are not collinear with an intercept.

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::values::{column_to_strings, sorted_levels};

/// Learned levels for one categorical column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLevels {
    pub column: String,
    /// All levels seen at fit time, sorted; the first is the reference level
    pub levels: Vec<String>,
}

impl CategoryLevels {
    /// The dropped reference level, if the column had any values
    pub fn reference_level(&self) -> Option<&str> {
        self.levels.first().map(|s| s.as_str())
    }

    /// Levels that receive an indicator column
    pub fn encoded_levels(&self) -> &[String] {
        self.levels.get(1..).unwrap_or(&[])
    }

    pub fn indicator_name(&self, level: &str) -> String {
        format!("{}_{}", self.column, level)
    }
}

/// Fitted one-hot encoder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    categories: Vec<CategoryLevels>,
}

impl CategoricalEncoder {
    /// Learn the level sets of `columns` from `df`
    pub fn fit<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> Result<Self> {
        let categories = columns
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let col = df
                    .column(name)
                    .with_context(|| format!("Categorical column '{}' not found", name))?;
                Ok(CategoryLevels {
                    column: name.to_string(),
                    levels: sorted_levels(col)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { categories })
    }

    pub fn categories(&self) -> &[CategoryLevels] {
        &self.categories
    }

    /// Names of all indicator columns this encoder produces, in output order
    pub fn indicator_columns(&self) -> Vec<String> {
        self.categories
            .iter()
            .flat_map(|cat| {
                cat.encoded_levels()
                    .iter()
                    .map(move |level| cat.indicator_name(level))
            })
            .collect()
    }

    /// Replace the categorical columns of `df` with indicator columns
    ///
    /// Non-categorical columns keep their order; indicator blocks are
    /// appended in fit order. Nulls and levels not seen at fit time encode
    /// as all zeros.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut out = df.drop_many(self.categories.iter().map(|c| c.column.as_str()));

        for cat in &self.categories {
            let col = df
                .column(&cat.column)
                .with_context(|| format!("Categorical column '{}' not found", cat.column))?;
            let values = column_to_strings(col)?;

            let known: HashSet<&str> = cat.levels.iter().map(|s| s.as_str()).collect();
            let unseen = values
                .iter()
                .filter(|v| matches!(v, Some(s) if !known.contains(s.as_str())))
                .count();
            if unseen > 0 {
                eprintln!(
                    "Warning: Column '{}' contains {} value(s) not seen during fitting; they encode as all zeros",
                    cat.column, unseen
                );
            }

            for level in cat.encoded_levels() {
                let name = cat.indicator_name(level);
                if out.get_column_index(&name).is_some() {
                    anyhow::bail!(
                        "Indicator column '{}' collides with an existing column",
                        name
                    );
                }
                let indicator: Vec<u8> = values
                    .iter()
                    .map(|v| u8::from(v.as_deref() == Some(level.as_str())))
                    .collect();
                out.with_column(Column::new(name.into(), indicator))?;
            }
        }

        Ok(out)
    }
}

/// Fit an encoder on `df` and apply it in one step
pub fn one_hot_encode<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> Result<DataFrame> {
    CategoricalEncoder::fit(df, columns)?.transform(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_df() -> DataFrame {
        df! {
            "age" => [25i64, 40, 31, 52],
            "device" => ["mobile", "desktop", "tablet", "mobile"],
            "gender" => ["F", "M", "F", "F"],
        }
        .unwrap()
    }

    #[test]
    fn test_drops_first_sorted_level() {
        let encoder = CategoricalEncoder::fit(&sample_df(), &["device", "gender"]).unwrap();

        let device = &encoder.categories()[0];
        assert_eq!(device.reference_level(), Some("desktop"));
        assert_eq!(device.encoded_levels(), &["mobile", "tablet"]);
        assert_eq!(
            encoder.indicator_columns(),
            vec!["device_mobile", "device_tablet", "gender_M"]
        );
    }

    #[test]
    fn test_transform_layout_and_values() {
        let encoded = one_hot_encode(&sample_df(), &["device", "gender"]).unwrap();

        let names: Vec<String> = encoded
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["age", "device_mobile", "device_tablet", "gender_M"]);

        let mobile: Vec<Option<u8>> = encoded
            .column("device_mobile")
            .unwrap()
            .u8()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(mobile, vec![Some(1), Some(0), Some(0), Some(1)]);
    }

    #[test]
    fn test_single_level_column_produces_no_indicators() {
        let df = df! {
            "x" => [1.0f64, 2.0],
            "location" => ["north", "north"],
        }
        .unwrap();
        let encoded = one_hot_encode(&df, &["location"]).unwrap();
        assert_eq!(encoded.width(), 1);
    }

    #[test]
    fn test_unseen_level_encodes_as_zeros() {
        let encoder = CategoricalEncoder::fit(&sample_df(), &["device"]).unwrap();
        let new_rows = df! {
            "age" => [30i64, 33],
            "device" => ["watch", "tablet"],
            "gender" => ["F", "M"],
        }
        .unwrap();

        let encoded = encoder.transform(&new_rows).unwrap();
        let mobile: Vec<Option<u8>> = encoded
            .column("device_mobile")
            .unwrap()
            .u8()
            .unwrap()
            .into_iter()
            .collect();
        let tablet: Vec<Option<u8>> = encoded
            .column("device_tablet")
            .unwrap()
            .u8()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(mobile, vec![Some(0), Some(0)]);
        assert_eq!(tablet, vec![Some(0), Some(1)]);
    }

    #[test]
    fn test_null_encodes_as_zeros() {
        let df = df! {
            "device" => [Some("mobile"), None, Some("desktop")],
        }
        .unwrap();
        let encoded = one_hot_encode(&df, &["device"]).unwrap();
        let mobile: Vec<Option<u8>> = encoded
            .column("device_mobile")
            .unwrap()
            .u8()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(mobile, vec![Some(1), Some(0), Some(0)]);
    }

    #[test]
    fn test_missing_categorical_column_errors() {
        let result = CategoricalEncoder::fit(&sample_df(), &["location"]);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("location"));
    }

    #[test]
    fn test_indicator_name_collision_errors() {
        let df = df! {
            "device" => ["mobile", "desktop"],
            "device_mobile" => [1i32, 0],
        }
        .unwrap();
        let result = one_hot_encode(&df, &["device"]);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("collides"));
    }
}
