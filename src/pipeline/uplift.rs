//! Uplift pipeline: encode covariates, fit the DR learner, append the estimate
//!
//! The stages are exposed individually (`prepare`, `fit_uplift`,
//! `assemble_result`) so callers can time or report them; `process_frame`
//! and `process` run them back to back.

use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::encoding::CategoricalEncoder;
use super::estimator::{DefaultDrLearner, EstimatorConfig, FitDiagnostics, Matrix};
use super::features::{
    build_feature_matrix, select_feature_columns, FeatureSpec, CATEGORICAL_COLUMNS,
    NUMERIC_FEATURES,
};
use super::loader::DEFAULT_INFER_SCHEMA_LENGTH;
use super::segments::{segment_uplift, SegmentUplift};
use super::session::Session;
use super::treatment::{extract_outcome, extract_treatment, TreatmentMapping};
use super::values::column_to_strings;

/// Name of the appended estimate column
pub const DEFAULT_UPLIFT_COLUMN: &str = "uplift";

/// Column names and model settings for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Column holding the experiment arm label
    pub treatment_column: String,
    /// Binary outcome column
    pub outcome_column: String,
    /// Labels mapped to treatment (1) and control (0)
    pub mapping: TreatmentMapping,
    /// Nominal columns to one-hot encode
    pub categorical_columns: Vec<String>,
    /// Numeric covariates
    pub numeric_features: Vec<String>,
    /// Name of the appended uplift column
    pub uplift_column: String,
    /// Rows used for CSV schema inference (0 = full scan)
    pub infer_schema_length: usize,
    pub estimator: EstimatorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            treatment_column: "group".to_string(),
            outcome_column: "converted".to_string(),
            mapping: TreatmentMapping::default(),
            categorical_columns: CATEGORICAL_COLUMNS.iter().map(|s| s.to_string()).collect(),
            numeric_features: NUMERIC_FEATURES.iter().map(|s| s.to_string()).collect(),
            uplift_column: DEFAULT_UPLIFT_COLUMN.to_string(),
            infer_schema_length: DEFAULT_INFER_SCHEMA_LENGTH,
            estimator: EstimatorConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn feature_spec(&self) -> FeatureSpec {
        FeatureSpec::from_columns(&self.numeric_features, &self.categorical_columns)
    }
}

/// Encoded table and model inputs
#[derive(Debug)]
pub struct PreparedData {
    /// Input table with categorical columns replaced by indicators
    pub frame: DataFrame,
    pub encoder: CategoricalEncoder,
    pub feature_names: Vec<String>,
    pub features: Matrix,
    pub treatment: Vec<f64>,
    pub outcome: Vec<f64>,
    /// Raw categorical values, kept for the segment breakdown
    pub segment_values: Vec<(String, Vec<Option<String>>)>,
}

/// Output of the estimation stage
#[derive(Debug, Clone)]
pub struct UpliftFit {
    pub effects: Vec<f64>,
    pub ate: f64,
    pub diagnostics: FitDiagnostics,
}

/// Scored table plus everything learned along the way
pub struct UpliftResult {
    /// Encoded input table with the uplift column appended
    pub frame: DataFrame,
    pub feature_names: Vec<String>,
    pub encoder: CategoricalEncoder,
    pub diagnostics: FitDiagnostics,
    /// Average treatment effect over all rows
    pub ate: f64,
    pub segments: Vec<SegmentUplift>,
}

/// Encode covariates and extract the feature matrix, treatment and outcome
pub fn prepare(df: &DataFrame, config: &PipelineConfig) -> Result<PreparedData> {
    let segment_values = config
        .categorical_columns
        .iter()
        .map(|name| {
            let col = df
                .column(name)
                .with_context(|| format!("Categorical column '{}' not found", name))?;
            Ok((name.clone(), column_to_strings(col)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let encoder = CategoricalEncoder::fit(df, &config.categorical_columns)?;
    let frame = encoder.transform(df)?;

    let feature_names = select_feature_columns(&frame, &config.feature_spec());
    let features = build_feature_matrix(&frame, &feature_names)?;

    let treatment = extract_treatment(df, &config.treatment_column, &config.mapping)?;
    let outcome = extract_outcome(df, &config.outcome_column)?;

    Ok(PreparedData {
        frame,
        encoder,
        feature_names,
        features,
        treatment,
        outcome,
        segment_values,
    })
}

/// Fit the DR learner on prepared data and score every row
pub fn fit_uplift(prepared: &PreparedData, config: &EstimatorConfig) -> Result<UpliftFit> {
    let mut learner = DefaultDrLearner::from_config(config)?;

    let diagnostics = learner
        .fit(&prepared.outcome, &prepared.treatment, &prepared.features)
        .context("Failed to fit the doubly-robust learner")?
        .clone();

    let effects = learner
        .effect(&prepared.features)
        .context("Failed to compute treatment effects")?;
    let ate = effects.iter().sum::<f64>() / effects.len() as f64;

    Ok(UpliftFit {
        effects,
        ate,
        diagnostics,
    })
}

/// Append the per-row effects to the encoded table
///
/// An existing column with the same name is replaced.
pub fn assemble_result(
    prepared: PreparedData,
    fit: UpliftFit,
    uplift_column: &str,
) -> Result<UpliftResult> {
    let segments = prepared
        .segment_values
        .iter()
        .flat_map(|(column, values)| segment_uplift(column, values, &fit.effects))
        .collect();

    let mut frame = prepared.frame;
    frame
        .with_column(Column::new(uplift_column.into(), fit.effects))
        .with_context(|| format!("Failed to append column '{}'", uplift_column))?;

    Ok(UpliftResult {
        frame,
        feature_names: prepared.feature_names,
        encoder: prepared.encoder,
        diagnostics: fit.diagnostics,
        ate: fit.ate,
        segments,
    })
}

/// Run the whole pipeline on an in-memory table
pub fn process_frame(df: &DataFrame, config: &PipelineConfig) -> Result<UpliftResult> {
    let prepared = prepare(df, config)?;
    let fit = fit_uplift(&prepared, &config.estimator)?;
    assemble_result(prepared, fit, &config.uplift_column)
}

/// Load a CSV file and return it encoded, with the `uplift` column appended
///
/// Runs on the shared default session from [`Session::get_or_create`], so
/// repeated calls reuse one thread pool. Build a [`Session`] to control
/// threads or config.
pub fn process(path: &Path) -> Result<DataFrame> {
    Session::get_or_create()?.process(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_columns() {
        let config = PipelineConfig::default();
        assert_eq!(config.treatment_column, "group");
        assert_eq!(config.outcome_column, "converted");
        assert_eq!(config.uplift_column, "uplift");
        assert_eq!(config.categorical_columns, vec!["location", "device", "gender"]);
        assert_eq!(config.feature_spec(), FeatureSpec::default());
    }

    #[test]
    fn test_partial_json_config_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"outcome_column": "purchased", "estimator": {"seed": 9}}"#)
                .unwrap();
        assert_eq!(config.outcome_column, "purchased");
        assert_eq!(config.treatment_column, "group");
        assert_eq!(config.estimator.seed, 9);
        assert_eq!(config.estimator.n_estimators, 100);
    }

    #[test]
    fn test_prepare_reports_missing_categorical() {
        let df = df! {
            "time_spent" => [1.0f64],
            "group" => ["control"],
            "converted" => [0i32],
        }
        .unwrap();
        let result = prepare(&df, &PipelineConfig::default());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("location"));
    }
}
