//! Command-line argument definitions using clap

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;

use crate::pipeline::PipelineConfig;

/// abuplift - Estimate per-user uplift from A/B test data with a doubly-robust learner
#[derive(Parser, Debug)]
#[command(name = "abuplift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file path (CSV or Parquet, determined by extension).
    /// Defaults to input directory with '_uplift' suffix (e.g., data.csv -> data_uplift.csv).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON configuration file. Flags given on the command line override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Column holding the experiment group label
    #[arg(long)]
    pub treatment_column: Option<String>,

    /// Binary outcome column
    #[arg(long)]
    pub outcome_column: Option<String>,

    /// Group value that marks the treated arm (maps to 1)
    #[arg(long)]
    pub treatment_value: Option<String>,

    /// Group value that marks the control arm (maps to 0)
    #[arg(long)]
    pub control_value: Option<String>,

    /// Categorical columns to one-hot encode (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub categorical: Option<Vec<String>>,

    /// Numeric feature columns (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub features: Option<Vec<String>>,

    /// Number of trees in the outcome forest
    #[arg(long, value_parser = validate_positive)]
    pub n_estimators: Option<usize>,

    /// Maximum depth of each tree (unlimited when omitted)
    #[arg(long, value_parser = validate_positive)]
    pub max_depth: Option<usize>,

    /// Minimum number of samples in a leaf
    #[arg(long, value_parser = validate_positive)]
    pub min_samples_leaf: Option<usize>,

    /// Number of cross-fitting folds (at least 2)
    #[arg(long, value_parser = validate_folds)]
    pub cv: Option<usize>,

    /// Propensity clipping bound, in [0, 0.5)
    #[arg(long, value_parser = validate_min_propensity)]
    pub min_propensity: Option<f64>,

    /// Random seed for fold assignment and the forest
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads (defaults to one per logical CPU)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long)]
    pub infer_schema_length: Option<usize>,

    /// Write a JSON report (summary, per-segment uplift, config) to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl Cli {
    /// Get the output path, deriving from input if not explicitly provided.
    /// The derived path will be in the same directory as the input with a '_uplift' suffix.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| derive_output_path(&self.input))
    }

    /// Build the pipeline configuration: defaults, then the config file, then flags
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(column) = &self.treatment_column {
            config.treatment_column = column.clone();
        }
        if let Some(column) = &self.outcome_column {
            config.outcome_column = column.clone();
        }
        if let Some(value) = &self.treatment_value {
            config.mapping.treatment_value = value.clone();
        }
        if let Some(value) = &self.control_value {
            config.mapping.control_value = value.clone();
        }
        if let Some(columns) = &self.categorical {
            config.categorical_columns = non_empty(columns);
        }
        if let Some(columns) = &self.features {
            config.numeric_features = non_empty(columns);
        }
        if let Some(length) = self.infer_schema_length {
            config.infer_schema_length = length;
        }

        let estimator = &mut config.estimator;
        if let Some(n) = self.n_estimators {
            estimator.n_estimators = n;
        }
        if self.max_depth.is_some() {
            estimator.max_depth = self.max_depth;
        }
        if let Some(n) = self.min_samples_leaf {
            estimator.min_samples_leaf = n;
        }
        if let Some(folds) = self.cv {
            estimator.cv_folds = folds;
        }
        if let Some(bound) = self.min_propensity {
            estimator.min_propensity = bound;
        }
        if let Some(seed) = self.seed {
            estimator.seed = seed;
        }

        if config.mapping.treatment_value == config.mapping.control_value {
            anyhow::bail!(
                "Treatment and control values must differ (both are '{}')",
                config.mapping.treatment_value
            );
        }
        config.estimator.validate()?;

        Ok(config)
    }
}

/// `<dir>/<stem>_uplift.<ext>`, defaulting the extension to csv
pub fn derive_output_path(input: &Path) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("csv");
    parent.join(format!("{}_uplift.{}", stem, extension))
}

fn non_empty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Validator for counts that must be at least 1
fn validate_positive(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid non-negative integer", s))?;

    if value == 0 {
        Err("value must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

/// Validator for the cv parameter
fn validate_folds(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid non-negative integer", s))?;

    if value < 2 {
        Err(format!("cv must be at least 2, got {}", value))
    } else {
        Ok(value)
    }
}

/// Validator for the min_propensity parameter
fn validate_min_propensity(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0..0.5).contains(&value) {
        Err(format!(
            "min_propensity must be in [0.0, 0.5), got {}",
            value
        ))
    } else {
        Ok(value)
    }
}
