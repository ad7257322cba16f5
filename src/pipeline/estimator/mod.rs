//! Treatment-effect estimation
//!
//! This module holds the models behind the uplift estimate: a random forest
//! outcome model, a logistic propensity model, an OLS final model, and the
//! doubly-robust learner that combines them via cross-fitting.

mod dr;
mod error;
mod forest;
mod linear;
mod logistic;

use serde::{Deserialize, Serialize};

pub use dr::{DefaultDrLearner, DrLearner, FitDiagnostics};
pub use error::EstimatorError;
pub use forest::{ForestParams, RandomForestRegressor};
pub use linear::LinearRegression;
pub use logistic::LogisticRegression;

/// Dense row-major feature matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Create a matrix from row-major data
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self, EstimatorError> {
        if data.len() != rows * cols {
            return Err(EstimatorError::DimensionMismatch {
                what: "matrix data",
                expected: rows * cols,
                found: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// Create a matrix from a slice of equally sized rows
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, EstimatorError> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(EstimatorError::DimensionMismatch {
                    what: "matrix row",
                    expected: cols,
                    found: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            data,
            rows: rows.len(),
            cols,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Copy the given rows (in the given order) into a new matrix
    pub fn select_rows(&self, indices: &[usize]) -> Matrix {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Matrix {
            data,
            rows: indices.len(),
            cols: self.cols,
        }
    }

    /// Append one column holding `values`
    pub fn with_appended_column(&self, values: &[f64]) -> Result<Matrix, EstimatorError> {
        if values.len() != self.rows {
            return Err(EstimatorError::DimensionMismatch {
                what: "appended column",
                expected: self.rows,
                found: values.len(),
            });
        }
        let mut data = Vec::with_capacity(self.rows * (self.cols + 1));
        for (i, &v) in values.iter().enumerate() {
            data.extend_from_slice(self.row(i));
            data.push(v);
        }
        Ok(Matrix {
            data,
            rows: self.rows,
            cols: self.cols + 1,
        })
    }

    /// Append one column where every row holds `value`
    pub fn with_constant_column(&self, value: f64) -> Matrix {
        let mut data = Vec::with_capacity(self.rows * (self.cols + 1));
        for i in 0..self.rows {
            data.extend_from_slice(self.row(i));
            data.push(value);
        }
        Matrix {
            data,
            rows: self.rows,
            cols: self.cols + 1,
        }
    }
}

/// A model mapping features to a real-valued prediction
pub trait Regressor: Send + Sync {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), EstimatorError>;
    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, EstimatorError>;
}

/// A binary classifier producing P(label = 1 | x)
pub trait Classifier: Send + Sync {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), EstimatorError>;
    fn predict_proba(&self, x: &Matrix) -> Result<Vec<f64>, EstimatorError>;
}

/// Shared input checks for `fit` implementations
pub(crate) fn validate_fit_input(
    x: &Matrix,
    y: &[f64],
    model: &'static str,
) -> Result<(), EstimatorError> {
    if x.rows() == 0 {
        return Err(EstimatorError::EmptyInput);
    }
    if y.len() != x.rows() {
        return Err(EstimatorError::DimensionMismatch {
            what: "target length",
            expected: x.rows(),
            found: y.len(),
        });
    }
    if !x.is_finite() || y.iter().any(|v| !v.is_finite()) {
        return Err(EstimatorError::NonFinite(model));
    }
    Ok(())
}

/// Shared input checks for `predict` implementations
pub(crate) fn validate_predict_input(
    x: &Matrix,
    expected_cols: usize,
    model: &'static str,
) -> Result<(), EstimatorError> {
    if x.cols() != expected_cols {
        return Err(EstimatorError::DimensionMismatch {
            what: "feature count",
            expected: expected_cols,
            found: x.cols(),
        });
    }
    if !x.is_finite() {
        return Err(EstimatorError::NonFinite(model));
    }
    Ok(())
}

/// Configuration for the doubly-robust learner and its nuisance models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Number of trees in the outcome forest
    pub n_estimators: usize,
    /// Maximum tree depth (None = grow until leaves are pure)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples in each leaf
    pub min_samples_leaf: usize,
    /// Features considered per split (None = all)
    pub max_features: Option<usize>,
    /// Inverse L2 regularization strength of the propensity model
    pub logistic_c: f64,
    /// Newton iteration cap for the propensity model
    pub logistic_max_iter: usize,
    /// Number of cross-fitting folds
    pub cv_folds: usize,
    /// Propensities are clipped to [min_propensity, 1 - min_propensity]
    pub min_propensity: f64,
    /// Seed for bootstrap sampling and fold assignment
    pub seed: u64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            logistic_c: 1.0,
            logistic_max_iter: 100,
            cv_folds: 2,
            min_propensity: 1e-6,
            seed: 0,
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<(), EstimatorError> {
        if self.n_estimators == 0 {
            return Err(EstimatorError::InvalidConfig(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(EstimatorError::InvalidConfig(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf == 0 {
            return Err(EstimatorError::InvalidConfig(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.max_features == Some(0) {
            return Err(EstimatorError::InvalidConfig(
                "max_features must be at least 1".to_string(),
            ));
        }
        if !(self.logistic_c > 0.0 && self.logistic_c.is_finite()) {
            return Err(EstimatorError::InvalidConfig(format!(
                "logistic_c must be positive, got {}",
                self.logistic_c
            )));
        }
        if self.cv_folds < 2 {
            return Err(EstimatorError::InvalidConfig(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if !(0.0..0.5).contains(&self.min_propensity) {
            return Err(EstimatorError::InvalidConfig(format!(
                "min_propensity must be in [0, 0.5), got {}",
                self.min_propensity
            )));
        }
        Ok(())
    }

    /// Random forest hyperparameters derived from this config
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
            bootstrap: true,
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_shape_checks() {
        assert!(Matrix::new(vec![1.0, 2.0, 3.0], 2, 2).is_err());
        let m = Matrix::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.get(0, 1), 2.0);
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let result = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(
            result,
            Err(EstimatorError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_select_and_append() {
        let m = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let sub = m.select_rows(&[2, 0]);
        assert_eq!(sub.rows(), 2);
        assert_eq!(sub.row(0), &[3.0]);

        let with_t = sub.with_appended_column(&[1.0, 0.0]).unwrap();
        assert_eq!(with_t.row(0), &[3.0, 1.0]);
        assert_eq!(with_t.row(1), &[1.0, 0.0]);

        let with_c = m.with_constant_column(7.0);
        assert_eq!(with_c.cols(), 2);
        assert!((0..3).all(|i| with_c.get(i, 1) == 7.0));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = EstimatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.n_estimators, 100);
        assert_eq!(config.cv_folds, 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EstimatorConfig {
            cv_folds: 1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EstimatorError::InvalidConfig(_))
        ));

        let config = EstimatorConfig {
            min_propensity: 0.7,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
