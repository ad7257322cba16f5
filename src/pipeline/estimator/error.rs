//! Error types for model fitting and prediction.

use thiserror::Error;

/// Errors raised by the outcome, propensity, final and DR models.
#[derive(Debug, Error, PartialEq)]
pub enum EstimatorError {
    /// No rows were supplied to `fit`.
    #[error("cannot fit a model on an empty dataset")]
    EmptyInput,

    /// Row or column counts of two inputs disagree.
    #[error("dimension mismatch in {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// Only one arm of the experiment is present in the treatment vector.
    #[error(
        "treatment vector is degenerate: only the {present} group is present, \
         both control and treatment rows are required"
    )]
    DegenerateTreatment { present: &'static str },

    /// A classifier was asked to fit labels from a single class.
    #[error("{model} needs samples of at least 2 classes, but the data contains only class {class}")]
    SingleClass { model: &'static str, class: f64 },

    /// Labels are expected to be exactly 0 or 1.
    #[error("labels must be 0 or 1, found {value}")]
    NonBinaryLabels { value: f64 },

    /// An arm has fewer rows than there are cross-fitting folds.
    #[error("{arm} group has {count} row(s), fewer than the {folds} cross-fitting folds")]
    InsufficientSamples {
        arm: &'static str,
        count: usize,
        folds: usize,
    },

    /// A normal-equation or Newton system could not be factorized.
    #[error("linear system is singular in {0}")]
    SingularMatrix(&'static str),

    /// NaN or infinite values in inputs or fitted quantities.
    #[error("non-finite values encountered in {0}")]
    NonFinite(&'static str),

    /// `predict` was called before `fit`.
    #[error("{0} has not been fitted")]
    NotFitted(&'static str),

    /// A hyperparameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
