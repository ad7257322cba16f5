//! Treatment and outcome extraction
//!
//! Maps the experiment's group label column to a 0/1 treatment vector and
//! pulls the outcome column out as floats.

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::values::column_to_strings;

/// Tolerance for floating point comparison when checking binary 0/1 values
const TOLERANCE: f64 = 1e-9;

/// Mapping from group labels to the binary treatment indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentMapping {
    /// Value that maps to 1 (treated)
    pub treatment_value: String,
    /// Value that maps to 0 (control)
    pub control_value: String,
}

impl Default for TreatmentMapping {
    fn default() -> Self {
        Self::new("treatment".to_string(), "control".to_string())
    }
}

impl TreatmentMapping {
    pub fn new(treatment_value: String, control_value: String) -> Self {
        Self {
            treatment_value,
            control_value,
        }
    }
}

/// Create a binary treatment mask based on the mapping
///
/// Returns a Vec<Option<i32>> where:
/// - Some(1) for treatment rows
/// - Some(0) for control rows
/// - None for values that match neither (including nulls)
pub fn create_treatment_mask(
    df: &DataFrame,
    group_column: &str,
    mapping: &TreatmentMapping,
) -> Result<Vec<Option<i32>>> {
    let group_col = df
        .column(group_column)
        .with_context(|| format!("Group column '{}' not found", group_column))?;

    let mask = column_to_strings(group_col)?
        .iter()
        .map(|v| match v {
            Some(s) if s == &mapping.treatment_value => Some(1),
            Some(s) if s == &mapping.control_value => Some(0),
            _ => None,
        })
        .collect();

    Ok(mask)
}

/// Count treatment, control and unmapped rows
pub fn count_mapped_records(
    df: &DataFrame,
    group_column: &str,
    mapping: &TreatmentMapping,
) -> Result<(usize, usize, usize)> {
    let mask = create_treatment_mask(df, group_column, mapping)?;

    let treated = mask.iter().filter(|v| **v == Some(1)).count();
    let control = mask.iter().filter(|v| **v == Some(0)).count();
    let unmapped = mask.iter().filter(|v| v.is_none()).count();

    Ok((treated, control, unmapped))
}

/// Extract the treatment vector as 0.0 / 1.0
///
/// Every row must map; an unmapped group value is an error.
pub fn extract_treatment(
    df: &DataFrame,
    group_column: &str,
    mapping: &TreatmentMapping,
) -> Result<Vec<f64>> {
    let mask = create_treatment_mask(df, group_column, mapping)?;

    let unmapped = mask.iter().filter(|v| v.is_none()).count();
    if unmapped > 0 {
        anyhow::bail!(
            "Group column '{}' has {} row(s) that are neither '{}' nor '{}'",
            group_column,
            unmapped,
            mapping.treatment_value,
            mapping.control_value
        );
    }

    Ok(mask.into_iter().flatten().map(f64::from).collect())
}

/// Result of analyzing an outcome column
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeAnalysis {
    /// Outcome contains only 0 and 1 values
    Binary,
    /// Outcome is numeric but not 0/1 - contains this many distinct values
    NonBinary { distinct_values: usize },
}

/// Validate the outcome column and report whether it is binary
pub fn analyze_outcome_column(df: &DataFrame, outcome: &str) -> Result<OutcomeAnalysis> {
    let outcome_col = df
        .column(outcome)
        .with_context(|| format!("Outcome column '{}' not found", outcome))?;

    if outcome_col.len() == 0 {
        anyhow::bail!("Outcome column '{}' is empty", outcome);
    }

    if outcome_col.null_count() == outcome_col.len() {
        anyhow::bail!("Outcome column '{}' contains only null values", outcome);
    }

    if outcome_col.null_count() > 0 {
        anyhow::bail!(
            "Outcome column '{}' contains {} null value(s)",
            outcome,
            outcome_col.null_count()
        );
    }

    let dtype = outcome_col.dtype();
    if !(dtype.is_primitive_numeric() || *dtype == DataType::Boolean) {
        anyhow::bail!(
            "Outcome column '{}' must be numeric, found type {}",
            outcome,
            dtype
        );
    }

    let float_col = outcome_col.cast(&DataType::Float64)?;
    let unique = float_col.unique()?;
    let unique_values: Vec<f64> = unique.f64()?.into_iter().flatten().collect();

    let is_binary = unique_values
        .iter()
        .all(|&v| v.abs() < TOLERANCE || (v - 1.0).abs() < TOLERANCE);

    if is_binary {
        Ok(OutcomeAnalysis::Binary)
    } else {
        Ok(OutcomeAnalysis::NonBinary {
            distinct_values: unique_values.len(),
        })
    }
}

/// Extract the outcome vector as floats
pub fn extract_outcome(df: &DataFrame, outcome: &str) -> Result<Vec<f64>> {
    if let OutcomeAnalysis::NonBinary { distinct_values } = analyze_outcome_column(df, outcome)? {
        eprintln!(
            "Warning: Outcome column '{}' is not binary 0/1 ({} distinct values); uplift is on the outcome scale",
            outcome, distinct_values
        );
    }

    let float_col = df.column(outcome)?.cast(&DataType::Float64)?;
    let values = float_col
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();

    Ok(values)
}
