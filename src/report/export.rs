//! JSON export of an uplift run

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use super::summary::UpliftSummary;
use crate::pipeline::{CategoryLevels, PipelineConfig, SegmentUplift};

/// Metadata about the run
#[derive(Serialize)]
pub struct ReportMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    pub abuplift_version: String,
    pub input_file: String,
    pub output_file: String,
    /// Full configuration the run used
    pub config: PipelineConfig,
}

/// Complete uplift report
#[derive(Serialize)]
pub struct UpliftReport<'a> {
    pub metadata: ReportMetadata,
    pub summary: &'a UpliftSummary,
    /// Covariates in matrix column order
    pub features: &'a [String],
    /// Levels learned for each categorical column
    pub categories: &'a [CategoryLevels],
    /// Mean uplift per level of each categorical column
    pub segments: &'a [SegmentUplift],
}

/// Inputs of the report beyond the summary
pub struct ReportParams<'a> {
    pub input_file: &'a Path,
    pub output_file: &'a Path,
    pub config: &'a PipelineConfig,
    pub features: &'a [String],
    pub categories: &'a [CategoryLevels],
    pub segments: &'a [SegmentUplift],
}

/// Write the report to `output_path` as pretty-printed JSON
pub fn export_uplift_report(
    output_path: &Path,
    summary: &UpliftSummary,
    params: &ReportParams,
) -> Result<()> {
    let report = UpliftReport {
        metadata: ReportMetadata {
            timestamp: Utc::now().to_rfc3339(),
            abuplift_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: params.input_file.display().to_string(),
            output_file: params.output_file.display().to_string(),
            config: params.config.clone(),
        },
        summary,
        features: params.features,
        categories: params.categories,
        segments: params.segments,
    };

    let json = serde_json::to_string_pretty(&report)
        .context("Failed to serialize uplift report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write report file: {}", output_path.display()))?;

    Ok(())
}
