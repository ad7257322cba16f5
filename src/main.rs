//! abuplift: uplift estimation CLI
//!
//! Reads an A/B test table, fits a doubly-robust learner and writes the
//! table back out with a per-row `uplift` column.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use polars::prelude::*;

use abuplift::cli::Cli;
use abuplift::pipeline::{
    assemble_result, count_mapped_records, fit_uplift, load_dataset_with_progress, prepare,
    Session,
};
use abuplift::report::{export_uplift_report, ReportParams, UpliftSummary};
use abuplift::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_count, print_info, print_step_header, print_step_time, print_success,
    ConfigCard,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = cli.pipeline_config()?;
    let input = cli.input.as_path();
    let output_path = cli.output_path();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&ConfigCard {
        input,
        output: &output_path,
        treatment_column: &config.treatment_column,
        treatment_value: &config.mapping.treatment_value,
        control_value: &config.mapping.control_value,
        outcome_column: &config.outcome_column,
        n_estimators: config.estimator.n_estimators,
        cv_folds: config.estimator.cv_folds,
        seed: config.estimator.seed,
    });

    let mut builder = Session::builder().config(config);
    if let Some(threads) = cli.threads {
        builder = builder.num_threads(threads);
    }
    let session = builder.build()?;
    let config = session.config();

    // Step 1: Load dataset
    print_step_header(1, "Load Dataset");

    let step_start = Instant::now();
    let spinner = create_spinner("Reading input file...");
    let (df, rows, cols, memory_mb) =
        session.install(|| load_dataset_with_progress(input, config.infer_schema_length))?;
    finish_with_success(&spinner, "Dataset loaded");

    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);

    let column_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    for required in [&config.treatment_column, &config.outcome_column] {
        if !column_names.contains(required) {
            anyhow::bail!(
                "Column '{}' not found in dataset. Available columns: {:?}",
                required,
                column_names
            );
        }
    }

    let load_elapsed = step_start.elapsed();
    print_step_time(load_elapsed);

    // Step 2: Encode covariates
    print_step_header(2, "Encode Covariates");

    let step_start = Instant::now();
    let (treated, control, unmapped) =
        count_mapped_records(&df, &config.treatment_column, &config.mapping)?;
    print_info(&format!(
        "Groups: {} treated, {} control{}",
        style(treated).yellow().bold(),
        style(control).yellow().bold(),
        if unmapped > 0 {
            format!(", {} unmapped", style(unmapped).red().bold())
        } else {
            String::new()
        }
    ));

    let spinner = create_spinner("One-hot encoding categorical columns...");
    let prepared = session.install(|| prepare(&df, config))?;
    finish_with_success(&spinner, "Feature matrix assembled");

    print_count(
        "indicator column(s)",
        prepared.encoder.indicator_columns().len(),
        Some(&format!(
            "(from {} categorical column(s))",
            prepared.encoder.categories().len()
        )),
    );
    print_count("feature(s) in total", prepared.feature_names.len(), None);

    let prepare_elapsed = step_start.elapsed();
    print_step_time(prepare_elapsed);

    // Step 3: Fit the doubly-robust learner
    print_step_header(3, "Fit Doubly-Robust Learner");

    let step_start = Instant::now();
    let spinner = create_spinner(&format!(
        "Cross-fitting nuisance models ({} folds, {} trees)...",
        config.estimator.cv_folds, config.estimator.n_estimators
    ));
    let fit = session.install(|| fit_uplift(&prepared, &config.estimator))?;
    if fit.diagnostics.clipped_propensities > 0 {
        finish_with_warning(
            &spinner,
            &format!(
                "Model fitted; {} propensities clipped to [{}, {}]",
                fit.diagnostics.clipped_propensities,
                config.estimator.min_propensity,
                1.0 - config.estimator.min_propensity
            ),
        );
    } else {
        finish_with_success(&spinner, "Model fitted");
    }
    print_info(&format!(
        "Average treatment effect: {}",
        style(format!("{:+.4}", fit.ate)).green().bold()
    ));

    let mut result = assemble_result(prepared, fit, &config.uplift_column)?;
    print_success(&format!("Appended column '{}'", config.uplift_column));

    let fit_elapsed = step_start.elapsed();
    print_step_time(fit_elapsed);

    // Step 4: Save output
    print_step_header(4, "Save Results");

    let step_start = Instant::now();
    let spinner = create_spinner("Writing output file...");
    save_dataset(&mut result.frame, &output_path)?;
    finish_with_success(&spinner, &format!("Saved to {}", output_path.display()));

    let mut summary = UpliftSummary::from_result(&result, &config.uplift_column)?;

    if let Some(report_path) = &cli.report {
        let params = ReportParams {
            input_file: input,
            output_file: &output_path,
            config,
            features: &result.feature_names,
            categories: result.encoder.categories(),
            segments: &result.segments,
        };
        export_uplift_report(report_path, &summary, &params)?;
        print_success(&format!("Report written to {}", report_path.display()));
    }

    let save_elapsed = step_start.elapsed();
    print_step_time(save_elapsed);

    summary.set_load_time(load_elapsed);
    summary.set_prepare_time(prepare_elapsed);
    summary.set_fit_time(fit_elapsed);
    summary.set_save_time(save_elapsed);
    summary.display();

    print_completion();

    Ok(())
}

/// Save dataset to file (CSV or Parquet based on extension)
fn save_dataset(df: &mut DataFrame, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .finish(df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
        _ => anyhow::bail!(
            "Unsupported output format: {}. Supported formats: csv, parquet",
            extension
        ),
    }

    Ok(())
}
