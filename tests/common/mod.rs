//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tempfile::TempDir;

pub const LOCATIONS: [&str; 4] = ["Brazil", "Germany", "India", "USA"];
pub const DEVICES: [&str; 3] = ["desktop", "mobile", "tablet"];
pub const GENDERS: [&str; 2] = ["F", "M"];

/// Create a synthetic A/B test table with the effect concentrated on mobile
///
/// - `group` alternates control / treatment, so the split is even
/// - `device` cycles desktop / mobile / tablet, so every device sees both arms
/// - on mobile, `converted` equals the treatment indicator (effect 1)
/// - elsewhere, `converted` depends on `pages_viewed` only (effect 0)
pub fn create_ab_test_dataframe(rows: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut time_spent = Vec::with_capacity(rows);
    let mut age = Vec::with_capacity(rows);
    let mut location = Vec::with_capacity(rows);
    let mut device = Vec::with_capacity(rows);
    let mut gender = Vec::with_capacity(rows);
    let mut days_since_last_visit = Vec::with_capacity(rows);
    let mut pages_viewed = Vec::with_capacity(rows);
    let mut group = Vec::with_capacity(rows);
    let mut converted = Vec::with_capacity(rows);

    for i in 0..rows {
        let treated = i % 2 == 1;
        let dev = DEVICES[i % DEVICES.len()];
        let pages: i64 = rng.gen_range(1..=15);

        time_spent.push(rng.gen_range(0.5..30.0f64));
        age.push(rng.gen_range(18..70i64));
        location.push(*LOCATIONS.choose(&mut rng).unwrap());
        device.push(dev);
        gender.push(*GENDERS.choose(&mut rng).unwrap());
        days_since_last_visit.push(rng.gen_range(0..60i64));
        pages_viewed.push(pages);
        group.push(if treated { "treatment" } else { "control" });

        let outcome = if dev == "mobile" { treated } else { pages >= 9 };
        converted.push(outcome as i32);
    }

    df! {
        "time_spent" => time_spent,
        "age" => age,
        "location" => location,
        "device" => device,
        "gender" => gender,
        "days_since_last_visit" => days_since_last_visit,
        "pages_viewed" => pages_viewed,
        "group" => group,
        "converted" => converted,
    }
    .unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("ab_test.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("ab_test.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Read a column back as f64 values
pub fn column_f64(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect()
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}
