//! Tests for dataset loading

use abuplift::pipeline::{get_column_names, load_dataset_with_progress, Session};
use std::io::Write;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_load_ab_test_csv() {
    let mut df = common::create_ab_test_dataframe(25, 0);
    let (_dir, csv_path) = common::create_temp_csv(&mut df);

    let (loaded, rows, cols, mem_mb) = load_dataset_with_progress(&csv_path, 100).unwrap();

    assert_eq!(rows, 25);
    assert_eq!(cols, 9);
    assert!(mem_mb > 0.0, "Memory estimate should be positive");
    common::assert_has_columns(&loaded, &["time_spent", "device", "group", "converted"]);
}

#[test]
fn test_get_column_names_csv() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "group,converted,age").unwrap();
    writeln!(file, "control,0,31").unwrap();
    drop(file);

    let columns = get_column_names(&csv_path).unwrap();

    assert_eq!(columns, vec!["group", "converted", "age"]);
}

#[test]
fn test_get_column_names_parquet() {
    let mut df = common::create_ab_test_dataframe(5, 0);
    let (_dir, parquet_path) = common::create_temp_parquet(&mut df);

    let columns = get_column_names(&parquet_path).unwrap();

    assert_eq!(columns.len(), 9);
    assert_eq!(columns.first().map(String::as_str), Some("time_spent"));
}

#[test]
fn test_unsupported_format() {
    let temp_dir = TempDir::new().unwrap();
    let bad_path = temp_dir.path().join("test.xlsx");
    std::fs::File::create(&bad_path).unwrap();

    let result = load_dataset_with_progress(&bad_path, 100);

    assert!(result.is_err(), "Unsupported format should return error");
    let err_msg = result.unwrap_err().to_string();
    assert!(
        err_msg.contains("Unsupported"),
        "Error message should mention unsupported format: {}",
        err_msg
    );
}

#[test]
fn test_nonexistent_file() {
    let path = std::path::Path::new("/nonexistent/path/to/file.csv");

    let result = load_dataset_with_progress(path, 100);

    let err_msg = result.unwrap_err().to_string();
    assert!(err_msg.contains("not found"), "{}", err_msg);
}

#[test]
fn test_csv_with_missing_values() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("missing.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "age,device,converted").unwrap();
    writeln!(file, "31,,1").unwrap();
    writeln!(file, ",mobile,0").unwrap();
    writeln!(file, "45,desktop,1").unwrap();
    drop(file);

    let (df, rows, cols, _) = load_dataset_with_progress(&csv_path, 100).unwrap();

    assert_eq!(rows, 3);
    assert_eq!(cols, 3);
    assert_eq!(df.column("age").unwrap().null_count(), 1);
    assert_eq!(df.column("device").unwrap().null_count(), 1);
    assert_eq!(df.column("converted").unwrap().null_count(), 0);
}

#[test]
fn test_full_scan_schema_inference() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("inference.csv");

    // Integers for the first rows, then a float
    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "time_spent").unwrap();
    for i in 0..50 {
        writeln!(file, "{}", i).unwrap();
    }
    writeln!(file, "12.5").unwrap();
    drop(file);

    let (df, rows, _, _) = load_dataset_with_progress(&csv_path, 0).unwrap();

    assert_eq!(rows, 51);
    assert_eq!(
        df.column("time_spent").unwrap().dtype(),
        &polars::prelude::DataType::Float64
    );
}

#[test]
fn test_session_load() {
    let mut df = common::create_ab_test_dataframe(12, 4);
    let (_dir, csv_path) = common::create_temp_csv(&mut df);

    let session = Session::builder().num_threads(2).build().unwrap();
    let loaded = session.load(&csv_path).unwrap();

    assert_eq!(loaded.shape(), (12, 9));
}
