//! Tests for categorical encoding and feature assembly

use abuplift::pipeline::{
    build_feature_matrix, one_hot_encode, select_feature_columns, CategoricalEncoder, FeatureSpec,
    CATEGORICAL_COLUMNS,
};
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_default_columns_are_replaced_by_indicators() {
    let df = common::create_ab_test_dataframe(60, 2);
    let encoded = one_hot_encode(&df, &CATEGORICAL_COLUMNS).unwrap();

    common::assert_missing_columns(&encoded, &["location", "device", "gender"]);
    common::assert_has_columns(
        &encoded,
        &[
            "location_Germany",
            "location_India",
            "location_USA",
            "device_mobile",
            "device_tablet",
            "gender_M",
        ],
    );
    // reference levels are dropped
    common::assert_missing_columns(&encoded, &["location_Brazil", "device_desktop", "gender_F"]);
    assert_eq!(encoded.height(), 60);
}

#[test]
fn test_indicators_sum_to_at_most_one() {
    let df = common::create_ab_test_dataframe(30, 8);
    let encoded = one_hot_encode(&df, &["device"]).unwrap();

    let mobile = common::column_f64(&encoded, "device_mobile");
    let tablet = common::column_f64(&encoded, "device_tablet");
    let devices: Vec<Option<&str>> = df.column("device").unwrap().str().unwrap().into_iter().collect();

    for ((m, t), device) in mobile.iter().zip(tablet.iter()).zip(devices) {
        assert!(m + t <= 1.0);
        match device {
            Some("desktop") => assert_eq!((*m, *t), (0.0, 0.0)),
            Some("mobile") => assert_eq!((*m, *t), (1.0, 0.0)),
            Some("tablet") => assert_eq!((*m, *t), (0.0, 1.0)),
            other => panic!("unexpected device {:?}", other),
        }
    }
}

#[test]
fn test_encoder_reused_on_new_rows_maps_unseen_level_to_zeros() {
    let train = df! { "device" => ["desktop", "mobile", "tablet"] }.unwrap();
    let encoder = CategoricalEncoder::fit(&train, &["device"]).unwrap();

    let new_rows = df! { "device" => ["mobile", "smart_tv"] }.unwrap();
    let encoded = encoder.transform(&new_rows).unwrap();

    assert_eq!(common::column_f64(&encoded, "device_mobile"), vec![1.0, 0.0]);
    assert_eq!(common::column_f64(&encoded, "device_tablet"), vec![0.0, 0.0]);
}

#[test]
fn test_float_category_indicator_names_keep_decimal_point() {
    let df = df! { "location" => [1.0f64, 2.0, 2.5, 1.0] }.unwrap();
    let encoded = one_hot_encode(&df, &["location"]).unwrap();

    common::assert_has_columns(&encoded, &["location_2.0", "location_2.5"]);
    common::assert_missing_columns(&encoded, &["location_1.0", "location_2"]);
    assert_eq!(common::column_f64(&encoded, "location_2.0"), vec![0.0, 1.0, 0.0, 0.0]);
}

#[test]
fn test_feature_matrix_from_encoded_table() {
    let df = common::create_ab_test_dataframe(20, 6);
    let encoded = one_hot_encode(&df, &CATEGORICAL_COLUMNS).unwrap();

    let names = select_feature_columns(&encoded, &FeatureSpec::default());
    let x = build_feature_matrix(&encoded, &names).unwrap();

    assert_eq!(x.rows(), 20);
    assert_eq!(x.cols(), names.len());
    assert_eq!(&names[..4], &["time_spent", "age", "days_since_last_visit", "pages_viewed"]);
    assert!(!names.iter().any(|n| n == "group" || n == "converted"));
    assert!(x.is_finite());
}
