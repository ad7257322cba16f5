//! Column value helpers shared by the encoder and the treatment extractor

use anyhow::Result;
use polars::prelude::*;
use std::collections::BTreeSet;

/// Convert a column to a Vec of Option<String> for comparison
pub fn column_to_strings(col: &Column) -> Result<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let cast = col.cast(&DataType::UInt64)?;
            cast.u64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(format_float_level))
                .collect()
        }
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        _ => {
            // For other types, try to cast to string
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}

/// Whole floats keep a trailing `.0` so `2.0` names its level `2.0`, not `2`
fn format_float_level(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{:.1}", n)
    } else {
        n.to_string()
    }
}

/// Distinct non-null values of a column as strings, in sorted order
///
/// Numeric columns sort by value, everything else lexicographically.
pub fn sorted_levels(col: &Column) -> Result<Vec<String>> {
    let distinct: BTreeSet<String> = column_to_strings(col)?.into_iter().flatten().collect();
    let mut levels: Vec<String> = distinct.into_iter().collect();

    if col.dtype().is_primitive_numeric() {
        levels.sort_by(|a, b| {
            let a = a.parse::<f64>().unwrap_or(f64::NAN);
            let b = b.parse::<f64>().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        });
    }

    Ok(levels)
}
