//! Uplift aggregated by categorical segment

use serde::Serialize;
use std::collections::BTreeMap;

/// Mean uplift of one level of one categorical column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentUplift {
    pub column: String,
    pub level: String,
    pub count: usize,
    pub mean_uplift: f64,
}

/// Group `uplift` by the raw values of a categorical column
///
/// Rows with a null value are collected under the level `"(null)"`.
/// Segments are returned sorted by level.
pub fn segment_uplift(
    column: &str,
    values: &[Option<String>],
    uplift: &[f64],
) -> Vec<SegmentUplift> {
    let mut groups: BTreeMap<&str, (usize, f64)> = BTreeMap::new();

    for (value, &u) in values.iter().zip(uplift.iter()) {
        let level = value.as_deref().unwrap_or("(null)");
        let entry = groups.entry(level).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += u;
    }

    groups
        .into_iter()
        .map(|(level, (count, sum))| SegmentUplift {
            column: column.to_string(),
            level: level.to_string(),
            count,
            mean_uplift: sum / count as f64,
        })
        .collect()
}
