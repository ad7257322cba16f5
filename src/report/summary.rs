//! Uplift run summary

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;
use serde::Serialize;

use crate::pipeline::{FitDiagnostics, UpliftResult};

/// Distribution of the per-row uplift estimates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UpliftStats {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    /// Rows with a positive estimated effect
    pub positive: usize,
}

impl UpliftStats {
    /// Returns `None` for an empty slice
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let positive = values.iter().filter(|&&v| v > 0.0).count();

        Some(Self {
            min,
            mean,
            max,
            positive,
        })
    }
}

/// Summary of one pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpliftSummary {
    pub rows: usize,
    pub features: usize,
    pub treated: usize,
    pub control: usize,
    pub ate: f64,
    pub uplift: Option<UpliftStats>,
    pub propensity_min: f64,
    pub propensity_max: f64,
    pub clipped_propensities: usize,
    #[serde(skip)]
    load_time: Option<Duration>,
    #[serde(skip)]
    prepare_time: Option<Duration>,
    #[serde(skip)]
    fit_time: Option<Duration>,
    #[serde(skip)]
    save_time: Option<Duration>,
}

impl UpliftSummary {
    pub fn new(
        diagnostics: &FitDiagnostics,
        features: usize,
        ate: f64,
        uplift: &[f64],
    ) -> Self {
        Self {
            rows: diagnostics.n_rows,
            features,
            treated: diagnostics.n_treated,
            control: diagnostics.n_control,
            ate,
            uplift: UpliftStats::from_values(uplift),
            propensity_min: diagnostics.propensity_min,
            propensity_max: diagnostics.propensity_max,
            clipped_propensities: diagnostics.clipped_propensities,
            ..Default::default()
        }
    }

    /// Build a summary from a finished run, reading the uplift column back
    pub fn from_result(result: &UpliftResult, uplift_column: &str) -> anyhow::Result<Self> {
        let uplift: Vec<f64> = result
            .frame
            .column(uplift_column)?
            .f64()?
            .into_iter()
            .flatten()
            .collect();
        Ok(Self::new(
            &result.diagnostics,
            result.feature_names.len(),
            result.ate,
            &uplift,
        ))
    }

    pub fn set_load_time(&mut self, elapsed: Duration) {
        self.load_time = Some(elapsed);
    }

    pub fn set_prepare_time(&mut self, elapsed: Duration) {
        self.prepare_time = Some(elapsed);
    }

    pub fn set_fit_time(&mut self, elapsed: Duration) {
        self.fit_time = Some(elapsed);
    }

    pub fn set_save_time(&mut self, elapsed: Duration) {
        self.save_time = Some(elapsed);
    }

    pub fn total_time(&self) -> Duration {
        [
            self.load_time,
            self.prepare_time,
            self.fit_time,
            self.save_time,
        ]
        .iter()
        .flatten()
        .sum()
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("UPLIFT SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("📁 Rows"), Cell::new(self.rows)]);
        table.add_row(vec![Cell::new("🧮 Features"), Cell::new(self.features)]);
        table.add_row(vec![
            Cell::new("🧪 Treated / Control"),
            Cell::new(format!("{} / {}", self.treated, self.control)),
        ]);

        let ate_color = if self.ate > 0.0 {
            Color::Green
        } else if self.ate < 0.0 {
            Color::Red
        } else {
            Color::White
        };
        table.add_row(vec![
            Cell::new("🎯 Average Effect (ATE)"),
            Cell::new(format!("{:+.4}", self.ate))
                .fg(ate_color)
                .add_attribute(Attribute::Bold),
        ]);

        if let Some(stats) = &self.uplift {
            table.add_row(vec![
                Cell::new("📈 Uplift min / mean / max"),
                Cell::new(format!(
                    "{:+.4} / {:+.4} / {:+.4}",
                    stats.min, stats.mean, stats.max
                )),
            ]);
            table.add_row(vec![
                Cell::new("✅ Positive Uplift Rows"),
                Cell::new(stats.positive).fg(Color::Cyan),
            ]);
        }

        table.add_row(vec![
            Cell::new("⚖️  Propensity Range"),
            Cell::new(format!(
                "[{:.4}, {:.4}]",
                self.propensity_min, self.propensity_max
            )),
        ]);
        table.add_row(vec![
            Cell::new("✂️  Clipped Propensities"),
            Cell::new(self.clipped_propensities).fg(if self.clipped_propensities == 0 {
                Color::White
            } else {
                Color::Yellow
            }),
        ]);

        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        let timings = [
            ("Load", self.load_time),
            ("Prepare", self.prepare_time),
            ("Fit", self.fit_time),
            ("Save", self.save_time),
        ];
        if timings.iter().any(|(_, t)| t.is_some()) {
            println!();
            println!(
                "    {} {}",
                style("⏱").cyan(),
                style("TIMINGS").white().bold()
            );
            println!("    {}", style("─".repeat(50)).dim());
            for (label, elapsed) in timings {
                if let Some(elapsed) = elapsed {
                    println!(
                        "      {:<10} {}",
                        label,
                        style(format!("{:.2}s", elapsed.as_secs_f64())).dim()
                    );
                }
            }
            println!(
                "      {:<10} {}",
                "Total",
                style(format!("{:.2}s", self.total_time().as_secs_f64())).bold()
            );
        }
    }
}
