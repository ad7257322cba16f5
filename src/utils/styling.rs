//! Terminal styling helpers

use console::{style, Emoji};
use std::path::Path;
use std::time::Duration;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static SPLIT: Emoji<'_, '_> = Emoji("🧪 ", "");
pub static TREE: Emoji<'_, '_> = Emoji("🌲 ", "");

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
     _    ____  _   _       _ _  __ _
    / \  | __ )| | | |_ __ | (_)/ _| |_
   / _ \ |  _ \| | | | '_ \| | | |_| __|
  / ___ \| |_) | |_| | |_) | | |  _| |_
 /_/   \_\____/ \___/| .__/|_|_|_|  \__|
                     |_|
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {}",
        style("Doubly-robust uplift for A/B test data").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Settings shown in the configuration card
pub struct ConfigCard<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub treatment_column: &'a str,
    pub treatment_value: &'a str,
    pub control_value: &'a str,
    pub outcome_column: &'a str,
    pub n_estimators: usize,
    pub cv_folds: usize,
    pub seed: u64,
}

/// Print configuration card
pub fn print_config(card: &ConfigCard) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(box_width - 20)
    );
    println!("    ├{}┤", line);
    println!("    │  {} Input:   {:<38}│", FOLDER, truncate_path(card.input, 37));
    println!("    │  {} Output:  {:<38}│", SAVE, truncate_path(card.output, 37));
    println!(
        "    │  {} Outcome: {:<38}│",
        TARGET,
        truncate_string(card.outcome_column, 37)
    );
    println!(
        "    │  {} Groups:  {:<38}│",
        SPLIT,
        truncate_string(
            &format!(
                "{} ({} vs {})",
                card.treatment_column, card.treatment_value, card.control_value
            ),
            37
        )
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {} Trees: {:<8} Folds: {:<6} Seed: {:<11}│",
        TREE,
        style(card.n_estimators).yellow(),
        style(card.cv_folds).yellow(),
        style(card.seed).yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print the elapsed time of a step
pub fn print_step_time(elapsed: Duration) {
    println!(
        "      {}",
        style(format!("⏱ {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!(
        "    {} {}",
        ROCKET,
        style("Uplift estimation complete!").green().bold()
    );
    println!();
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, detail: Option<&str>) {
    if let Some(info) = detail {
        println!(
            "      Found {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        );
    } else {
        println!("      Found {} {}", style(count).yellow().bold(), description);
    }
}

fn truncate_path(path: &Path, max_len: usize) -> String {
    let path_str = path.display().to_string();
    truncate_string(&path_str, max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}
