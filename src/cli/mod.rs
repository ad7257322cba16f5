//! CLI module - argument parsing

mod args;

pub use args::{derive_output_path, Cli};
