//! abuplift: uplift estimation for A/B test data
//!
//! Loads an experiment table, one-hot encodes its nominal covariates and
//! fits a doubly-robust learner (random-forest outcome model, logistic
//! propensity model, linear final stage) to estimate the per-user effect
//! of treatment on a binary outcome. The estimate is appended to the
//! table as an `uplift` column.
//!
//! ```no_run
//! use std::path::Path;
//!
//! let scored = abuplift::pipeline::process(Path::new("ab_test.csv"))?;
//! println!("{:?}", scored.column("uplift")?);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
