//! Process-wide session handle
//!
//! A `Session` owns the pipeline configuration and a rayon thread pool.
//! Every load and fit issued through it runs inside that pool; dropping
//! the session shuts the pool down.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use polars::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::loader::load_dataset_with_progress;
use super::uplift::{process_frame, PipelineConfig, UpliftResult};

const DEFAULT_APP_NAME: &str = "abuplift";

static DEFAULT_SESSION: OnceLock<Session> = OnceLock::new();

/// Builder for [`Session`]
#[derive(Debug, Default)]
pub struct SessionBuilder {
    app_name: Option<String>,
    num_threads: Option<usize>,
    config: Option<PipelineConfig>,
}

impl SessionBuilder {
    /// Name used for worker threads
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Worker thread count (0 or unset = one per logical CPU)
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Session> {
        let app_name = self
            .app_name
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());
        let config = self.config.unwrap_or_default();
        config
            .estimator
            .validate()
            .context("Invalid estimator configuration")?;

        let thread_prefix = app_name.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.num_threads.unwrap_or(0))
            .thread_name(move |i| format!("{}-{}", thread_prefix, i))
            .build()
            .context("Failed to start the session thread pool")?;

        Ok(Session {
            app_name,
            config,
            pool,
        })
    }
}

/// Long-lived handle used for loading and fitting
pub struct Session {
    app_name: String,
    config: PipelineConfig,
    pool: ThreadPool,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Shared session with default settings, built on first use
    ///
    /// A failed build is returned as an error and retried on the next call.
    pub fn get_or_create() -> Result<&'static Session> {
        if let Some(session) = DEFAULT_SESSION.get() {
            return Ok(session);
        }
        let session = Session::builder().build()?;
        // A concurrent caller may have won; its session is kept and ours dropped
        Ok(DEFAULT_SESSION.get_or_init(|| session))
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` inside the session's thread pool
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Load and materialize a dataset
    pub fn load(&self, path: &Path) -> Result<DataFrame> {
        let infer_schema_length = self.config.infer_schema_length;
        self.install(|| load_dataset_with_progress(path, infer_schema_length))
            .map(|(df, _, _, _)| df)
    }

    /// Run the pipeline on an in-memory table
    pub fn run_frame(&self, df: &DataFrame) -> Result<UpliftResult> {
        self.install(|| process_frame(df, &self.config))
    }

    /// Load a file and run the pipeline on it
    pub fn run(&self, path: &Path) -> Result<UpliftResult> {
        let df = self.load(path)?;
        self.run_frame(&df)
    }

    /// Load a file and return the scored table
    pub fn process(&self, path: &Path) -> Result<DataFrame> {
        Ok(self.run(path)?.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let session = Session::builder().num_threads(2).build().unwrap();
        assert_eq!(session.app_name(), "abuplift");
        assert_eq!(session.num_threads(), 2);
        assert_eq!(session.config(), &PipelineConfig::default());
    }

    #[test]
    fn test_builder_rejects_invalid_estimator_config() {
        let mut config = PipelineConfig::default();
        config.estimator.cv_folds = 1;
        let result = Session::builder().config(config).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_default_session_is_shared() {
        let first = Session::get_or_create().unwrap();
        let second = Session::get_or_create().unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.config(), &PipelineConfig::default());
    }

    #[test]
    fn test_install_runs_in_pool() {
        let session = Session::builder()
            .app_name("uplift-test")
            .num_threads(1)
            .build()
            .unwrap();
        let threads = session.install(rayon::current_num_threads);
        assert_eq!(threads, 1);
    }
}
