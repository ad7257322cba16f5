//! Pipeline module - load, encode, estimate and attach uplift

pub mod encoding;
pub mod estimator;
pub mod features;
pub mod loader;
pub mod segments;
pub mod session;
pub mod treatment;
pub mod uplift;
pub mod values;

pub use encoding::*;
pub use estimator::{DefaultDrLearner, EstimatorConfig, EstimatorError, FitDiagnostics, Matrix};
pub use features::*;
pub use loader::*;
pub use segments::*;
pub use session::{Session, SessionBuilder};
pub use treatment::*;
pub use uplift::*;
pub use values::*;
