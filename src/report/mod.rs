//! Report module - summarizing uplift results

pub mod export;
pub mod summary;

pub use export::*;
pub use summary::*;
