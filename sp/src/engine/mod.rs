//! Engine - wires the cook and the savages around one pot
//!
//! Spawns one named thread per worker, ends the run according to its
//! [`RunMode`], and always stops the cook through cancellation before
//! returning so no thread outlives the run.

mod config;
mod core;
mod report;

pub use config::{EngineConfig, Policy, RunMode};
pub use self::core::{Engine, create_engine};
pub use report::RunReport;
