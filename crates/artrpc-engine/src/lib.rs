//! Orchestration for artrpc
//!
//! [`Orchestrator`] composes the script template, the process runner and the
//! store synchronizer: it renders caller code behind the store preamble,
//! writes it to the scratch path, runs the interpreter on it, then reloads
//! the store and overlays the run's result in memory.

mod error;
pub mod orchestrator;

pub use error::EngineError;
pub use orchestrator::{Orchestrator, VERSION_FLAG, run_metadata};
