//! Error types for runner module

use std::time::Duration;
use thiserror::Error;

/// Interpreter execution errors
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Executable not found or not executable: {program}")]
    ExecutableNotFound { program: String },

    #[error("Execution timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Execution was cancelled")]
    Cancelled,

    #[error("Native execution failed: {reason}")]
    NativeExecutionFailed { reason: String },
}
