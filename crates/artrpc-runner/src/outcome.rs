//! Classification of a finished (or abandoned) interpreter run.

use std::fmt;
use std::time::Duration;

use crate::{ProcessOutput, RunnerError};

/// Terminal state of one invocation.
///
/// Missing executables and nonzero exits are ordinary values here, never
/// errors: callers inspect the outcome and decide what to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Exit code 0; stdout trimmed of surrounding whitespace.
    Succeeded { output: String },
    /// Nonzero exit; stderr kept verbatim.
    NonZeroExit { exit_code: i32, stderr: String },
    /// Killed by a signal, so there is no exit code.
    Terminated { stderr: String },
    /// The program does not exist or is not executable.
    NotFound { program: String },
    TimedOut { after: Duration },
    Cancelled,
    /// Spawning or waiting failed for another reason.
    LaunchFailed { reason: String },
}

impl RunOutcome {
    #[must_use]
    pub fn from_result(result: Result<ProcessOutput, RunnerError>) -> Self {
        match result {
            Ok(output) => match output.exit_code {
                Some(0) => Self::Succeeded {
                    output: output.stdout_string().trim().to_string(),
                },
                Some(exit_code) => Self::NonZeroExit {
                    exit_code,
                    stderr: output.stderr_string(),
                },
                None => Self::Terminated {
                    stderr: output.stderr_string(),
                },
            },
            Err(RunnerError::ExecutableNotFound { program }) => Self::NotFound { program },
            Err(RunnerError::Timeout { timeout }) => Self::TimedOut { after: timeout },
            Err(RunnerError::Cancelled) => Self::Cancelled,
            Err(RunnerError::NativeExecutionFailed { reason }) => Self::LaunchFailed { reason },
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Trimmed stdout of a successful run.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Succeeded { output } => Some(output),
            _ => None,
        }
    }

    /// Numeric exit code; only nonzero exits carry one.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NonZeroExit { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    /// Text recorded as the store's `error` field, `None` on success.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Succeeded { .. } => None,
            Self::NonZeroExit { stderr, .. } | Self::Terminated { stderr } => Some(stderr.clone()),
            Self::NotFound { program } => Some(format!("The binary '{program}' was not found.")),
            Self::TimedOut { after } => Some(format!("Execution timed out after {after:?}")),
            Self::Cancelled => Some("Execution was cancelled".to_string()),
            Self::LaunchFailed { reason } => Some(reason.clone()),
        }
    }

    /// Stable label used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Succeeded { .. } => "succeeded",
            Self::NonZeroExit { .. } => "failed_nonzero",
            Self::Terminated { .. } => "terminated",
            Self::NotFound { .. } => "failed_not_found",
            Self::TimedOut { .. } => "timed_out",
            Self::Cancelled => "cancelled",
            Self::LaunchFailed { .. } => "launch_failed",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded { .. } => write!(f, "interpreter exited successfully"),
            Self::NonZeroExit { exit_code, stderr } => {
                write!(f, "interpreter exited with code {exit_code}")?;
                let stderr = stderr.trim();
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
            Self::Terminated { .. } => write!(f, "interpreter was terminated by a signal"),
            Self::NotFound { program } => write!(f, "The binary '{program}' was not found."),
            Self::TimedOut { after } => write!(f, "Execution timed out after {after:?}"),
            Self::Cancelled => write!(f, "Execution was cancelled"),
            Self::LaunchFailed { reason } => write!(f, "{reason}"),
        }
    }
}
