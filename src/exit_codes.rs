//! Process exit codes for the `artrpc` binary.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | Internal or store failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 9 | `LOCK_HELD` | Session lock could not be taken |
//! | 124 | `TIMEOUT` | Interpreter timed out or was cancelled |
//! | 127 | `NOT_FOUND` | Interpreter executable not found |
//!
//! A nonzero interpreter exit status is passed through unchanged when it fits
//! in `1..=255`.

use artrpc_config::ConfigError;
use artrpc_engine::EngineError;
use artrpc_lock::LockError;
use artrpc_runner::RunOutcome;
use artrpc_store::StoreError;

/// Exit code newtype.
///
/// # Example
///
/// ```rust
/// use artrpc::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_interpreter(3), ExitCode::from_i32(3));
/// assert_eq!(ExitCode::from_interpreter(-1), ExitCode::INTERNAL);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: Self = Self(0);

    /// Internal error, including unreadable or malformed stores
    pub const INTERNAL: Self = Self(1);

    /// Bad arguments or configuration
    pub const CLI_ARGS: Self = Self(2);

    pub const LOCK_HELD: Self = Self(9);

    /// Run hit its deadline or was cancelled (matches `timeout(1)`)
    pub const TIMEOUT: Self = Self(124);

    /// Interpreter not found (matches the shell convention)
    pub const NOT_FOUND: Self = Self(127);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        Self(code)
    }

    /// Pass an interpreter exit status through; anything outside `1..=255`
    /// becomes [`INTERNAL`](Self::INTERNAL).
    #[must_use]
    pub const fn from_interpreter(code: i32) -> Self {
        if matches!(code, 1..=255) {
            Self(code)
        } else {
            Self::INTERNAL
        }
    }

    /// Exit code reporting a finished run.
    #[must_use]
    pub const fn from_outcome(outcome: &RunOutcome) -> Self {
        match outcome {
            RunOutcome::Succeeded { .. } => Self::SUCCESS,
            RunOutcome::NonZeroExit { exit_code, .. } => Self::from_interpreter(*exit_code),
            RunOutcome::Terminated { .. } | RunOutcome::LaunchFailed { .. } => Self::INTERNAL,
            RunOutcome::NotFound { .. } => Self::NOT_FOUND,
            RunOutcome::TimedOut { .. } | RunOutcome::Cancelled => Self::TIMEOUT,
        }
    }

    /// Map an error chain to an exit code by its first recognised cause.
    #[must_use]
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(e) = cause.downcast_ref::<EngineError>() {
                return e.into();
            }
            if cause.downcast_ref::<ConfigError>().is_some() {
                return Self::CLI_ARGS;
            }
            if cause.downcast_ref::<LockError>().is_some() {
                return Self::LOCK_HELD;
            }
            if cause.downcast_ref::<StoreError>().is_some() {
                return Self::INTERNAL;
            }
        }
        Self::INTERNAL
    }
}

impl From<&EngineError> for ExitCode {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::Config(_) | EngineError::Template(_) => Self::CLI_ARGS,
            EngineError::Lock(_) => Self::LOCK_HELD,
            EngineError::Run(outcome) => Self::from_outcome(outcome),
            EngineError::Store(_) | EngineError::Layout(_) | EngineError::ScriptWrite { .. } => {
                Self::INTERNAL
            }
        }
    }
}

impl From<&ConfigError> for ExitCode {
    fn from(_: &ConfigError) -> Self {
        Self::CLI_ARGS
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_constant_values() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::LOCK_HELD.as_i32(), 9);
        assert_eq!(ExitCode::TIMEOUT.as_i32(), 124);
        assert_eq!(ExitCode::NOT_FOUND.as_i32(), 127);
    }

    #[test]
    fn test_interpreter_codes_are_clamped() {
        assert_eq!(ExitCode::from_interpreter(3).as_i32(), 3);
        assert_eq!(ExitCode::from_interpreter(255).as_i32(), 255);
        assert_eq!(ExitCode::from_interpreter(0), ExitCode::INTERNAL);
        assert_eq!(ExitCode::from_interpreter(256), ExitCode::INTERNAL);
        assert_eq!(ExitCode::from_interpreter(-9), ExitCode::INTERNAL);
    }

    #[test]
    fn test_outcome_mapping() {
        let cases = [
            (RunOutcome::Succeeded { output: "ok".into() }, 0),
            (
                RunOutcome::NonZeroExit {
                    exit_code: 3,
                    stderr: "boom".into(),
                },
                3,
            ),
            (RunOutcome::Terminated { stderr: String::new() }, 1),
            (RunOutcome::NotFound { program: "arturo".into() }, 127),
            (
                RunOutcome::TimedOut {
                    after: Duration::from_secs(1),
                },
                124,
            ),
            (RunOutcome::Cancelled, 124),
            (RunOutcome::LaunchFailed { reason: "io".into() }, 1),
        ];
        for (outcome, code) in cases {
            assert_eq!(ExitCode::from_outcome(&outcome).as_i32(), code, "{outcome:?}");
        }
    }

    #[test]
    fn test_error_chain_mapping() {
        let config = ConfigError::InvalidValue {
            key: "timeout_secs".into(),
            reason: "must be greater than 0".into(),
        };
        let err = anyhow::Error::new(EngineError::Config(config)).context("starting");
        assert_eq!(ExitCode::from_error(&err), ExitCode::CLI_ARGS);

        let err = anyhow::Error::new(EngineError::Lock(LockError::Acquire {
            path: "/h/.artrpc.lock".into(),
            source: std::io::Error::other("interrupted"),
        }));
        assert_eq!(ExitCode::from_error(&err), ExitCode::LOCK_HELD);

        let err = anyhow::Error::new(EngineError::Run(RunOutcome::NotFound {
            program: "arturo".into(),
        }));
        assert_eq!(ExitCode::from_error(&err), ExitCode::NOT_FOUND);

        let err = anyhow::anyhow!("something else");
        assert_eq!(ExitCode::from_error(&err), ExitCode::INTERNAL);
    }

    #[test]
    fn test_i32_conversions() {
        let code: ExitCode = 42.into();
        let raw: i32 = code.into();
        assert_eq!(raw, 42);
        assert_eq!(ExitCode::from_i32(9), ExitCode::LOCK_HELD);
    }
}
