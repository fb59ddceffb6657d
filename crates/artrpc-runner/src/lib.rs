//! Interpreter execution for artrpc
//!
//! Spawns the external interpreter, captures stdout/stderr/exit code and
//! classifies the result into a [`RunOutcome`]. Every invocation carries a
//! deadline and a [`CancellationToken`]; on expiry the child is killed.
//!
//! # Security Model
//!
//! All process execution goes through [`CommandSpec`] to ensure argv-style invocation.
//! Arguments are passed as discrete elements, never as a shell string.

pub mod command_spec;
pub mod discovery;
pub mod error;
pub mod native;
pub mod outcome;
pub mod process;

pub use command_spec::CommandSpec;
pub use discovery::{DEFAULT_EXECUTABLE, find_executable};
pub use error::RunnerError;
pub use native::NativeRunner;
pub use outcome::RunOutcome;
pub use process::{ProcessOutput, ProcessRunner};
pub use tokio_util::sync::CancellationToken;
