use crate::error::RunnerError;
use std::io;
use std::process::Stdio;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{CommandSpec, ProcessOutput, ProcessRunner};

/// Upper bound on how long a cancellation can go unnoticed.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// NativeRunner - direct process execution
// ============================================================================

/// Native process runner using `std::process::Command`.
///
/// The child's output is collected on a helper thread; the calling thread
/// waits on a channel in slices of at most [`CANCEL_POLL_INTERVAL`], checking
/// the deadline and the cancellation token between slices. On Unix the child
/// is placed in its own process group so that anything it forks dies with it.
///
/// # Example
///
/// ```rust,no_run
/// use artrpc_runner::{CancellationToken, CommandSpec, NativeRunner, ProcessRunner};
/// use std::time::Duration;
///
/// let runner = NativeRunner::new();
/// let cmd = CommandSpec::new("arturo").arg("--version");
///
/// let output = runner
///     .run(&cmd, Duration::from_secs(30), &CancellationToken::new())
///     .unwrap();
/// assert!(output.success());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRunner;

impl NativeRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ProcessRunner for NativeRunner {
    fn run(
        &self,
        cmd: &CommandSpec,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, RunnerError> {
        let mut command = cmd.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command
            .spawn()
            .map_err(|e| spawn_error(&cmd.program_display(), e))?;
        let child_id = child.id();
        debug!(pid = child_id, program = %cmd.program_display(), "Spawned interpreter");

        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let _ = tx.send(child.wait_with_output());
        });

        // A deadline past what `Instant` can represent never expires.
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if cancel.is_cancelled() {
                Self::terminate_process(child_id);
                let _ = handle.join();
                return Err(RunnerError::Cancelled);
            }

            let now = Instant::now();
            if deadline.is_some_and(|deadline| now >= deadline) {
                Self::terminate_process(child_id);
                let _ = handle.join();
                return Err(RunnerError::Timeout { timeout });
            }

            let slice = deadline.map_or(CANCEL_POLL_INTERVAL, |deadline| {
                (deadline - now).min(CANCEL_POLL_INTERVAL)
            });
            match rx.recv_timeout(slice) {
                Ok(output_result) => {
                    let _ = handle.join();
                    let output =
                        output_result.map_err(|e| RunnerError::NativeExecutionFailed {
                            reason: format!("Failed to wait for process: {e}"),
                        })?;
                    return Ok(ProcessOutput::new(
                        output.stdout,
                        output.stderr,
                        output.status.code(),
                    ));
                }
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(RunnerError::NativeExecutionFailed {
                        reason: "Process monitoring thread terminated unexpectedly".to_string(),
                    });
                }
            }
        }
    }
}

/// Missing and non-executable programs are the same failure to callers.
fn spawn_error(program: &str, e: io::Error) -> RunnerError {
    match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            RunnerError::ExecutableNotFound {
                program: program.to_string(),
            }
        }
        _ => RunnerError::NativeExecutionFailed {
            reason: format!("Failed to spawn process '{program}': {e}"),
        },
    }
}

impl NativeRunner {
    /// Kill the child and its process group.
    ///
    /// On Unix, sends SIGKILL to the group led by `pid`.
    /// On Windows, uses TerminateProcess.
    fn terminate_process(pid: u32) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            if let Ok(raw) = i32::try_from(pid) {
                let _ = killpg(Pid::from_raw(raw), Signal::SIGKILL);
            }
        }

        #[cfg(windows)]
        {
            use windows::Win32::Foundation::CloseHandle;
            use windows::Win32::System::Threading::{
                OpenProcess, PROCESS_TERMINATE, TerminateProcess,
            };

            unsafe {
                if let Ok(handle) = OpenProcess(PROCESS_TERMINATE, false, pid) {
                    let _ = TerminateProcess(handle, 1);
                    let _ = CloseHandle(handle);
                }
            }
        }

        #[cfg(not(any(unix, windows)))]
        {
            let _ = pid;
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn run(cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        NativeRunner::new().run(cmd, timeout, &CancellationToken::new())
    }

    #[test]
    fn test_native_runner_echo_command() {
        let output = run(&CommandSpec::new("echo").arg("hello world"), Duration::from_secs(10))
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout_string(), "hello world\n");
    }

    #[test]
    fn test_native_runner_nonexistent_command() {
        let cmd = CommandSpec::new("this_command_definitely_does_not_exist_12345");

        match run(&cmd, Duration::from_secs(10)) {
            Err(RunnerError::ExecutableNotFound { program }) => {
                assert_eq!(program, "this_command_definitely_does_not_exist_12345");
            }
            other => panic!("Expected ExecutableNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_native_runner_exit_code_and_stderr() {
        let cmd = CommandSpec::new("sh").arg("-c").arg("printf boom >&2; exit 3");

        let output = run(&cmd, Duration::from_secs(10)).unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stderr_string(), "boom");
    }

    #[test]
    fn test_native_runner_timeout_kills_process_group() {
        // The grandchild `sleep` would keep the pipes open if only `sh` died.
        let cmd = CommandSpec::new("sh").arg("-c").arg("sleep 30; echo late");
        let started = Instant::now();

        let err = run(&cmd, Duration::from_millis(200)).unwrap_err();

        assert!(matches!(err, RunnerError::Timeout { timeout } if timeout == Duration::from_millis(200)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_native_runner_cancellation() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        let trigger = thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            canceller.cancel();
        });
        let started = Instant::now();

        let err = NativeRunner::new()
            .run(&CommandSpec::new("sleep").arg("30"), Duration::from_secs(60), &token)
            .unwrap_err();
        trigger.join().unwrap();

        assert!(matches!(err, RunnerError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_native_runner_pre_cancelled_token() {
        let token = CancellationToken::new();
        token.cancel();

        let err = NativeRunner::new()
            .run(&CommandSpec::new("sleep").arg("30"), Duration::from_secs(60), &token)
            .unwrap_err();

        assert!(matches!(err, RunnerError::Cancelled));
    }

    #[test]
    fn test_native_runner_unrepresentable_deadline_runs_to_completion() {
        let cmd = CommandSpec::new("sh").arg("-c").arg("printf done");

        let output = run(&cmd, Duration::from_secs(u64::MAX)).unwrap();

        assert!(output.success());
        assert_eq!(output.stdout_string(), "done");
    }

    #[test]
    fn test_native_runner_killed_by_signal_has_no_exit_code() {
        let cmd = CommandSpec::new("sh").arg("-c").arg("kill -9 $$");

        let output = run(&cmd, Duration::from_secs(10)).unwrap();

        assert_eq!(output.exit_code, None);
    }
}
