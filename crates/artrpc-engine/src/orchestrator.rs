//! The host-side controller: templating, execution and store synchronisation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use artrpc_config::Config;
use artrpc_lock::SessionLock;
use artrpc_runner::{
    CancellationToken, CommandSpec, DEFAULT_EXECUTABLE, NativeRunner, ProcessRunner, RunOutcome,
    find_executable,
};
use artrpc_store::{RunMetadata, Store, StoreSynchronizer};
use artrpc_template::ScriptTemplate;
use artrpc_utils::logging::run_span;
use artrpc_utils::{Layout, write_file_atomic};
use tracing::{debug, info, warn};

use crate::EngineError;

/// Argument passed by [`Orchestrator::version`].
pub const VERSION_FLAG: &str = "--version";

/// Drives the interpreter and owns the in-memory view of the shared store.
///
/// Each run goes `dispatched -> {succeeded | failed | timed out | cancelled}`
/// and back to idle; nothing carries over between runs except what the
/// interpreter itself wrote to disk.
///
/// Operations that write the scratch script or the store file take
/// `&mut self` and run under the session lock, so neither this orchestrator
/// nor another process sharing the home can interleave with them.
///
/// # Example
///
/// ```rust,no_run
/// use artrpc_config::Config;
/// use artrpc_engine::Orchestrator;
///
/// let config = Config::builder().build()?;
/// let mut arturo = Orchestrator::new(&config)?;
///
/// println!("{}", arturo.version()?);
/// let store = arturo.code("setv \"answer\" 42\nprint \"done\"")?;
/// assert_eq!(store.output.as_deref(), Some("done"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Orchestrator<R: ProcessRunner = NativeRunner> {
    runner: R,
    executable: PathBuf,
    layout: Layout,
    template: ScriptTemplate,
    timeout: Duration,
    sync: StoreSynchronizer,
    cancel: CancellationToken,
    last_outcome: Option<RunOutcome>,
}

impl Orchestrator<NativeRunner> {
    /// Orchestrator running the real interpreter.
    ///
    /// Creates the home and stores directories if missing and loads the store
    /// if it already exists.
    pub fn new(config: &Config) -> Result<Self, EngineError> {
        Self::with_runner(config, NativeRunner::new())
    }
}

impl<R: ProcessRunner> Orchestrator<R> {
    pub fn with_runner(config: &Config, runner: R) -> Result<Self, EngineError> {
        let mut orchestrator = Self::without_initial_load(config, runner)?;
        if orchestrator.layout.store_exists() {
            orchestrator.sync.load()?;
        }
        Ok(orchestrator)
    }

    /// Like [`with_runner`](Self::with_runner) but leaves the in-memory store
    /// empty even if a document exists on disk. A malformed document can then
    /// still be replaced with [`reset_store`](Self::reset_store).
    pub fn without_initial_load(config: &Config, runner: R) -> Result<Self, EngineError> {
        config.validate()?;
        let layout = config.layout();
        layout.ensure()?;

        let template = ScriptTemplate::new(config.store_name.clone())?;
        let executable = resolve_executable(config.executable.as_deref());
        debug!(
            executable = %executable.display(),
            home = %layout.home,
            store = %layout.store_path,
            "Orchestrator ready"
        );

        Ok(Self {
            runner,
            executable,
            sync: StoreSynchronizer::new(layout.store_path.clone()),
            layout,
            template,
            timeout: config.timeout,
            cancel: CancellationToken::new(),
            last_outcome: None,
        })
    }

    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Token that cancels the in-flight (and every later) interpreter run.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The in-memory store, including the latest run's overlay.
    #[must_use]
    pub const fn store(&self) -> &Store {
        self.sync.store()
    }

    /// Outcome of the most recent `code`/`run` call.
    #[must_use]
    pub const fn last_outcome(&self) -> Option<&RunOutcome> {
        self.last_outcome.as_ref()
    }

    /// Interpreter version string.
    ///
    /// # Errors
    ///
    /// Any outcome other than success is returned as [`EngineError::Run`].
    pub fn version(&self) -> Result<String, EngineError> {
        match self.invoke([VERSION_FLAG]) {
            RunOutcome::Succeeded { output } => Ok(output),
            other => Err(EngineError::Run(other)),
        }
    }

    /// Run `body` after the store preamble and return the merged store.
    ///
    /// The script is written to the scratch path (replacing the previous one)
    /// and passed to the interpreter as its only argument.
    pub fn code(&mut self, body: &str) -> Result<&Store, EngineError> {
        let script = self.template.render(body);
        let script_path = self.layout.script_path.clone();

        let mut lock = SessionLock::open(self.layout.lock_path.clone())?;
        lock.with_exclusive(|| {
            write_file_atomic(&script_path, script.as_bytes()).map_err(|source| {
                EngineError::ScriptWrite {
                    path: script_path.clone(),
                    source,
                }
            })?;
            debug!(path = %script_path, bytes = script.len(), "Wrote scratch script");
            self.run_locked([script_path.as_str()])
        })??;

        Ok(self.sync.store())
    }

    /// Invoke the interpreter with `args`, reload the store and overlay the
    /// run's result.
    pub fn run<I, S>(&mut self, args: I) -> Result<&Store, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut lock = SessionLock::open(self.layout.lock_path.clone())?;
        lock.with_exclusive(|| self.run_locked(args))??;
        Ok(self.sync.store())
    }

    /// One interpreter invocation, no store interaction.
    pub fn invoke<I, S>(&self, args: I) -> RunOutcome
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let cmd = CommandSpec::new(&self.executable).args(args);
        let program = cmd.program_display();
        let span = run_span(&program, self.template.store_name());
        let _entered = span.enter();

        info!(args = cmd.args.len(), "Dispatching interpreter");
        let started = Instant::now();
        let outcome = RunOutcome::from_result(self.runner.run(&cmd, self.timeout, &self.cancel));
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &outcome {
            RunOutcome::Succeeded { .. } => {}
            RunOutcome::NonZeroExit { exit_code, stderr } => {
                warn!(exit_code, stderr = %stderr.trim_end(), "Interpreter failed");
            }
            RunOutcome::Terminated { stderr } => {
                warn!(stderr = %stderr.trim_end(), "Interpreter terminated by signal");
            }
            other => warn!("{other}"),
        }
        info!(outcome = outcome.kind(), duration_ms, "Interpreter finished");
        outcome
    }

    /// Re-read the store from disk. `Ok(false)` if there is no file yet.
    pub fn load(&mut self) -> Result<bool, EngineError> {
        Ok(self.sync.load()?)
    }

    /// Persist the in-memory store, or `replacement` which then replaces it.
    pub fn commit(&mut self, replacement: Option<Store>) -> Result<(), EngineError> {
        let mut lock = SessionLock::open(self.layout.lock_path.clone())?;
        lock.with_exclusive(|| self.sync.commit(replacement))??;
        Ok(())
    }

    /// The on-disk document, leaving the in-memory view alone.
    pub fn read_document(&self) -> Result<Store, EngineError> {
        Ok(self.sync.read_document()?)
    }

    /// Create `signals`/`vars` if missing and persist. Existing values stay.
    pub fn init_store(&mut self) -> Result<&Store, EngineError> {
        let mut store = self.sync.store().clone();
        store.ensure_channels();
        self.commit(Some(store))?;
        Ok(self.sync.store())
    }

    /// Replace the store with empty channels and persist.
    pub fn reset_store(&mut self) -> Result<&Store, EngineError> {
        self.commit(Some(Store::with_channels()))?;
        Ok(self.sync.store())
    }

    fn run_locked<I, S>(&mut self, args: I) -> Result<(), EngineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let outcome = self.invoke(args);
        let meta = run_metadata(&outcome);
        self.last_outcome = Some(outcome);
        if !self.sync.load()? {
            debug!(path = %self.layout.store_path, "No store written by the interpreter");
        }
        self.sync.overlay_run_result(&meta);
        Ok(())
    }
}

impl<R: ProcessRunner> std::fmt::Debug for Orchestrator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("executable", &self.executable)
            .field("layout", &self.layout)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Store fields recording `outcome`.
#[must_use]
pub fn run_metadata(outcome: &RunOutcome) -> RunMetadata {
    match outcome {
        RunOutcome::Succeeded { output } => RunMetadata::success(output.clone()),
        other => RunMetadata::failure(
            other.error_message().unwrap_or_default(),
            other.exit_code(),
        ),
    }
}

/// Explicit path, else the first `arturo` on `PATH`, else the bare name (so
/// runs report it as not found instead of failing construction).
fn resolve_executable(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    find_executable(DEFAULT_EXECUTABLE).unwrap_or_else(|| {
        warn!("'{DEFAULT_EXECUTABLE}' not found on PATH");
        PathBuf::from(DEFAULT_EXECUTABLE)
    })
}
