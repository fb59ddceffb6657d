use artrpc_config::ConfigError;
use artrpc_lock::LockError;
use artrpc_runner::RunOutcome;
use artrpc_store::StoreError;
use artrpc_template::TemplateError;
use artrpc_utils::{AtomicWriteError, LayoutError};
use camino::Utf8PathBuf;
use thiserror::Error;

/// Failures of orchestrator operations.
///
/// A nonzero exit or a missing interpreter during `code`/`run` is not an
/// error: it is recorded in the returned store. Only `version` reports a
/// failed run, as [`EngineError::Run`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to prepare home directory: {0}")]
    Layout(#[from] LayoutError),

    #[error("Failed to write scratch script {path}: {source}")]
    ScriptWrite {
        path: Utf8PathBuf,
        #[source]
        source: AtomicWriteError,
    },

    #[error("{0}")]
    Run(RunOutcome),
}
