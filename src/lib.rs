//! artrpc: drive the Arturo interpreter through a shared JSON store.
//!
//! The host renders caller code behind a preamble that opens the store,
//! runs the interpreter on it, then reloads whatever the script wrote and
//! overlays the run's `output` or `error`/`error_code`.
//!
//! ```rust,no_run
//! use artrpc::{Config, Orchestrator};
//!
//! let config = Config::builder().build()?;
//! let mut arturo = Orchestrator::new(&config)?;
//!
//! let store = arturo.code("setv \"sum\" 1 + 2\nsignal.key:\"math\" \"added\"")?;
//! assert_eq!(store.var("sum"), Some(&serde_json::json!(3)));
//! for signal in store.signals() {
//!     println!("{}: {}", signal.key, signal.body);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Crates
//!
//! | crate | role |
//! |---|---|
//! | `artrpc-template` | the store preamble |
//! | `artrpc-store` | store model, load/commit and run overlay |
//! | `artrpc-runner` | subprocess execution with deadline and cancellation |
//! | `artrpc-lock` | session lock over the home directory |
//! | `artrpc-config` | layered configuration |
//! | `artrpc-engine` | the [`Orchestrator`] |

pub mod cli;
pub mod exit_codes;

pub use artrpc_config::{CliOverrides, Config, ConfigBuilder, ConfigError, ConfigSource};
pub use artrpc_engine::{EngineError, Orchestrator, VERSION_FLAG, run_metadata};
pub use artrpc_lock::{LockError, LockInfo, SessionLock};
pub use artrpc_runner::{
    CancellationToken, CommandSpec, NativeRunner, ProcessOutput, ProcessRunner, RunOutcome,
    RunnerError,
};
pub use artrpc_store::{RunMetadata, Signal, Store, StoreError, StoreSynchronizer};
pub use artrpc_template::{ScriptTemplate, TemplateError};
pub use artrpc_utils::{Layout, LayoutError};
pub use exit_codes::ExitCode;
