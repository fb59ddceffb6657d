//! CLI argument definitions
//!
//! Global flags feed [`CliOverrides`]; everything left unset falls through to
//! the environment, `config.toml` and the built-in defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use artrpc_config::CliOverrides;
use artrpc_utils::paths::to_utf8;
use artrpc_utils::LayoutError;

/// artrpc - drive the Arturo interpreter through a shared JSON store
#[derive(Parser)]
#[command(name = "artrpc")]
#[command(about = "Run Arturo code and exchange values with it through a JSON store")]
#[command(long_about = r#"
artrpc writes Arturo code behind a small preamble, runs the interpreter on it
and prints the shared store the script left behind. Scripts talk back through
`setv`, `getv` and `signal`; the host adds `output` or `error`/`error_code`
describing the run.

EXAMPLES:
  # Print the interpreter version
  artrpc version

  # Run code from stdin
  echo 'setv "answer" 42' | artrpc code

  # Run a file and pass the interpreter's exit code through
  artrpc code job.art

  # Invoke the interpreter with raw arguments
  artrpc run -- --help

  # Inspect or reset the store
  artrpc store show
  artrpc store signals
  artrpc store reset

CONFIGURATION:
  Precedence: CLI flags > ARTRPC_* environment > <home>/config.toml > defaults
  The home defaults to ~/.arturo (override with --home or ARTRPC_HOME)
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (replaces <home>/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Home directory holding stores, the scratch script and the lock
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Interpreter executable (default: `arturo` on PATH)
    #[arg(long, global = true)]
    pub executable: Option<PathBuf>,

    /// Store name
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Per-run deadline in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the interpreter version
    Version,

    /// Run Arturo code behind the store preamble and print the merged store
    ///
    /// EXAMPLES:
    ///   artrpc code job.art
    ///   echo 'print 1 + 2' | artrpc code
    Code {
        /// File holding the code; `-` or absent reads stdin
        file: Option<PathBuf>,
    },

    /// Invoke the interpreter with raw arguments and print the merged store
    Run {
        /// Arguments passed through unchanged
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Inspect or rewrite the store document
    #[command(subcommand)]
    Store(StoreCommands),

    /// Show effective configuration and where each value came from
    Config,
}

#[derive(Subcommand)]
pub enum StoreCommands {
    /// Print the on-disk store document
    Show,

    /// Create `signals` and `vars` if missing, keeping existing values
    Init,

    /// Replace the store with empty channels
    Reset,

    /// Print signals as `key: body`, oldest first
    Signals,
}

impl Cli {
    /// Overrides for configuration discovery.
    pub fn overrides(&self) -> Result<CliOverrides, LayoutError> {
        Ok(CliOverrides {
            config_path: self.config.clone().map(to_utf8).transpose()?,
            home: self.home.clone().map(to_utf8).transpose()?,
            executable: self.executable.clone(),
            store_name: self.store.clone(),
            script_name: None,
            timeout_secs: self.timeout,
            verbose: self.verbose.then_some(true),
        })
    }
}
