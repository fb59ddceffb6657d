//! Command-line interface for artrpc
//!
//! - `args`: clap argument definitions
//! - `run`: entry point, configuration discovery and error output
//! - `commands`: one handler per subcommand

pub mod args;
mod commands;
mod run;

pub use args::{Cli, Commands, StoreCommands};
pub use run::run;
