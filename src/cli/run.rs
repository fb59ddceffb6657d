//! CLI entry point and dispatch
//!
//! [`run`] owns all user-facing output, including errors; `main` only turns
//! the returned [`ExitCode`] into a process exit.

use clap::Parser;

use artrpc_config::Config;
use artrpc_utils::logging::init_tracing;

use super::args::{Cli, Commands};
use super::commands;
use crate::ExitCode;

/// Parse arguments, discover configuration and run the chosen command.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let overrides = match cli.overrides() {
        Ok(overrides) => overrides,
        Err(err) => {
            eprintln!("✗ {err}");
            return Err(ExitCode::CLI_ARGS);
        }
    };

    let config = match Config::discover(&overrides) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("✗ Configuration error: {err}");
            return Err(ExitCode::from(&err));
        }
    };

    if let Err(err) = init_tracing(config.verbose) {
        eprintln!("Warning: failed to initialise logging: {err}");
    }

    let operation = match &cli.command {
        Commands::Version => "version",
        Commands::Code { .. } => "code",
        Commands::Run { .. } => "run",
        Commands::Store(_) => "store",
        Commands::Config => "config",
    };

    let result = match &cli.command {
        Commands::Version => commands::execute_version_command(&config),
        Commands::Code { file } => commands::execute_code_command(file.as_deref(), &config),
        Commands::Run { args } => commands::execute_run_command(args, &config),
        Commands::Store(command) => commands::execute_store_command(command, &config),
        Commands::Config => commands::execute_config_command(&config),
    };

    match result {
        Ok(ExitCode::SUCCESS) => Ok(()),
        Ok(code) => Err(code),
        Err(err) => {
            eprintln!("✗ {operation} failed: {err:#}");
            Err(ExitCode::from_error(&err))
        }
    }
}
