//! CLI command implementations
//!
//! Handlers print their own output and return the exit code to use; errors
//! bubble up to [`run`](super::run) for reporting.

use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use artrpc_config::Config;
use artrpc_engine::{EngineError, Orchestrator};
use artrpc_lock::last_holder;
use artrpc_runner::NativeRunner;
use artrpc_store::Store;
use tracing::debug;

use super::args::StoreCommands;
use crate::ExitCode;

pub fn execute_version_command(config: &Config) -> Result<ExitCode> {
    let orchestrator = Orchestrator::without_initial_load(config, NativeRunner::new())?;
    println!("{}", orchestrator.version()?);
    Ok(ExitCode::SUCCESS)
}

/// Run code from `file` (stdin for `None` or `-`). The exit code reflects the
/// interpreter's outcome; the merged store is printed either way.
pub fn execute_code_command(file: Option<&Path>, config: &Config) -> Result<ExitCode> {
    let body = read_code(file)?;
    let mut orchestrator = Orchestrator::new(config)?;

    let store = orchestrator.code(&body)?;
    print_store(store)?;

    Ok(orchestrator
        .last_outcome()
        .map_or(ExitCode::SUCCESS, ExitCode::from_outcome))
}

pub fn execute_run_command(args: &[String], config: &Config) -> Result<ExitCode> {
    let mut orchestrator = Orchestrator::new(config)?;

    let store = orchestrator.run(args)?;
    print_store(store)?;

    Ok(orchestrator
        .last_outcome()
        .map_or(ExitCode::SUCCESS, ExitCode::from_outcome))
}

pub fn execute_store_command(command: &StoreCommands, config: &Config) -> Result<ExitCode> {
    let mut orchestrator = Orchestrator::without_initial_load(config, NativeRunner::new())?;
    let path = orchestrator.layout().store_path.clone();

    match command {
        StoreCommands::Show => match read_existing(&orchestrator)? {
            Some(store) => {
                print_store(&store)?;
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("No store at {path}; create one with `artrpc store init`");
                Ok(ExitCode::INTERNAL)
            }
        },
        StoreCommands::Init => {
            orchestrator
                .load()
                .with_context(|| format!("Failed to load {path}"))?;
            print_store(orchestrator.init_store()?)?;
            Ok(ExitCode::SUCCESS)
        }
        StoreCommands::Reset => {
            print_store(orchestrator.reset_store()?)?;
            Ok(ExitCode::SUCCESS)
        }
        StoreCommands::Signals => {
            let store = read_existing(&orchestrator)?.unwrap_or_default();
            for signal in store.signals() {
                println!("{}: {}", signal.key, signal.body);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

pub fn execute_config_command(config: &Config) -> Result<ExitCode> {
    let rows = config.effective_config();
    let width = rows.iter().map(|(key, _, _)| key.len()).max().unwrap_or(0);
    for (key, value, source) in rows {
        println!("{key:<width$}  {value}  ({source})");
    }

    let lock_path = config.layout().lock_path;
    match last_holder(&lock_path) {
        Ok(Some(holder)) => println!(
            "Last lock holder: pid {} at {} (artrpc {})",
            holder.pid,
            holder.acquired_at.to_rfc3339(),
            holder.version
        ),
        Ok(None) => println!("Last lock holder: none"),
        Err(err) => eprintln!("Warning: {err}"),
    }
    Ok(ExitCode::SUCCESS)
}

fn read_code(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("Failed to read code from {}", path.display())),
        _ => {
            let mut body = String::new();
            io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read code from stdin")?;
            debug!(bytes = body.len(), "Read code from stdin");
            Ok(body)
        }
    }
}

/// On-disk document, `None` if it has not been created yet.
fn read_existing(orchestrator: &Orchestrator) -> Result<Option<Store>> {
    match orchestrator.read_document() {
        Ok(store) => Ok(Some(store)),
        Err(EngineError::Store(e)) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn print_store(store: &Store) -> Result<()> {
    let json = serde_json::to_string_pretty(&store.to_value()).context("Failed to render store")?;
    println!("{json}");
    Ok(())
}
