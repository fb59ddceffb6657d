//! Logging and observability infrastructure for artrpc
//!
//! Library crates only emit `tracing` events; the binary installs the
//! subscriber once through [`init_tracing`].

use std::io::IsTerminal;
use tracing::{Level, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Filter used when `RUST_LOG` is unset.
#[must_use]
pub const fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "artrpc=debug,info"
    } else {
        "artrpc=info,warn"
    }
}

/// Check if colored output should be used.
///
/// Logs go to stderr, so that is the stream checked; `NO_COLOR` always wins.
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `verbose`. Verbose output adds targets
/// and span close events (which carry run durations).
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(verbose)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(use_color())
        .with_target(verbose)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_span_events(if verbose {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()?;

    Ok(())
}

/// Span wrapping one interpreter invocation.
pub fn run_span(program: &str, store: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "interpreter_run",
        program = %program,
        store = %store,
    )
}
