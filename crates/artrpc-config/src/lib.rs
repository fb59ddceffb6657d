//! Configuration management for artrpc
//!
//! Values are layered with precedence: CLI/programmatic > environment >
//! `<home>/config.toml` > built-in defaults. Every effective value remembers
//! where it came from (see [`Config::source_of`]).
//!
//! ```toml
//! [runner]
//! executable = "/usr/local/bin/arturo"
//! timeout_secs = 300
//!
//! [store]
//! name = "rpc"
//! script = "_code.art"
//!
//! [defaults]
//! verbose = false
//! ```

mod builder;
mod discovery;
mod error;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use artrpc_utils::Layout;
use camino::Utf8PathBuf;

pub use artrpc_utils::paths::{DEFAULT_SCRIPT_NAME, DEFAULT_STORE_NAME, HOME_ENV};
pub use builder::ConfigBuilder;
pub use discovery::CliOverrides;
pub use error::ConfigError;

/// Environment variable naming the interpreter executable.
pub const EXECUTABLE_ENV: &str = "ARTRPC_EXECUTABLE";
/// Environment variable overriding the run deadline, in whole seconds.
pub const TIMEOUT_ENV: &str = "ARTRPC_TIMEOUT_SECS";
/// Deadline applied to every interpreter invocation unless configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
/// Longest accepted run deadline: one day.
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Where an effective configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Default,
    ConfigFile(Utf8PathBuf),
    Env,
    Cli,
    Programmatic,
}

impl ConfigSource {
    /// Stable lowercase label for status output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::ConfigFile(_) => "config",
            Self::Env => "env",
            Self::Cli => "cli",
            Self::Programmatic => "programmatic",
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Effective configuration for one orchestrator.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory holding stores, the scratch script and the lock file.
    pub home: Utf8PathBuf,
    /// Interpreter to run; `None` means probe `PATH` for `arturo`.
    pub executable: Option<PathBuf>,
    pub store_name: String,
    pub script_name: String,
    pub timeout: Duration,
    pub verbose: bool,
    /// Source of each key, keyed by the names used in `config.toml`.
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Config {
    /// Paths derived from the home, store name and script name.
    #[must_use]
    pub fn layout(&self) -> Layout {
        Layout::new(self.home.clone(), &self.store_name, &self.script_name)
    }

    #[must_use]
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.source_attribution
            .get(key)
            .cloned()
            .unwrap_or(ConfigSource::Default)
    }

    /// Effective values as `(key, value, source label)` rows, for display.
    #[must_use]
    pub fn effective_config(&self) -> Vec<(String, String, &'static str)> {
        let executable = self
            .executable
            .as_ref()
            .map_or_else(|| "<search PATH>".to_string(), |p| p.display().to_string());

        [
            ("home", self.home.to_string()),
            ("executable", executable),
            ("store", self.store_name.clone()),
            ("script", self.script_name.clone()),
            ("timeout_secs", self.timeout.as_secs().to_string()),
            ("verbose", self.verbose.to_string()),
        ]
        .into_iter()
        .map(|(key, value)| {
            let label = self
                .source_attribution
                .get(key)
                .map_or("default", ConfigSource::label);
            (key.to_string(), value, label)
        })
        .collect()
    }

    /// Reject values that would break the run loop or escape the home.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.timeout > Duration::from_secs(MAX_TIMEOUT_SECS) {
            return Err(ConfigError::InvalidValue {
                key: "timeout_secs".to_string(),
                reason: format!("must be at most {MAX_TIMEOUT_SECS} seconds"),
            });
        }

        artrpc_template::validate_store_name(&self.store_name).map_err(|e| {
            ConfigError::InvalidValue {
                key: "store".to_string(),
                reason: e.to_string(),
            }
        })?;

        let script = self.script_name.as_str();
        if script.is_empty()
            || script == "."
            || script == ".."
            || script.contains(['/', '\\'])
        {
            return Err(ConfigError::InvalidValue {
                key: "script".to_string(),
                reason: format!("'{script}' must be a plain file name inside the home directory"),
            });
        }

        if let Some(exe) = &self.executable
            && exe.as_os_str().is_empty()
        {
            return Err(ConfigError::InvalidValue {
                key: "executable".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config::builder().home("/tmp/artrpc-home").build().unwrap()
    }

    #[test]
    fn test_layout_uses_names() {
        let config = Config::builder()
            .home("/h")
            .store_name("worker")
            .script_name("_worker.art")
            .build()
            .unwrap();

        let layout = config.layout();
        assert_eq!(layout.store_path, Utf8PathBuf::from("/h/stores/worker.json"));
        assert_eq!(layout.script_path, Utf8PathBuf::from("/h/_worker.art"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = sample();
        config.timeout = Duration::ZERO;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "timeout_secs"));
    }

    #[test]
    fn test_oversized_timeout_rejected() {
        let mut config = sample();
        config.timeout = Duration::from_secs(MAX_TIMEOUT_SECS);
        assert!(config.validate().is_ok());

        config.timeout = Duration::from_secs(u64::MAX);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "timeout_secs"));
    }

    #[test]
    fn test_bad_store_name_rejected() {
        let mut config = sample();
        config.store_name = "../escape".to_string();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "store"));
    }

    #[test]
    fn test_script_name_must_be_plain() {
        for bad in ["", ".", "..", "dir/x.art", "dir\\x.art"] {
            let mut config = sample();
            config.script_name = bad.to_string();
            assert!(config.validate().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_effective_config_labels() {
        let config = Config::builder()
            .home("/h")
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        let effective = config.effective_config();
        let timeout = effective.iter().find(|(k, _, _)| k == "timeout_secs").unwrap();
        assert_eq!(timeout.1, "10");
        assert_eq!(timeout.2, "programmatic");

        let exe = effective.iter().find(|(k, _, _)| k == "executable").unwrap();
        assert_eq!(exe.1, "<search PATH>");
        assert_eq!(exe.2, "default");
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(ConfigSource::Default.label(), "default");
        assert_eq!(ConfigSource::ConfigFile("/x/config.toml".into()).to_string(), "config");
        assert_eq!(ConfigSource::Env.label(), "env");
        assert_eq!(ConfigSource::Cli.label(), "cli");
    }
}
