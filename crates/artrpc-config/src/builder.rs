use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use artrpc_utils::paths::default_home;
use camino::Utf8PathBuf;

use super::{
    Config, ConfigError, ConfigSource, DEFAULT_SCRIPT_NAME, DEFAULT_STORE_NAME,
    DEFAULT_TIMEOUT_SECS,
};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Nothing is read from the environment or from `config.toml`; unset
    /// values fall back to built-in defaults.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use artrpc_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .home("/srv/arturo")
    ///     .executable("/usr/local/bin/arturo")
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .expect("valid config");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Fluent construction of a [`Config`].
///
/// Values set here are attributed to [`ConfigSource::Programmatic`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    home: Option<Utf8PathBuf>,
    executable: Option<PathBuf>,
    store_name: Option<String>,
    script_name: Option<String>,
    timeout: Option<Duration>,
    verbose: Option<bool>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Home directory. Defaults to `~/.arturo`.
    #[must_use]
    pub fn home(mut self, home: impl Into<Utf8PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Explicit interpreter path; skips the `PATH` probe.
    #[must_use]
    pub fn executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    #[must_use]
    pub fn store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn script_name(mut self, name: impl Into<String>) -> Self {
        self.script_name = Some(name.into());
        self
    }

    /// Deadline for each interpreter invocation. Default: 300 seconds.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Apply defaults for unset values and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or a value
    /// fails [`Config::validate`].
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut source_attribution = HashMap::new();
        let mut pick = |key: &str, set: bool| {
            let source = if set {
                ConfigSource::Programmatic
            } else {
                ConfigSource::Default
            };
            source_attribution.insert(key.to_string(), source);
        };

        pick("home", self.home.is_some());
        pick("executable", self.executable.is_some());
        pick("store", self.store_name.is_some());
        pick("script", self.script_name.is_some());
        pick("timeout_secs", self.timeout.is_some());
        pick("verbose", self.verbose.is_some());

        let home = match self.home {
            Some(home) => home,
            None => default_home()?,
        };

        let config = Config {
            home,
            executable: self.executable,
            store_name: self
                .store_name
                .unwrap_or_else(|| DEFAULT_STORE_NAME.to_string()),
            script_name: self
                .script_name
                .unwrap_or_else(|| DEFAULT_SCRIPT_NAME.to_string()),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            verbose: self.verbose.unwrap_or(false),
            source_attribution,
        };

        config.validate()?;
        Ok(config)
    }
}
