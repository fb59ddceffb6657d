use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use artrpc_utils::paths::{CONFIG_FILE_NAME, default_home};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use tracing::debug;

use super::{
    Config, ConfigError, ConfigSource, DEFAULT_SCRIPT_NAME, DEFAULT_STORE_NAME,
    DEFAULT_TIMEOUT_SECS, EXECUTABLE_ENV, HOME_ENV, TIMEOUT_ENV,
};

/// Values supplied on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Explicit config file; replaces `<home>/config.toml`, and must exist.
    pub config_path: Option<Utf8PathBuf>,
    pub home: Option<Utf8PathBuf>,
    pub executable: Option<PathBuf>,
    pub store_name: Option<String>,
    pub script_name: Option<String>,
    pub timeout_secs: Option<u64>,
    pub verbose: Option<bool>,
}

/// `config.toml` structure
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    #[serde(default)]
    runner: RunnerSection,
    #[serde(default)]
    store: StoreSection,
    #[serde(default)]
    defaults: DefaultsSection,
}

#[derive(Debug, Default, Deserialize)]
struct RunnerSection {
    executable: Option<PathBuf>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StoreSection {
    name: Option<String>,
    script: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DefaultsSection {
    verbose: Option<bool>,
}

/// One layer's worth of candidate values.
#[derive(Default)]
struct Layer {
    executable: Option<PathBuf>,
    store_name: Option<String>,
    script_name: Option<String>,
    timeout_secs: Option<u64>,
    verbose: Option<bool>,
}

impl From<TomlConfig> for Layer {
    fn from(file: TomlConfig) -> Self {
        Self {
            executable: file.runner.executable,
            store_name: file.store.name,
            script_name: file.store.script,
            timeout_secs: file.runner.timeout_secs,
            verbose: file.defaults.verbose,
        }
    }
}

impl Config {
    /// Discover configuration with precedence: CLI > env > config file > defaults.
    pub fn discover(cli: &CliOverrides) -> Result<Self, ConfigError> {
        Self::discover_with_env(cli, |key| std::env::var(key).ok())
    }

    /// Same as [`discover`](Self::discover) with an injected environment
    /// lookup, so tests need not touch the process environment.
    pub fn discover_with_env(
        cli: &CliOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut source_attribution = HashMap::new();

        let (home, home_source) = match (&cli.home, env(HOME_ENV)) {
            (Some(home), _) => (home.clone(), ConfigSource::Cli),
            (None, Some(home)) if !home.is_empty() => (Utf8PathBuf::from(home), ConfigSource::Env),
            _ => (default_home()?, ConfigSource::Default),
        };
        source_attribution.insert("home".to_string(), home_source);

        let (file_layer, file_source) = match &cli.config_path {
            Some(path) => (Layer::from(load_config_file(path)?), Some(path.clone())),
            None => {
                let path = home.join(CONFIG_FILE_NAME);
                match load_config_file(&path) {
                    Ok(file) => (Layer::from(file), Some(path)),
                    Err(ConfigError::Read { source, .. })
                        if source.kind() == io::ErrorKind::NotFound =>
                    {
                        (Layer::default(), None)
                    }
                    Err(e) => return Err(e),
                }
            }
        };
        if let Some(path) = &file_source {
            debug!(path = %path, "Loaded config file");
        }

        let env_layer = Layer {
            executable: env(EXECUTABLE_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            timeout_secs: env(TIMEOUT_ENV)
                .map(|raw| parse_timeout(TIMEOUT_ENV, &raw))
                .transpose()?,
            ..Layer::default()
        };

        let cli_layer = Layer {
            executable: cli.executable.clone(),
            store_name: cli.store_name.clone(),
            script_name: cli.script_name.clone(),
            timeout_secs: cli.timeout_secs,
            verbose: cli.verbose,
        };

        let file_source = file_source.map(ConfigSource::ConfigFile);
        let layers = [
            (cli_layer, Some(ConfigSource::Cli)),
            (env_layer, Some(ConfigSource::Env)),
            (file_layer, file_source),
        ];

        let mut resolve = |key: &str, get: &dyn Fn(&Layer) -> bool| {
            let source = layers
                .iter()
                .find(|(layer, source)| source.is_some() && get(layer))
                .and_then(|(_, source)| source.clone())
                .unwrap_or(ConfigSource::Default);
            source_attribution.insert(key.to_string(), source);
        };
        resolve("executable", &|l| l.executable.is_some());
        resolve("store", &|l| l.store_name.is_some());
        resolve("script", &|l| l.script_name.is_some());
        resolve("timeout_secs", &|l| l.timeout_secs.is_some());
        resolve("verbose", &|l| l.verbose.is_some());

        let [(cli_layer, _), (env_layer, _), (file_layer, _)] = layers;
        let timeout_secs = cli_layer
            .timeout_secs
            .or(env_layer.timeout_secs)
            .or(file_layer.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let config = Self {
            home,
            executable: cli_layer
                .executable
                .or(env_layer.executable)
                .or(file_layer.executable),
            store_name: cli_layer
                .store_name
                .or(file_layer.store_name)
                .unwrap_or_else(|| DEFAULT_STORE_NAME.to_string()),
            script_name: cli_layer
                .script_name
                .or(file_layer.script_name)
                .unwrap_or_else(|| DEFAULT_SCRIPT_NAME.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            verbose: cli_layer
                .verbose
                .or(file_layer.verbose)
                .unwrap_or(false),
            source_attribution,
        };

        config.validate()?;
        Ok(config)
    }
}

fn load_config_file(path: &Utf8Path) -> Result<TomlConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })
}

fn parse_timeout(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("'{raw}' is not a whole number of seconds: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn temp_home() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let home = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, home)
    }

    fn cli_with_home(home: &Utf8Path) -> CliOverrides {
        CliOverrides {
            home: Some(home.to_owned()),
            ..CliOverrides::default()
        }
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let (_dir, home) = temp_home();

        let config = Config::discover_with_env(&cli_with_home(&home), no_env).unwrap();

        assert_eq!(config.home, home);
        assert_eq!(config.executable, None);
        assert_eq!(config.store_name, DEFAULT_STORE_NAME);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.source_of("home"), ConfigSource::Cli);
        assert_eq!(config.source_of("timeout_secs"), ConfigSource::Default);
    }

    #[test]
    fn test_home_config_file_is_read() {
        let (_dir, home) = temp_home();
        fs::write(
            home.join(CONFIG_FILE_NAME),
            "[runner]\nexecutable = \"/opt/arturo\"\ntimeout_secs = 12\n\n[store]\nname = \"jobs\"\n\n[defaults]\nverbose = true\n",
        )
        .unwrap();

        let config = Config::discover_with_env(&cli_with_home(&home), no_env).unwrap();

        assert_eq!(config.executable, Some(PathBuf::from("/opt/arturo")));
        assert_eq!(config.timeout, Duration::from_secs(12));
        assert_eq!(config.store_name, "jobs");
        assert!(config.verbose);
        assert_eq!(
            config.source_of("store"),
            ConfigSource::ConfigFile(home.join(CONFIG_FILE_NAME))
        );
    }

    #[test]
    fn test_env_overrides_file_and_cli_overrides_env() {
        let (_dir, home) = temp_home();
        fs::write(home.join(CONFIG_FILE_NAME), "[runner]\ntimeout_secs = 12\n").unwrap();
        let env = |key: &str| match key {
            TIMEOUT_ENV => Some("40".to_string()),
            EXECUTABLE_ENV => Some("/env/arturo".to_string()),
            _ => None,
        };

        let config = Config::discover_with_env(&cli_with_home(&home), env).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(40));
        assert_eq!(config.source_of("timeout_secs"), ConfigSource::Env);

        let cli = CliOverrides {
            timeout_secs: Some(5),
            executable: Some(PathBuf::from("/cli/arturo")),
            ..cli_with_home(&home)
        };
        let config = Config::discover_with_env(&cli, env).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.executable, Some(PathBuf::from("/cli/arturo")));
        assert_eq!(config.source_of("executable"), ConfigSource::Cli);
    }

    #[test]
    fn test_home_from_env() {
        let (_dir, home) = temp_home();
        let env_home = home.to_string();
        let env = move |key: &str| (key == HOME_ENV).then(|| env_home.clone());

        let config = Config::discover_with_env(&CliOverrides::default(), env).unwrap();

        assert_eq!(config.home, home);
        assert_eq!(config.source_of("home"), ConfigSource::Env);
    }

    #[test]
    fn test_explicit_config_path_must_exist() {
        let (_dir, home) = temp_home();
        let cli = CliOverrides {
            config_path: Some(home.join("missing.toml")),
            ..cli_with_home(&home)
        };

        let err = Config::discover_with_env(&cli, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_config_file() {
        let (_dir, home) = temp_home();
        fs::write(home.join(CONFIG_FILE_NAME), "[runner\ntimeout_secs = ").unwrap();

        let err = Config::discover_with_env(&cli_with_home(&home), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_bad_timeout_env() {
        let (_dir, home) = temp_home();
        let env = |key: &str| (key == TIMEOUT_ENV).then(|| "soon".to_string());

        let err = Config::discover_with_env(&cli_with_home(&home), env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == TIMEOUT_ENV));
    }

    #[test]
    fn test_zero_timeout_from_file_rejected() {
        let (_dir, home) = temp_home();
        fs::write(home.join(CONFIG_FILE_NAME), "[runner]\ntimeout_secs = 0\n").unwrap();

        let err = Config::discover_with_env(&cli_with_home(&home), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
