//! The shared store document and the host-side run metadata merged into it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key given to signals written without an explicit `.key:` attribute.
pub const DEFAULT_SIGNAL_KEY: &str = "message";

/// Separator between a signal's key and its body.
pub const SIGNAL_SEPARATOR: &str = "->";

/// The store document shared between the host and the interpreter.
///
/// `signals` and `vars` belong to the interpreter; `output`, `error` and
/// `error_code` are written by the host after a run. Every other key is kept
/// in `extra` and written back untouched. Absent fields stay absent on
/// serialization, so a document never gains keys by passing through here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Store {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One parsed entry of the `signals` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub key: String,
    pub body: String,
}

impl Signal {
    /// Split on the first `->`. Entries without one get the default key.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(SIGNAL_SEPARATOR) {
            Some((key, body)) => Self {
                key: key.to_string(),
                body: body.to_string(),
            },
            None => Self {
                key: DEFAULT_SIGNAL_KEY.to_string(),
                body: raw.to_string(),
            },
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{SIGNAL_SEPARATOR}{}", self.key, self.body)
    }
}

/// Result fields of the most recent run, as the host records them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunMetadata {
    pub output: Option<String>,
    pub error: Option<String>,
    pub error_code: Option<i32>,
}

impl RunMetadata {
    #[must_use]
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>, error_code: Option<i32>) -> Self {
        Self {
            error: Some(error.into()),
            error_code,
            ..Self::default()
        }
    }
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store with both channels initialised.
    #[must_use]
    pub fn with_channels() -> Self {
        let mut store = Self::default();
        store.ensure_channels();
        store
    }

    /// Create `signals` and `vars` only if they are absent.
    ///
    /// Mirrors the `unless key?` guards at the top of every generated script.
    pub fn ensure_channels(&mut self) {
        self.signals.get_or_insert_with(Vec::new);
        self.vars.get_or_insert_with(Map::new);
    }

    /// Parsed signals, in the order they were appended.
    #[must_use]
    pub fn signals(&self) -> Vec<Signal> {
        self.signals
            .iter()
            .flatten()
            .map(|raw| Signal::parse(raw))
            .collect()
    }

    #[must_use]
    pub fn var(&self, key: &str) -> Option<&Value> {
        self.vars.as_ref().and_then(|vars| vars.get(key))
    }

    /// Set a var in memory; nothing reaches disk until a commit.
    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.vars
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
    }

    /// Drop `output`, `error` and `error_code`.
    pub fn clear_run_result(&mut self) {
        self.output = None;
        self.error = None;
        self.error_code = None;
    }

    /// Replace the transient fields with `meta`, leaving everything else alone.
    pub fn apply_run_metadata(&mut self, meta: &RunMetadata) {
        self.clear_run_result();
        self.output.clone_from(&meta.output);
        self.error.clone_from(&meta.error);
        self.error_code = meta.error_code;
    }

    #[must_use]
    pub fn run_metadata(&self) -> RunMetadata {
        RunMetadata {
            output: self.output.clone(),
            error: self.error.clone(),
            error_code: self.error_code,
        }
    }

    /// The document as a plain JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}
