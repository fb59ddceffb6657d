//! Script templating for artrpc
//!
//! Every script handed to the interpreter starts with a fixed preamble that
//! binds the shared store, makes sure its `signals` and `vars` channels exist,
//! and defines the `signal`, `setv` and `getv` helpers. Caller code follows
//! verbatim. Rendering is a pure function of the store name and the code.

use thiserror::Error;

pub use artrpc_utils::paths::DEFAULT_STORE_NAME;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error(
        "Invalid store name '{name}': use only ASCII letters, digits, '-' and '_' (at least one character)"
    )]
    InvalidStoreName { name: String },
}

/// Builds interpreter scripts bound to one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTemplate {
    store_name: String,
}

impl Default for ScriptTemplate {
    fn default() -> Self {
        Self {
            store_name: DEFAULT_STORE_NAME.to_string(),
        }
    }
}

impl ScriptTemplate {
    /// # Errors
    ///
    /// Returns [`TemplateError::InvalidStoreName`] if the name could not be
    /// embedded in a string literal as-is.
    pub fn new(store_name: impl Into<String>) -> Result<Self, TemplateError> {
        let store_name = store_name.into();
        validate_store_name(&store_name)?;
        Ok(Self { store_name })
    }

    #[must_use]
    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    /// The preamble alone. Ends with a `; Code` marker line and a newline.
    #[must_use]
    pub fn preamble(&self) -> String {
        PREAMBLE.replace(STORE_PLACEHOLDER, &self.store_name)
    }

    /// Preamble followed by `code`, unmodified.
    #[must_use]
    pub fn render(&self, code: &str) -> String {
        let mut script = self.preamble();
        script.push_str(code);
        script
    }
}

/// Store names end up inside an Arturo string literal and a file name.
pub fn validate_store_name(name: &str) -> Result<(), TemplateError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(TemplateError::InvalidStoreName {
            name: name.to_string(),
        })
    }
}

const STORE_PLACEHOLDER: &str = "{{store}}";

const PREAMBLE: &str = r#"
; Template

; Persistent store shared with the host
rpc: store.global.json.deferred "{{store}}"

; Create the channels only when they are missing
unless key? to :dictionary rpc 'signals [
    rpc\signals: []
]

unless key? to :dictionary rpc 'vars [
    rpc\vars: #[]
]


; Helpers

signal: function [body][
    key: attr 'key
    if key = null [
        key: "message"
    ]
    rpc\signals: rpc\signals ++ ~"|key|->|body|"
]

setv: function [key v][
    rpc\vars\[key]: v
]

getv: function [key][
    unless key? rpc\vars key [
        panic ~"getv: no such var |key|"
    ]
    return rpc\vars\[key]
]

; Code
"#;
