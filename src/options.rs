use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// How a binder produces bound nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BindMode {
    /// Each `bind` clones the populated template into a new, independent node.
    #[default]
    CookieCutter,
    /// The template node itself is populated, reset and repopulated.
    InPlace,
}

/// Diagnostic switches. They only control warnings and never change binding
/// semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BindOptions {
    /// Warn when a data getter degrades to an empty value, or when an event
    /// binding selector finds no node in a bound instance.
    pub bind_warnings: bool,
    /// Warn about questionable but accepted binding specifications.
    pub compile_warnings: bool,
}

impl BindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_warnings(mut self, enabled: bool) -> Self {
        self.bind_warnings = enabled;
        self
    }

    pub fn with_compile_warnings(mut self, enabled: bool) -> Self {
        self.compile_warnings = enabled;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

lazy_static::lazy_static! {
    static ref BINDING_DEFAULTS: RwLock<BindOptions> = RwLock::new(BindOptions::default());
}

/// Process-wide options used by binders built without explicit options.
/// Binders snapshot the defaults at construction.
pub fn binding_defaults() -> BindOptions {
    match BINDING_DEFAULTS.read() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

pub fn set_binding_defaults(options: BindOptions) {
    match BINDING_DEFAULTS.write() {
        Ok(mut guard) => *guard = options,
        Err(poisoned) => *poisoned.into_inner() = options,
    }
}
