//! Error types with fix suggestions (v0.1)

use std::time::Duration;

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Which side of a binding a mapping belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Graph outputs feeding component props
    Outputs,
    /// Component callbacks feeding graph inputs
    Inputs,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Outputs => f.write_str("outputs"),
            Side::Inputs => f.write_str("inputs"),
        }
    }
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Graph accessor errors (SC-010 to SC-012)
    // ─────────────────────────────────────────────────────────────

    #[error("SC-010: Signal '{name}' is not defined in the graph")]
    UnknownSignal { name: String },

    #[error("SC-011: '{name}' has no writable input (not a primary signal)")]
    UnknownInput { name: String },

    #[error("SC-012: Cannot feed '{input}' from '{output}': {reason}")]
    LinkFailed {
        input: String,
        output: String,
        reason: String,
    },

    // ─────────────────────────────────────────────────────────────
    // Mapping errors (SC-020 to SC-021)
    // ─────────────────────────────────────────────────────────────

    #[error("SC-020: {side} table references unknown names: {}", names.join(", "))]
    UnknownNames { side: Side, names: Vec<String> },

    #[error("SC-021: {side} mapping must be a name table or absent, found {found}")]
    InvalidMappingShape { side: Side, found: String },

    // ─────────────────────────────────────────────────────────────
    // Graph definition errors (SC-030 to SC-035)
    // ─────────────────────────────────────────────────────────────

    #[error("SC-030: Signal '{name}' is defined more than once")]
    DuplicateSignal { name: String },

    #[error("SC-031: '{name}' depends on '{dependency}' which is not defined before it")]
    MissingDependency { name: String, dependency: String },

    #[error("SC-032: Dependency '{name}' is not of the requested type")]
    DependencyType { name: String },

    #[error("SC-033: Initial value given for unknown signal '{name}'")]
    UnknownInitialValue { name: String },

    #[error("SC-034: Invalid signal name '{name}'")]
    InvalidSignalName { name: String },

    #[error("SC-035: Signal graph requires a tokio runtime")]
    NoRuntime,

    // ─────────────────────────────────────────────────────────────
    // Binding file / component errors (SC-040 to SC-043)
    // ─────────────────────────────────────────────────────────────

    #[error("SC-040: Invalid schema: expected '{expected}', got '{found}'")]
    InvalidSchema { expected: String, found: String },

    #[error("SC-041: Unknown graph '{name}'")]
    UnknownGraph { name: String },

    #[error("SC-042: Timed out after {0:?} waiting for props")]
    Timeout(Duration),

    #[error("SC-043: Own props must be a JSON object, got {found}")]
    InvalidOwnProps { found: String },
}

impl FixSuggestion for ConnectError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ConnectError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            ConnectError::Json(_) => Some("Check the value matches the expected shape"),
            ConnectError::Io(_) => Some("Check file path and permissions"),
            ConnectError::UnknownSignal { .. } => {
                Some("Use a primary or derived signal name declared in the graph builder")
            }
            ConnectError::UnknownInput { .. } => {
                Some("Only primary signals accept writes; derived signals are read-only")
            }
            ConnectError::LinkFailed { .. } => {
                Some("Link an existing output of the source graph to a primary signal")
            }
            ConnectError::UnknownNames { .. } => {
                Some("Every table value must name a signal (outputs) or primary signal (inputs)")
            }
            ConnectError::InvalidMappingShape { .. } => {
                Some("Use a map of prop name to signal name, or omit the side entirely")
            }
            ConnectError::DuplicateSignal { .. } => Some("Give each signal a unique name"),
            ConnectError::MissingDependency { .. } => {
                Some("Define dependencies before the derived signal that uses them")
            }
            ConnectError::DependencyType { .. } => {
                Some("Request the dependency with the same type it was registered with")
            }
            ConnectError::UnknownInitialValue { .. } => {
                Some("Only initialize signals that the builder defines")
            }
            ConnectError::InvalidSignalName { .. } => {
                Some("Use letters, digits and underscores, optionally ending in '$'")
            }
            ConnectError::NoRuntime => Some("Call build() from inside a tokio runtime"),
            ConnectError::InvalidSchema { .. } => {
                Some("Set schema: signal-connect/bindings@0.1 at the top of the file")
            }
            ConnectError::UnknownGraph { .. } => Some("Use one of: login, auth-resource"),
            ConnectError::Timeout(_) => Some("Check that the graph emits the awaited value"),
            ConnectError::InvalidOwnProps { .. } => {
                Some("Pass own props as a JSON object, e.g. {\"override\": true}")
            }
        }
    }
}
