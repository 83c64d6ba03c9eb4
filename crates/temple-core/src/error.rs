//! Error types for Temple Core.

use thiserror::Error;

/// Result type alias for Temple operations.
pub type Result<T> = std::result::Result<T, TempleError>;

/// Main error type for template loading.
///
/// Every variant is fatal for the load that produced it: no partial output
/// is ever returned alongside an error.
#[derive(Debug, Error)]
pub enum TempleError {
    /// A template (root or import) could not be found by the source.
    #[error("Template '{0}' not found")]
    MissingResource(String),

    /// A variable marker has no binding and undefined variables are not skipped.
    #[error("No binding for variable '{0}'")]
    UnresolvedBinding(String),

    /// An import chain refers back to a template that is still being resolved.
    #[error("Import cycle detected: {}", .0.join(" -> "))]
    ImportCycle(Vec<String>),

    /// A variable's value expands, directly or through other values, back
    /// into a marker for the same variable.
    #[error("Binding cycle detected: {}", .0.join(" -> "))]
    BindingCycle(Vec<String>),

    /// Import nesting went deeper than the configured limit.
    #[error("Import depth limit of {0} exceeded")]
    DepthExceeded(usize),

    /// Reading a template failed for a reason other than it being absent.
    #[error("IO error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
