//! Error types for script loading

use crate::manifest::ManifestError;
use std::path::PathBuf;

/// Main script loading error type
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// File exists but has no content
    #[error("script {path} is empty")]
    Empty {
        /// Offending path
        path: PathBuf,
    },

    /// Tokens remained after substitution
    #[error("unresolved tokens: {}", .missing.join(", "))]
    UnresolvedTokens {
        /// Every token that could not be resolved, in order
        missing: Vec<String>,
    },

    /// Content is neither valid JSON nor valid YAML
    #[error("script does not parse as JSON or YAML: {0}")]
    Syntax(String),

    /// Schema validation failed
    #[error("schema validation failed:\n{}", .violations.join("\n"))]
    SchemaViolations {
        /// `pointer: message` lines, one per violation
        violations: Vec<String>,
    },

    /// Validated value did not deserialize into an actor tree
    #[error("invalid actor definition: {0}")]
    InvalidDefinition(String),

    /// Dependency manifest error
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}
