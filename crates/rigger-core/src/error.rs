//! Error types for the actor boundary
//!
//! Every actor reports failure through [`ActorError`]. The split
//! between recoverable and unrecoverable failures is what the retry
//! wrapper and the group actors key off.

/// Failure of a single child actor inside a group
#[derive(Debug)]
pub struct ChildFailure {
    /// Registry name of the failed child
    pub kind: String,
    /// Script description of the failed child
    pub desc: String,
    /// The child's error
    pub error: ActorError,
}

impl std::fmt::Display for ChildFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.desc, self.error)
    }
}

/// Main actor error type
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    /// Option block failed validation
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Required credentials missing or rejected
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Transient failure, safe to retry
    #[error("recoverable failure: {0}")]
    Recoverable(String),

    /// Permanent failure, never retried
    #[error("unrecoverable failure: {0}")]
    Unrecoverable(String),

    /// Execution exceeded the actor's timeout
    #[error("actor timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// One or more children of a group actor failed
    #[error("{} of {total} child actors failed", .failures.len())]
    GroupFailed {
        /// Total children the group ran
        total: usize,
        /// The children that failed
        failures: Vec<ChildFailure>,
    },

    /// Nested script loading failed (macro actors)
    #[error("macro failed: {0}")]
    MacroFailed(String),
}

impl ActorError {
    /// Whether the retry wrapper may re-attempt this failure
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Recoverable(_))
    }

    /// Flatten group failures into individual lines for logging
    #[must_use]
    pub fn detail_lines(&self) -> Vec<String> {
        match self {
            Self::GroupFailed { failures, .. } => {
                failures.iter().map(|f| f.to_string()).collect()
            }
            other => vec![other.to_string()],
        }
    }
}
