//! Error types for the cloud adapters

use rigger_core::ActorError;

/// REST transport/protocol failure
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// Connection-level failure (DNS, TLS, timeouts)
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status code
        status: u16,
        /// Response body, truncated for logging
        body: String,
    },

    /// Body did not decode as expected
    #[error("decode error: {0}")]
    Decode(String),
}

impl RestError {
    /// Whether a retry might succeed (connection failures, 429, 5xx)
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) => false,
        }
    }

    /// Response status, when one was received
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Main cloud adapter error type
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    /// Underlying REST failure
    #[error(transparent)]
    Rest(#[from] RestError),

    /// Required credentials absent from the environment
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// Response decoded but lacked expected fields
    #[error("malformed response: {0}")]
    Malformed(String),

    /// A remote task reported failure
    #[error("task failed: {0}")]
    TaskFailed(String),
}

impl CloudError {
    /// Whether a retry might succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rest(e) if e.is_retryable())
    }

    /// Response status, when one was received
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rest(e) => e.status(),
            _ => None,
        }
    }
}

impl From<CloudError> for ActorError {
    fn from(err: CloudError) -> Self {
        match &err {
            CloudError::MissingCredentials(msg) => ActorError::InvalidCredentials(msg.clone()),
            _ if err.is_retryable() => ActorError::Recoverable(err.to_string()),
            _ => ActorError::Unrecoverable(err.to_string()),
        }
    }
}
