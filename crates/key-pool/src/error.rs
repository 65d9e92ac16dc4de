//! Terminal dispatch failures

use provider::ErrorClassification;

/// Terminal outcome of a failed `dispatch` call.
///
/// Retryable failures (quota, empty text) never surface on their own: they
/// either lead to a later success or are folded into `PoolExhausted`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no API keys configured")]
    Configuration,

    #[error("prompt must not be empty")]
    EmptyPayload,

    #[error("upstream call failed ({classification}): {message}")]
    Fatal {
        classification: ErrorClassification,
        status: Option<u16>,
        message: String,
    },

    #[error("all {attempts} API keys exhausted; last error ({classification}): {message}")]
    PoolExhausted {
        attempts: usize,
        classification: ErrorClassification,
        message: String,
    },
}

/// Machine-readable failure tag for callers that branch on the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    EmptyPayload,
    Fatal,
    PoolExhausted,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration => ErrorKind::Configuration,
            Error::EmptyPayload => ErrorKind::EmptyPayload,
            Error::Fatal { .. } => ErrorKind::Fatal,
            Error::PoolExhausted { .. } => ErrorKind::PoolExhausted,
        }
    }

    /// Classification of the upstream failure behind this error, if any.
    pub fn classification(&self) -> Option<ErrorClassification> {
        match self {
            Error::Fatal { classification, .. } | Error::PoolExhausted { classification, .. } => {
                Some(*classification)
            }
            Error::Configuration | Error::EmptyPayload => None,
        }
    }

    /// Stable label for metrics and API error bodies.
    pub fn label(&self) -> &'static str {
        match self {
            Error::Configuration => "configuration",
            Error::EmptyPayload => "empty_payload",
            Error::Fatal { classification, .. } => classification.label(),
            Error::PoolExhausted { .. } => "pool_exhausted",
        }
    }
}

/// Result alias for dispatch operations.
pub type Result<T> = std::result::Result<T, Error>;
