//! Generative-content provider abstraction
//!
//! Defines the `Provider` trait that decouples the key-rotating dispatcher from
//! the upstream text-generation API. A provider performs exactly one call with
//! exactly one API key; rotation, retry and backoff belong to the dispatcher.
//! `GeminiProvider` implements the trait against Google's `generateContent`
//! endpoint.

pub mod gemini;

pub use gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiProvider};

use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Classification of a failed (or empty) upstream call.
///
/// Drives the dispatcher's rotation loop:
/// - QuotaExceeded and EmptyResponse rotate to the next key after backoff
/// - InvalidCredential and RequestFailed abort the loop immediately
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClassification {
    /// Rate limit or quota signal for the key that was used
    QuotaExceeded,
    /// Call completed but carried no text
    EmptyResponse,
    /// Key rejected: invalid, expired or lacking permission
    InvalidCredential,
    /// Malformed request, unknown model, transport failure, anything else
    RequestFailed,
}

impl ErrorClassification {
    /// Whether another key may succeed where this one failed.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorClassification::QuotaExceeded | ErrorClassification::EmptyResponse
        )
    }

    /// Stable label for logs, metrics and API error bodies.
    pub fn label(self) -> &'static str {
        match self {
            ErrorClassification::QuotaExceeded => "quota_exceeded",
            ErrorClassification::EmptyResponse => "empty_response",
            ErrorClassification::InvalidCredential => "invalid_credential",
            ErrorClassification::RequestFailed => "request_failed",
        }
    }
}

impl fmt::Display for ErrorClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw failure signal from one upstream call.
///
/// `status` is `None` when no HTTP response was received (connect error,
/// timeout). `message` is the upstream's own error text when it sent one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl UpstreamFailure {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {status}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Errors constructing a provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("invalid provider configuration: {0}")]
    Config(String),
}

/// Result alias for provider construction.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Future returned by [`Provider::generate`].
pub type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<String, UpstreamFailure>> + Send + 'a>>;

/// A text-generation backend reachable with a single API key per call.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Provider>`).
pub trait Provider: Send + Sync {
    /// Identifier for logging (e.g. "gemini")
    fn id(&self) -> &str;

    /// Send `prompt` upstream authenticated with `api_key`.
    ///
    /// Returns the generated text, which may be empty. Never retries.
    fn generate<'a>(&'a self, api_key: &'a str, prompt: &'a str) -> GenerateFuture<'a>;
}
