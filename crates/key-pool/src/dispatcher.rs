//! Round-robin dispatch with per-attempt key rotation
//!
//! The dispatcher owns the key pool and the rotation cursor. A call starts at
//! the key under the cursor and then walks the pool in order from there, one
//! key per attempt. The cursor advances once per attempt, before the call is
//! made, even when the call fails fatally. Attempts within one call are
//! sequential; the cursor advance is atomic so concurrent callers sharing one
//! `Arc<Dispatcher>` still rotate fairly and never repeat a key within a call.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use provider::{ErrorClassification, Provider, UpstreamFailure};
use tracing::{debug, info, warn};

use crate::credentials::ApiKey;
use crate::error::{Error, Result};

/// Pause between a retryable failure and the next key.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Failure classification policy: a pure function of the raw failure signal.
pub type Classifier = Arc<dyn Fn(&UpstreamFailure) -> ErrorClassification + Send + Sync>;

/// Key-rotating front for a single `Provider`.
pub struct Dispatcher {
    keys: Vec<ApiKey>,
    cursor: AtomicUsize,
    provider: Arc<dyn Provider>,
    classifier: Classifier,
    backoff: Duration,
}

impl Dispatcher {
    /// Create a dispatcher over `keys` with the default classifier and backoff.
    ///
    /// An empty `keys` is accepted; every `dispatch` then fails with
    /// `Error::Configuration`.
    pub fn new(keys: Vec<ApiKey>, provider: Arc<dyn Provider>) -> Self {
        if keys.is_empty() {
            warn!(provider = provider.id(), "dispatcher created with no API keys");
        } else {
            info!(provider = provider.id(), keys = keys.len(), "dispatcher initialized");
        }
        Self {
            keys,
            cursor: AtomicUsize::new(0),
            provider,
            classifier: Arc::new(crate::quota::classify_failure),
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&UpstreamFailure) -> ErrorClassification + Send + Sync + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Index of the key the next attempt will use.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    pub fn keys(&self) -> &[ApiKey] {
        &self.keys
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Take the index under the cursor and advance the cursor (mod pool size).
    /// Must not be called on an empty pool.
    fn next_index(&self) -> usize {
        let n = self.keys.len();
        // The closure never returns None, so both arms carry the previous value.
        match self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| Some((c + 1) % n))
        {
            Ok(previous) | Err(previous) => previous,
        }
    }

    /// Send `payload` upstream, rotating through the pool on retryable failures.
    ///
    /// Makes at most one attempt per key. Returns the first non-empty text, or
    /// the first fatal failure, or `PoolExhausted` with the last retryable
    /// failure once every key has been tried.
    pub async fn dispatch(&self, payload: &str) -> Result<String> {
        if self.keys.is_empty() {
            record_failure("configuration");
            return Err(Error::Configuration);
        }
        if payload.trim().is_empty() {
            return Err(Error::EmptyPayload);
        }

        let attempts = self.len();
        let mut last_failure: Option<(ErrorClassification, String)> = None;
        let mut start = 0;

        for attempt in 1..=attempts {
            // Keys are walked from this call's first slot; other callers may
            // move the cursor between attempts.
            let taken = self.next_index();
            if attempt == 1 {
                start = taken;
            }
            let key = &self.keys[(start + attempt - 1) % attempts];
            debug!(attempt, attempts, key = key.label(), "dispatching prompt");

            let (classification, status, message) =
                match self.provider.generate(key.expose(), payload).await {
                    Ok(text) if !text.trim().is_empty() => {
                        record_attempt("success");
                        info!(attempt, key = key.label(), "upstream call succeeded");
                        return Ok(text);
                    }
                    Ok(_) => (
                        ErrorClassification::EmptyResponse,
                        None,
                        "upstream returned no text".to_string(),
                    ),
                    Err(failure) => {
                        let classification = (self.classifier)(&failure);
                        (classification, failure.status, failure.to_string())
                    }
                };
            record_attempt(classification.label());

            if !classification.is_retryable() {
                warn!(
                    attempt,
                    key = key.label(),
                    %classification,
                    error = %message,
                    "fatal upstream failure, not trying remaining keys"
                );
                record_failure(classification.label());
                return Err(Error::Fatal {
                    classification,
                    status,
                    message,
                });
            }

            warn!(
                attempt,
                attempts,
                key = key.label(),
                %classification,
                error = %message,
                "retryable upstream failure"
            );
            last_failure = Some((classification, message));

            if attempt < attempts {
                tokio::time::sleep(self.backoff).await;
            }
        }

        let (classification, message) = last_failure.unwrap_or((
            ErrorClassification::EmptyResponse,
            "no attempt recorded".to_string(),
        ));
        warn!(attempts, %classification, "all API keys exhausted");
        record_failure("pool_exhausted");
        Err(Error::PoolExhausted {
            attempts,
            classification,
            message,
        })
    }

    /// Pool summary for the health endpoint. Never includes key material.
    pub fn health(&self) -> serde_json::Value {
        let labels: Vec<&str> = self.keys.iter().map(ApiKey::label).collect();
        serde_json::json!({
            "provider": self.provider.id(),
            "credentials": self.keys.len(),
            "cursor": self.cursor(),
            "labels": labels,
        })
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("keys", &self.keys)
            .field("cursor", &self.cursor())
            .field("provider", &self.provider.id())
            .field("backoff", &self.backoff)
            .finish()
    }
}

fn record_attempt(outcome: &'static str) {
    metrics::counter!("dispatch_attempts_total", "outcome" => outcome).increment(1);
}

fn record_failure(classification: &'static str) {
    metrics::counter!("dispatch_failures_total", "classification" => classification).increment(1);
}
