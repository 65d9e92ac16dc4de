//! Key-rotating dispatcher for generative-content API calls
//!
//! Holds a fixed pool of API keys read at startup and sends each prompt through
//! them round-robin, one attempt per key at most. The rotation cursor lives on
//! the `Dispatcher` and advances once per attempt, success or not, so
//! independent calls spread load over the whole pool.
//!
//! Call lifecycle:
//! 1. Caller hands a prompt to `Dispatcher::dispatch`
//! 2. Empty pool → `Error::Configuration` before any network call
//! 3. Key at the cursor is selected, cursor advances, provider is called
//! 4. Non-empty text → returned immediately
//! 5. Quota signal or empty text → wait the fixed backoff, try the next key
//! 6. Any other failure → `Error::Fatal`, remaining keys untouched
//! 7. Every key retryable-failed → `Error::PoolExhausted` with the last failure

pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod quota;

pub use credentials::{ApiKey, CREDENTIAL_ENV_VARS, load_from_env, load_with};
pub use dispatcher::{Classifier, DEFAULT_BACKOFF, Dispatcher};
pub use error::{Error, ErrorKind, Result};
pub use quota::classify_failure;
