//! Default failure classification for Gemini API responses
//!
//! Quota and rate-limit signals rotate to the next key; credential rejections
//! and everything else abort the rotation. Gemini reports an invalid key as a
//! 400 with "API key not valid", so message patterns are checked alongside the
//! status code.

use provider::{ErrorClassification, UpstreamFailure};

/// Message fragments (lowercase) that signal per-key quota exhaustion.
const QUOTA_PATTERNS: &[&str] = &["resource_exhausted", "quota", "rate limit"];

/// Message fragments (lowercase) that signal a rejected credential.
const CREDENTIAL_PATTERNS: &[&str] = &["api key", "api_key_invalid", "permission_denied"];

/// Classify one upstream failure.
///
/// - 429, or a quota/rate-limit message → `QuotaExceeded`
/// - 401/403, or an API key/permission message → `InvalidCredential`
/// - anything else, including transport errors → `RequestFailed`
///
/// Quota is checked first: a 429 that happens to mention the key is still a
/// quota signal.
pub fn classify_failure(failure: &UpstreamFailure) -> ErrorClassification {
    let lower = failure.message.to_lowercase();

    if failure.status == Some(429) || QUOTA_PATTERNS.iter().any(|p| lower.contains(p)) {
        return ErrorClassification::QuotaExceeded;
    }

    if matches!(failure.status, Some(401 | 403))
        || CREDENTIAL_PATTERNS.iter().any(|p| lower.contains(p))
    {
        return ErrorClassification::InvalidCredential;
    }

    ErrorClassification::RequestFailed
}
