//! `--check-keys`: probe every configured key once, in order
//!
//! Unlike dispatch there is no rotation and no stop on the first failure; the
//! point is to find out which keys are usable before deploying.

use std::time::Duration;

use key_pool::{Dispatcher, classify_failure};
use provider::ErrorClassification;
use tracing::{info, warn};

/// Prompt sent with each key.
pub const PROBE_PROMPT: &str = "Say hello in one word";

/// Pause between probes so the check itself does not trip rate limits.
pub const PAUSE_BETWEEN_KEYS: Duration = Duration::from_secs(2);

/// Outcome of probing one key.
#[derive(Debug)]
pub struct KeyCheck {
    pub label: String,
    pub hint: String,
    pub result: Result<String, (ErrorClassification, String)>,
}

impl KeyCheck {
    pub fn works(&self) -> bool {
        self.result.is_ok()
    }
}

/// Probe each key of `dispatcher` once, pausing `pause` between probes.
pub async fn check_keys(dispatcher: &Dispatcher, pause: Duration) -> Vec<KeyCheck> {
    let keys = dispatcher.keys();
    let mut checks = Vec::with_capacity(keys.len());

    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(pause).await;
        }
        let result = match dispatcher.provider().generate(key.expose(), PROBE_PROMPT).await {
            Ok(text) => {
                info!(key = key.label(), "key works");
                Ok(text.trim().to_string())
            }
            Err(failure) => {
                let classification = classify_failure(&failure);
                warn!(key = key.label(), %classification, error = %failure, "key failed");
                Err((classification, failure.to_string()))
            }
        };
        checks.push(KeyCheck {
            label: key.label().to_string(),
            hint: key.hint(),
            result,
        });
    }
    checks
}

/// Human-readable report of a check run.
pub fn summary(checks: &[KeyCheck]) -> String {
    let total = checks.len();
    let working: Vec<&KeyCheck> = checks.iter().filter(|c| c.works()).collect();
    let failed: Vec<&KeyCheck> = checks.iter().filter(|c| !c.works()).collect();

    let mut out = String::new();
    out.push_str(&format!("Working keys: {}/{total}\n", working.len()));
    for check in &working {
        let reply = check.result.as_ref().map(String::as_str).unwrap_or_default();
        out.push_str(&format!("  {} ({}): {reply}\n", check.label, check.hint));
    }
    out.push_str(&format!("Failed keys: {}/{total}\n", failed.len()));
    for check in &failed {
        if let Err((classification, message)) = &check.result {
            out.push_str(&format!(
                "  {} ({}): [{classification}] {message}\n",
                check.label, check.hint
            ));
        }
    }

    if total == 0 {
        out.push_str("No keys configured. Set GEMINI_API_KEY_1 to GEMINI_API_KEY_4.\n");
    } else if working.is_empty() {
        out.push_str("No working keys found. Check that the keys are copied correctly, the Gemini API is enabled, and the free-tier quota is not used up.\n");
    } else if !failed.is_empty() {
        out.push_str("Some keys are not working. Consider replacing them.\n");
    } else {
        out.push_str("All keys are working.\n");
    }
    out
}

/// Process exit code: success when at least one key works.
pub fn exit_code(checks: &[KeyCheck]) -> i32 {
    if checks.iter().any(KeyCheck::works) { 0 } else { 1 }
}
