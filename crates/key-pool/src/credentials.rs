//! API key pool loading
//!
//! Keys come from a fixed set of environment variables, never from config
//! files. Unset or blank variables are skipped; the resulting pool may be
//! empty, which the dispatcher reports as a configuration error per call
//! rather than failing startup.

use std::fmt;

use common::Secret;

/// Environment variables scanned for API keys, in rotation order.
pub const CREDENTIAL_ENV_VARS: [&str; 4] = [
    "GEMINI_API_KEY_1",
    "GEMINI_API_KEY_2",
    "GEMINI_API_KEY_3",
    "GEMINI_API_KEY_4",
];

/// One pool entry: a redacted key plus a label safe to log.
#[derive(Clone)]
pub struct ApiKey {
    label: String,
    secret: Secret<String>,
}

impl ApiKey {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            secret: Secret::new(value.into()),
        }
    }

    /// Name used in logs and metrics (the env var the key came from).
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn expose(&self) -> &str {
        self.secret.expose()
    }

    /// Redacted tail of the key for operator output.
    pub fn hint(&self) -> String {
        self.secret.hint()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("label", &self.label)
            .field("secret", &self.secret)
            .finish()
    }
}

/// Read the pool from the process environment.
pub fn load_from_env() -> Vec<ApiKey> {
    load_with(|name| std::env::var(name).ok())
}

/// Read the pool through `lookup`, keeping `CREDENTIAL_ENV_VARS` order.
pub fn load_with<F>(lookup: F) -> Vec<ApiKey>
where
    F: Fn(&str) -> Option<String>,
{
    CREDENTIAL_ENV_VARS
        .iter()
        .filter_map(|name| {
            let value = lookup(name)?;
            let value = value.trim();
            if value.is_empty() {
                None
            } else {
                Some(ApiKey::new(*name, value))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn loads_keys_in_env_var_order() {
        let keys = load_with(lookup_from(&[
            ("GEMINI_API_KEY_3", "key-three"),
            ("GEMINI_API_KEY_1", "key-one"),
        ]));

        let labels: Vec<&str> = keys.iter().map(ApiKey::label).collect();
        assert_eq!(labels, vec!["GEMINI_API_KEY_1", "GEMINI_API_KEY_3"]);
        assert_eq!(keys[0].expose(), "key-one");
        assert_eq!(keys[1].expose(), "key-three");
    }

    #[test]
    fn blank_values_are_dropped_and_values_trimmed() {
        let keys = load_with(lookup_from(&[
            ("GEMINI_API_KEY_1", "   "),
            ("GEMINI_API_KEY_2", ""),
            ("GEMINI_API_KEY_4", "  key-four\n"),
        ]));

        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].label(), "GEMINI_API_KEY_4");
        assert_eq!(keys[0].expose(), "key-four");
    }

    #[test]
    fn no_variables_yields_empty_pool() {
        let keys = load_with(|_| None);
        assert!(keys.is_empty());
    }

    #[test]
    fn debug_never_shows_key_material() {
        let key = ApiKey::new("GEMINI_API_KEY_1", "AIzaSy-super-secret");
        let debug = format!("{key:?}");
        assert!(debug.contains("GEMINI_API_KEY_1"));
        assert!(!debug.contains("super-secret"), "got: {debug}");
    }
}
