//! Configuration types and loading
//!
//! The config file comes from `--config`, else `CONFIG_PATH`, else
//! `cv-advisor.toml` when present; without one the built-in defaults apply.
//! Settings themselves are never overridden from the environment. API keys are
//! read only from the GEMINI_API_KEY_1..4 env vars, never from the TOML.

use key_pool::ApiKey;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "cv-advisor.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub dispatch: DispatchConfig,
    pub advisor: AdvisorConfig,
    /// Populated from the environment after parsing.
    #[serde(skip)]
    pub api_keys: Vec<ApiKey>,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub max_connections: usize,
    /// Largest accepted request body (PDF uploads included)
    pub max_body_bytes: usize,
}

/// Upstream generative API settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Key rotation settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Pause between a quota failure and the next key
    pub backoff_ms: u64,
}

/// Prompt settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Language the feedback is written in
    pub language: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_connections: 256,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: provider::DEFAULT_BASE_URL.to_string(),
            model: provider::DEFAULT_MODEL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            backoff_ms: key_pool::DEFAULT_BACKOFF.as_millis() as u64,
        }
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            language: "Vietnamese".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, validate it, then read API keys
    /// from the environment.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.finish()
    }

    /// Built-in defaults plus API keys from the environment.
    pub fn defaults() -> common::Result<Self> {
        Config::default().finish()
    }

    fn finish(mut self) -> common::Result<Self> {
        self.validate()?;
        self.api_keys = key_pool::load_from_env();
        Ok(self)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.gemini.base_url.starts_with("http://")
            && !self.gemini.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "gemini.base_url must start with http:// or https://, got: {}",
                self.gemini.base_url
            )));
        }

        if self.gemini.model.trim().is_empty() {
            return Err(common::Error::Config(
                "gemini.model must not be empty".into(),
            ));
        }

        if self.gemini.timeout_secs == 0 {
            return Err(common::Error::Config(
                "gemini.timeout_secs must be greater than 0".into(),
            ));
        }

        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "server.max_connections must be greater than 0".into(),
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(common::Error::Config(
                "server.max_body_bytes must be greater than 0".into(),
            ));
        }

        if self.advisor.language.trim().is_empty() {
            return Err(common::Error::Config(
                "advisor.language must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Resolve the config file from the CLI arg, then CONFIG_PATH, then
    /// `DEFAULT_CONFIG_PATH` if it exists. `None` means run on defaults.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return Some(PathBuf::from(p));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        default.exists().then_some(default)
    }
}
