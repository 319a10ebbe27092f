//! Compiler configuration
//!
//! Settings come from an optional TOML file, then environment variables. Every field has
//! a default, so an empty file (or none at all) is a valid configuration:
//!
//! ```toml
//! target = "python3"
//!
//! [generator]
//! model = "gpt-4o-mini"
//! temperature = 0.05
//!
//! [policy]
//! max_attempts = 3
//! max_concurrency = 4
//! ```

use crate::target::TargetLanguage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Environment variables consulted for the API key, in order
pub const API_KEY_VARS: [&str; 3] = ["CODEX_API_KEY", "OPENAI_API_KEY", "OPENAI_KEY"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no API key configured (set CODEX_API_KEY or OPENAI_API_KEY, or `api_key` under [generator])")]
    MissingApiKey,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub target: TargetLanguage,
    pub generator: GeneratorConfig,
    pub policy: GenerationPolicy,
}

/// Settings for the HTTP generation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.05,
            max_tokens: 256,
            timeout_secs: 60,
        }
    }
}

/// Retry, concurrency and caching policy for the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationPolicy {
    /// Attempts per fragment, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on every further retry
    pub backoff_ms: u64,
    /// Requests in flight at once
    pub max_concurrency: usize,
    /// Reuse results for identical requests
    pub cache: bool,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 250,
            max_concurrency: 4,
            cache: true,
        }
    }
}

impl CompilerConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file, falling back to defaults when `path` is `None`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = API_KEY_VARS.iter().find_map(|var| non_empty(var)) {
            self.generator.api_key = Some(key);
        }
        if let Some(url) = non_empty("CODEX_BASE_URL") {
            self.generator.base_url = url;
        }
        if let Some(model) = non_empty("CODEX_MODEL") {
            self.generator.model = model;
        }
    }

    /// Check ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.generator.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be between 0 and 1, got {}",
                self.generator.temperature
            )));
        }
        if self.policy.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.policy.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The API key, required by the HTTP backend
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.generator
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingApiKey)
    }
}
