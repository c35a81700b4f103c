//! Configuration system (layered: code > env > config file).
//!
//! Configuration is an explicit value handed to the [`Runner`](crate::Runner)
//! at construction; nothing here is process-global.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BatonError;

/// Default turn limit per run.
pub const DEFAULT_MAX_TURNS: usize = 10;

const ENV_MAX_TURNS: &str = "BATON_MAX_TURNS";
const ENV_MODEL_TIMEOUT_MS: &str = "BATON_MODEL_TIMEOUT_MS";
const ENV_TOOL_TIMEOUT_MS: &str = "BATON_TOOL_TIMEOUT_MS";
const ENV_MAX_TOOL_CONCURRENCY: &str = "BATON_MAX_TOOL_CONCURRENCY";
const ENV_TRACE_SENSITIVE_DATA: &str = "BATON_TRACE_SENSITIVE_DATA";
const ENV_TRACING_DISABLED: &str = "BATON_TRACING_DISABLED";
const ENV_MODEL_BASE_URL: &str = "BATON_MODEL_BASE_URL";
const ENV_MODEL_API_KEY: &str = "BATON_MODEL_API_KEY";
const ENV_MODEL_REQUEST_TIMEOUT_MS: &str = "BATON_MODEL_REQUEST_TIMEOUT_MS";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Maximum model round trips per run.
    pub max_turns: usize,
    /// Abort a model call after this many milliseconds.
    pub model_timeout_ms: Option<u64>,
    /// Fail a single tool call after this many milliseconds.
    pub tool_timeout_ms: Option<u64>,
    /// Bound on tool calls executing at once within a turn.
    pub max_tool_concurrency: Option<usize>,
    /// Record tool arguments and outputs on tracing spans.
    pub trace_sensitive_data: bool,
    /// Skip per-run and per-tool spans entirely.
    pub tracing_disabled: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            model_timeout_ms: None,
            tool_timeout_ms: None,
            max_tool_concurrency: None,
            trace_sensitive_data: false,
            tracing_disabled: false,
        }
    }
}

impl RunnerConfig {
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_max_tool_concurrency(mut self, limit: usize) -> Self {
        self.max_tool_concurrency = Some(limit);
        self
    }

    pub fn model_timeout(&self) -> Option<Duration> {
        self.model_timeout_ms.map(Duration::from_millis)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_ms.map(Duration::from_millis)
    }

    /// Load from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, BatonError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, BatonError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| BatonError::Configuration(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BatonError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// `config.toml` in the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "baton", "baton")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Config file at [`default_path`](Self::default_path) if present,
    /// overlaid with environment variables.
    pub fn load() -> Result<Self, BatonError> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        let _ = dotenvy::dotenv();
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from a key lookup (environment by default).
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), BatonError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_MAX_TURNS) {
            self.max_turns = parse_env(ENV_MAX_TURNS, &v)?;
        }
        if let Some(v) = lookup(ENV_MODEL_TIMEOUT_MS) {
            self.model_timeout_ms = Some(parse_env(ENV_MODEL_TIMEOUT_MS, &v)?);
        }
        if let Some(v) = lookup(ENV_TOOL_TIMEOUT_MS) {
            self.tool_timeout_ms = Some(parse_env(ENV_TOOL_TIMEOUT_MS, &v)?);
        }
        if let Some(v) = lookup(ENV_MAX_TOOL_CONCURRENCY) {
            self.max_tool_concurrency = Some(parse_env(ENV_MAX_TOOL_CONCURRENCY, &v)?);
        }
        if let Some(v) = lookup(ENV_TRACE_SENSITIVE_DATA) {
            self.trace_sensitive_data = parse_flag(ENV_TRACE_SENSITIVE_DATA, &v)?;
        }
        if let Some(v) = lookup(ENV_TRACING_DISABLED) {
            self.tracing_disabled = parse_flag(ENV_TRACING_DISABLED, &v)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), BatonError> {
        if self.max_turns == 0 {
            return Err(BatonError::Configuration(
                "max_turns must be at least 1".into(),
            ));
        }
        if self.max_tool_concurrency == Some(0) {
            return Err(BatonError::Configuration(
                "max_tool_concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Settings for [`HttpModelProvider`](crate::provider::http::HttpModelProvider).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpProviderConfig {
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    120_000
}

impl HttpProviderConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn from_env() -> Result<Self, BatonError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, BatonError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_MODEL_BASE_URL).ok_or_else(|| {
            BatonError::Configuration(format!("Missing {ENV_MODEL_BASE_URL}"))
        })?;
        let mut config = Self::new(base_url);
        config.api_key = lookup(ENV_MODEL_API_KEY).filter(|k| !k.trim().is_empty());
        if let Some(v) = lookup(ENV_MODEL_REQUEST_TIMEOUT_MS) {
            config.request_timeout_ms = parse_env(ENV_MODEL_REQUEST_TIMEOUT_MS, &v)?;
        }
        Ok(config)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, BatonError> {
    value
        .trim()
        .parse()
        .map_err(|_| BatonError::Configuration(format!("{key}: invalid value '{value}'")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, BatonError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(BatonError::Configuration(format!(
            "{key}: invalid flag '{value}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overlays_defaults() {
        let mut config = RunnerConfig::default();
        config
            .apply_env_with(lookup(&[
                ("BATON_MAX_TURNS", "3"),
                ("BATON_TOOL_TIMEOUT_MS", "250"),
                ("BATON_TRACE_SENSITIVE_DATA", "true"),
            ]))
            .unwrap();

        assert_eq!(config.max_turns, 3);
        assert_eq!(config.tool_timeout(), Some(Duration::from_millis(250)));
        assert!(config.trace_sensitive_data);
        assert_eq!(config.model_timeout_ms, None);
    }

    #[test]
    fn invalid_env_value_is_a_configuration_error() {
        let mut config = RunnerConfig::default();
        let err = config
            .apply_env_with(lookup(&[("BATON_MAX_TURNS", "many")]))
            .unwrap_err();
        assert!(matches!(err, BatonError::Configuration(_)));
    }

    #[test]
    fn zero_turns_rejected() {
        let err = RunnerConfig::from_toml_str("max_turns = 0").unwrap_err();
        assert!(err.to_string().contains("max_turns"));
    }

    #[test]
    fn http_config_requires_base_url() {
        assert!(HttpProviderConfig::from_lookup(lookup(&[])).is_err());
        let config = HttpProviderConfig::from_lookup(lookup(&[
            ("BATON_MODEL_BASE_URL", "http://localhost:9"),
            ("BATON_MODEL_API_KEY", " "),
        ]))
        .unwrap();
        assert_eq!(config.api_key, None);
        assert_eq!(config.request_timeout_ms, 120_000);
    }
}
