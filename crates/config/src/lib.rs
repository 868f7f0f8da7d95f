//! Configuration loading, validation, and management for ContentCrew.
//!
//! Loads configuration from `~/.contentcrew/config.toml`, then a project
//! `.env` file, then environment variable overrides. Validates all settings
//! at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.contentcrew/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model provider: "gemini" or "anthropic"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name sent to the provider
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Root directory for run output
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub gemini: ProviderConfig,

    #[serde(default)]
    pub anthropic: ProviderConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-3-pro".into()
}
fn default_max_tokens() -> u32 {
    16384
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("output_dir", &self.output_dir)
            .field("gemini", &self.gemini)
            .field("anthropic", &self.anthropic)
            .field("agent", &self.agent)
            .field("search", &self.search)
            .field("dashboard", &self.dashboard)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// How the QA step decides that a review passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassMarker {
    /// The last `QA Status:` line must read `PASSED`
    #[default]
    StatusLine,
    /// `PASSED` anywhere in the review, in any case
    Anywhere,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Provider round trips allowed per tool-use conversation
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,

    /// Reviews allowed per article before it is flagged
    #[serde(default = "default_max_qa_attempts")]
    pub max_qa_attempts: u32,

    #[serde(default)]
    pub pass_marker: PassMarker,
}

fn default_max_tool_rounds() -> u32 {
    10
}
fn default_max_qa_attempts() -> u32 {
    3
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            max_qa_attempts: default_max_qa_attempts(),
            pass_marker: PassMarker::default(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_num_results")]
    pub num_results: u32,

    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

fn default_search_endpoint() -> String {
    "https://google.serper.dev/search".into()
}
fn default_num_results() -> u32 {
    10
}
fn default_search_timeout() -> u64 {
    30
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_search_endpoint(),
            num_results: default_num_results(),
            timeout_secs: default_search_timeout(),
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &redact(&self.api_key))
            .field("endpoint", &self.endpoint)
            .field("num_results", &self.num_results)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8501
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.contentcrew/config.toml).
    ///
    /// A `.env` file in the working directory is loaded first, then these
    /// environment variables override the file:
    /// - `GEMINI_API_KEY`, `ANTHROPIC_API_KEY`, `SERPER_API_KEY`
    /// - `MODEL` (a `gemini/` prefix is dropped), `GEMINI_API_BASE`
    /// - `CONTENTCREW_PROVIDER`, `CONTENTCREW_OUTPUT_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenv::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }

        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()));
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.model = normalize_model(&config.model);

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.gemini.api_key = Some(key);
        }
        if let Some(url) = lookup("GEMINI_API_BASE") {
            self.gemini.api_url = Some(url);
        }
        if let Some(key) = lookup("ANTHROPIC_API_KEY") {
            self.anthropic.api_key = Some(key);
        }
        if let Some(key) = lookup("SERPER_API_KEY") {
            self.search.api_key = Some(key);
        }
        if let Some(provider) = lookup("CONTENTCREW_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = lookup("MODEL") {
            self.model = normalize_model(&model);
        }
        if let Some(dir) = lookup("CONTENTCREW_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".contentcrew")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.provider.as_str(), "gemini" | "anthropic") {
            return Err(ConfigError::ValidationError(format!(
                "unknown provider '{}', expected 'gemini' or 'anthropic'",
                self.provider
            )));
        }

        if self.agent.max_tool_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_rounds must be at least 1".into(),
            ));
        }

        if self.agent.max_qa_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_qa_attempts must be at least 1".into(),
            ));
        }

        if self.search.num_results == 0 {
            return Err(ConfigError::ValidationError(
                "search.num_results must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// API key for the configured provider.
    pub fn provider_api_key(&self) -> Option<&str> {
        match self.provider.as_str() {
            "anthropic" => self.anthropic.api_key.as_deref(),
            _ => self.gemini.api_key.as_deref(),
        }
    }

    /// Fail unless both the provider key and the search key are present.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.provider_api_key().is_none() {
            let var = match self.provider.as_str() {
                "anthropic" => "ANTHROPIC_API_KEY",
                _ => "GEMINI_API_KEY",
            };
            return Err(ConfigError::MissingCredential(var.into()));
        }
        if self.search.api_key.is_none() {
            return Err(ConfigError::MissingCredential("SERPER_API_KEY".into()));
        }
        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            output_dir: default_output_dir(),
            gemini: ProviderConfig::default(),
            anthropic: ProviderConfig::default(),
            agent: AgentConfig::default(),
            search: SearchConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

/// LiteLLM-style names carry a `gemini/` routing prefix; the API does not.
fn normalize_model(model: &str) -> String {
    model.trim().trim_start_matches("gemini/").to_string()
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("{0} not set. Add it to your environment or a .env file.")]
    MissingCredential(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "gemini");
        assert_eq!(config.model, "gemini-3-pro");
        assert_eq!(config.max_tokens, 16384);
        assert_eq!(config.agent.max_tool_rounds, 10);
        assert_eq!(config.agent.max_qa_attempts, 3);
        assert_eq!(config.search.num_results, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider, config.provider);
        assert_eq!(parsed.dashboard.port, config.dashboard.port);
    }

    #[test]
    fn zero_qa_attempts_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_qa_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_provider_rejected() {
        let config = AppConfig {
            provider: "openrouter".into(),
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("openrouter"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.provider, "gemini");
    }

    #[test]
    fn load_from_file_strips_model_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "model = \"gemini/gemini-2.5-flash\"\n[agent]\nmax_qa_attempts = 2\npass_marker = \"anywhere\"\n",
        )
        .unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.agent.max_qa_attempts, 2);
        assert_eq!(config.agent.pass_marker, PassMarker::Anywhere);
        assert_eq!(config.agent.max_tool_rounds, 10);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "model = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("GEMINI_API_KEY", "g-key"),
            ("SERPER_API_KEY", "s-key"),
            ("MODEL", "gemini/gemini-3-flash"),
            ("GEMINI_API_BASE", "http://localhost:9999"),
            ("CONTENTCREW_OUTPUT_DIR", "/tmp/out"),
        ]));
        assert_eq!(config.gemini.api_key.as_deref(), Some("g-key"));
        assert_eq!(config.gemini.api_url.as_deref(), Some("http://localhost:9999"));
        assert_eq!(config.search.api_key.as_deref(), Some("s-key"));
        assert_eq!(config.model, "gemini-3-flash");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert!(config.require_credentials().is_ok());
    }

    #[test]
    fn missing_credentials_name_the_variable() {
        let mut config = AppConfig::default();
        let err = config.require_credentials().unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        config.apply_env(env(&[("GEMINI_API_KEY", "g")]));
        let err = config.require_credentials().unwrap_err();
        assert!(err.to_string().contains("SERPER_API_KEY"));

        config.provider = "anthropic".into();
        let err = config.require_credentials().unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("GEMINI_API_KEY", "super-secret"), ("SERPER_API_KEY", "also-secret")]));
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("also-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gemini-3-pro"));
        assert!(toml_str.contains("8501"));
    }
}
