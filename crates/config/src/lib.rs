//! Configuration loading and validation for toolchat.
//!
//! Settings come from three places, later ones winning:
//!
//! 1. serde defaults,
//! 2. an optional `toolchat.toml`,
//! 3. the process environment (after `.env` has been loaded).
//!
//! The model id and temperature are only checked for presence here. The
//! temperature is kept as text and handed to the model client unparsed.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the model id.
pub const ENV_MODEL: &str = "OPENAI_API_MODEL";
/// Environment variable holding the sampling temperature.
pub const ENV_TEMPERATURE: &str = "OPENAI_API_TEMPERATURE";
/// Environment variable holding the provider API key.
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable holding the provider base URL.
pub const ENV_API_BASE: &str = "OPENAI_API_BASE";
/// Environment variable overriding the bind host.
pub const ENV_HOST: &str = "TOOLCHAT_HOST";
/// Environment variable overriding the bind port.
pub const ENV_PORT: &str = "TOOLCHAT_PORT";

/// Tool names available to `tools.enabled`.
pub const TOOL_DDG_SEARCH: &str = "ddg-search";
pub const TOOL_WIKIPEDIA: &str = "wikipedia";

/// The root configuration structure.
///
/// Maps directly to `toolchat.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature, as written by the user
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub temperature: Option<String>,

    /// Provider API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// HTTP server settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Tool selection and tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".into()
}

/// Accepts `temperature = 0.7` as well as `temperature = "0.7"`.
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<TextOrNumber>::deserialize(deserializer)?.map(|v| match v {
        TextOrNumber::Text(s) => s,
        TextOrNumber::Int(i) => i.to_string(),
        TextOrNumber::Float(f) => f.to_string(),
    }))
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("api_key", &redact(&self.api_key))
            .field("api_base", &self.api_base)
            .field("gateway", &self.gateway)
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds without a request before a session is dropped; 0 keeps
    /// sessions until they are deleted
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8501
}
fn default_session_idle_secs() -> u64 {
    3600
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model round-trips per agent run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// System message placed before the remembered history
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_max_iterations() -> usize {
    15
}
fn default_system_prompt() -> String {
    "You are a helpful AI assistant.".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            system_prompt: default_system_prompt(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Tool names to load, resolved once at agent construction
    #[serde(default = "default_enabled_tools")]
    pub enabled: Vec<String>,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub wikipedia: WikipediaConfig,
}

fn default_enabled_tools() -> Vec<String> {
    vec![TOOL_DDG_SEARCH.into(), TOOL_WIKIPEDIA.into()]
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_tools(),
            search: SearchConfig::default(),
            wikipedia: WikipediaConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_url")]
    pub base_url: String,

    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_search_url() -> String {
    "https://html.duckduckgo.com/html/".into()
}
fn default_max_results() -> usize {
    4
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_url(),
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikipediaConfig {
    /// Language edition, e.g. "en" or "ja"
    #[serde(default = "default_lang")]
    pub lang: String,

    #[serde(default = "default_top_k")]
    pub top_k_results: usize,

    #[serde(default = "default_chars_max")]
    pub doc_content_chars_max: usize,
}

fn default_lang() -> String {
    "en".into()
}
fn default_top_k() -> usize {
    3
}
fn default_chars_max() -> usize {
    4000
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            top_k_results: default_top_k(),
            doc_content_chars_max: default_chars_max(),
        }
    }
}

/// The immutable model settings a session is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub model: String,
    /// Raw temperature text; parsing belongs to the model client
    pub temperature: String,
}

impl AppConfig {
    /// Load configuration: `.env`, then the config file, then the environment.
    ///
    /// A missing config file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path (no environment).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Default config file location: `./toolchat.toml`.
    pub fn default_path() -> PathBuf {
        PathBuf::from("toolchat.toml")
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(ENV_MODEL) {
            self.model = Some(model);
        }
        if let Some(temperature) = lookup(ENV_TEMPERATURE) {
            self.temperature = Some(temperature);
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(base) = lookup(ENV_API_BASE) {
            self.api_base = base;
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.gateway.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.gateway.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("{ENV_PORT} must be a port number, got '{port}'"))
            })?;
        }
        Ok(())
    }

    /// Extract the model id and temperature every session needs.
    pub fn model_settings(&self) -> Result<ModelSettings, ConfigError> {
        let model = self
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| ConfigError::Missing(ENV_MODEL.into()))?;

        let temperature = self
            .temperature
            .clone()
            .ok_or_else(|| ConfigError::Missing(ENV_TEMPERATURE.into()))?;

        Ok(ModelSettings {
            model: model.to_string(),
            temperature,
        })
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.port == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.port must be non-zero".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.tools.search.max_results == 0 || self.tools.wikipedia.top_k_results == 0 {
            return Err(ConfigError::ValidationError(
                "tool result limits must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: None,
            temperature: None,
            api_key: None,
            api_base: default_api_base(),
            gateway: GatewayConfig::default(),
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("{0} is not set")]
    Missing(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.port, 8501);
        assert_eq!(config.tools.enabled, vec!["ddg-search", "wikipedia"]);
        assert_eq!(config.agent.max_iterations, 15);
        assert_eq!(config.gateway.session_idle_secs, 3600);
    }

    #[test]
    fn env_overrides_model_and_temperature() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                (ENV_MODEL, "gpt-4o-mini"),
                (ENV_TEMPERATURE, "0.5"),
                (ENV_API_KEY, "sk-test"),
            ]))
            .unwrap();

        let settings = config.model_settings().unwrap();
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.temperature, "0.5");
        assert!(config.has_api_key());
    }

    #[test]
    fn missing_model_is_a_config_error() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[(ENV_TEMPERATURE, "0")])).unwrap();
        let err = config.model_settings().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref key) if key == ENV_MODEL));
    }

    #[test]
    fn blank_model_is_a_config_error() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[(ENV_MODEL, "   "), (ENV_TEMPERATURE, "0")]))
            .unwrap();
        assert!(config.model_settings().is_err());
    }

    #[test]
    fn missing_temperature_is_a_config_error() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[(ENV_MODEL, "gpt-4o")])).unwrap();
        let err = config.model_settings().unwrap_err();
        assert!(err.to_string().contains(ENV_TEMPERATURE));
    }

    #[test]
    fn non_numeric_temperature_passes_through() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[(ENV_MODEL, "gpt-4o"), (ENV_TEMPERATURE, "warm")]))
            .unwrap();
        assert_eq!(config.model_settings().unwrap().temperature, "warm");
    }

    #[test]
    fn bad_port_env_rejected() {
        let mut config = AppConfig::default();
        assert!(config.apply_env(env(&[(ENV_PORT, "http")])).is_err());
    }

    #[test]
    fn temperature_accepts_number_or_text_in_toml() {
        let numeric: AppConfig = toml::from_str("model = \"m\"\ntemperature = 0.25").unwrap();
        assert_eq!(numeric.temperature.as_deref(), Some("0.25"));

        let text: AppConfig = toml::from_str("temperature = \"0\"").unwrap();
        assert_eq!(text.temperature.as_deref(), Some("0"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/toolchat.toml")).unwrap();
        assert!(config.model.is_none());
        assert_eq!(config.api_base, "https://api.openai.com/v1");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toolchat.toml");
        std::fs::write(
            &path,
            r#"
model = "gpt-4o-mini"
temperature = 0

[gateway]
port = 9000

[tools]
enabled = ["wikipedia"]

[tools.wikipedia]
lang = "ja"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.tools.enabled, vec!["wikipedia"]);
        assert_eq!(config.tools.wikipedia.lang, "ja");
        assert_eq!(config.tools.wikipedia.top_k_results, 3);
        assert_eq!(config.model_settings().unwrap().temperature, "0");
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toolchat.toml");
        std::fs::write(&path, "gateway = 3").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn zero_iterations_rejected() {
        let config = AppConfig {
            agent: AgentConfig {
                max_iterations: 0,
                ..AgentConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("[REDACTED]"));
    }
}
