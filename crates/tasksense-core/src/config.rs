//! Provider configuration.
//!
//! Resolved once at startup: defaults, then an optional TOML file, then
//! environment variables. Services receive an immutable copy.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{AiError, AiResult};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Settings shared by every AI capability.
#[derive(Clone, Serialize)]
pub struct AiConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub estimation_max_tokens: u32,
    pub estimation_temperature: f64,
    pub request_timeout_secs: u64,
    /// Use the deterministic mock backends. Always true without a key.
    pub use_mock: bool,
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("estimation_max_tokens", &self.estimation_max_tokens)
            .field("estimation_temperature", &self.estimation_temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("use_mock", &self.use_mock)
            .finish()
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 500,
            temperature: 0.7,
            estimation_max_tokens: 400,
            estimation_temperature: 0.3,
            request_timeout_secs: 30,
            use_mock: true,
        }
    }
}

/// On-disk form; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
    estimation_max_tokens: Option<u32>,
    estimation_temperature: Option<f64>,
    request_timeout_secs: Option<u64>,
    use_mock: Option<bool>,
}

impl AiConfig {
    /// Load from an optional TOML file plus the process environment.
    pub fn load(path: Option<&Path>) -> AiResult<Self> {
        let mut config = Self {
            use_mock: false,
            ..Self::default()
        };

        if let Some(path) = path {
            let content = std::fs::read_to_string(path).map_err(|e| {
                AiError::Configuration(format!("cannot read {}: {}", path.display(), e))
            })?;
            config.merge_toml(&content)?;
            debug!(path = %path.display(), "loaded AI configuration file");
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config.resolved())
    }

    /// Deterministic mock configuration.
    pub fn mock() -> Self {
        Self::default()
    }

    /// Hosted-model configuration against `base_url`.
    pub fn hosted(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: base_url.into(),
            use_mock: false,
            ..Self::default()
        }
    }

    /// Force the mock backends regardless of credentials.
    pub fn force_mock(mut self) -> Self {
        self.use_mock = true;
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    fn merge_toml(&mut self, content: &str) -> AiResult<()> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| AiError::Configuration(format!("invalid config file: {}", e)))?;

        if file.api_key.is_some() {
            self.api_key = file.api_key;
        }
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.model {
            self.model = v;
        }
        if let Some(v) = file.max_tokens {
            self.max_tokens = v;
        }
        if let Some(v) = file.temperature {
            self.temperature = v;
        }
        if let Some(v) = file.estimation_max_tokens {
            self.estimation_max_tokens = v;
        }
        if let Some(v) = file.estimation_temperature {
            self.estimation_temperature = v;
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = file.use_mock {
            self.use_mock = v;
        }
        Ok(())
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> AiResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = lookup("OPENAI_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("OPENAI_MODEL") {
            self.model = v;
        }
        if let Some(v) = lookup("OPENAI_MAX_TOKENS") {
            self.max_tokens = parse_var("OPENAI_MAX_TOKENS", &v)?;
        }
        if let Some(v) = lookup("OPENAI_TEMPERATURE") {
            self.temperature = parse_var("OPENAI_TEMPERATURE", &v)?;
        }
        if let Some(v) = lookup("ESTIMATION_MAX_TOKENS") {
            self.estimation_max_tokens = parse_var("ESTIMATION_MAX_TOKENS", &v)?;
        }
        if let Some(v) = lookup("ESTIMATION_TEMPERATURE") {
            self.estimation_temperature = parse_var("ESTIMATION_TEMPERATURE", &v)?;
        }
        if let Some(v) = lookup("AI_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_var("AI_REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("USE_MOCK_AI") {
            self.use_mock = parse_flag(&v);
        }
        Ok(())
    }

    /// Finalize: mock mode whenever no usable key exists.
    pub fn resolved(mut self) -> Self {
        if !self.has_api_key() {
            self.use_mock = true;
        }
        info!(model = %self.model, mock = self.use_mock, "AI configuration resolved");
        self
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> AiResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AiError::Configuration(format!("{} has an invalid value: '{}'", name, value)))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
