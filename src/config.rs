//! Configuration management for modelscout
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Secrets (LLM API key, Telegram bot token) are never stored in the file;
//! the config names the environment variables that hold them.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub platforms: PlatformsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout() -> u64 {
    30
}

/// Completion service configuration
///
/// Points at a single OpenAI-compatible chat-completions endpoint. The same
/// endpoint serves classification, reply generation, and the recommendation
/// pipeline; per-call temperature and token limits are chosen by the caller.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// API base URL (must end with /v1 for OpenAI-compatible APIs)
    pub base_url: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Environment variable holding the bearer token
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Default sampling temperature for generated replies
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Default token budget for generated replies
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Bounded timeout around each completion call; a timeout is treated
    /// the same as any other completion failure
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_api_key_env() -> String {
    "MODELSCOUT_LLM_API_KEY".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    500
}

fn default_llm_timeout() -> u64 {
    30
}

/// Document store configuration
///
/// When `redis_url` is unset the service runs on the in-memory store,
/// which is suitable for tests and local development only.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    pub redis_url: Option<String>,
    /// TTL applied to session and final-model documents (seconds)
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: i64,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// JSON file of catalog entries, seeded into the in-memory store at
    /// startup (the Redis backend reads the deployment's seeded documents)
    #[serde(default)]
    pub catalog_file: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            session_ttl_seconds: default_session_ttl(),
            pool_size: default_pool_size(),
            catalog_file: None,
        }
    }
}

fn default_session_ttl() -> i64 {
    // 7 days, matching the upstream deployment
    604_800
}

fn default_pool_size() -> usize {
    16
}

/// Messaging platform configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlatformsConfig {
    /// WhatsApp allow-list: full numbers with country code ("91xxxxxxxxxx").
    /// Empty list means the WhatsApp webhook rejects everything.
    #[serde(default)]
    pub whatsapp_allowed: Vec<String>,
    /// Environment variable holding the Telegram bot token; unset token
    /// disables outbound Telegram delivery
    #[serde(default = "default_telegram_token_env")]
    pub telegram_token_env: String,
    /// Telegram Bot API base URL (override for tests)
    #[serde(default = "default_telegram_api_base")]
    pub telegram_api_base: String,
    /// Optional HTTP SMS gateway; when unset outbound SMS is logged only
    #[serde(default)]
    pub sms_gateway_url: Option<String>,
}

fn default_telegram_token_env() -> String {
    "MODELSCOUT_TELEGRAM_TOKEN".to_string()
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            AppError::Config(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string and validate it
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints that serde cannot express
    pub fn validate(&self) -> AppResult<()> {
        if self.llm.base_url.trim().is_empty() {
            return Err(AppError::Config("llm.base_url must not be empty".into()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(AppError::Config("llm.model must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AppError::Config(format!(
                "llm.temperature must be in 0.0..=2.0 (got {})",
                self.llm.temperature
            )));
        }
        if self.llm.max_tokens == 0 {
            return Err(AppError::Config("llm.max_tokens must be positive".into()));
        }
        if self.store.session_ttl_seconds <= 0 {
            return Err(AppError::Config(
                "store.session_ttl_seconds must be positive".into(),
            ));
        }
        for number in &self.platforms.whatsapp_allowed {
            if number.len() != 12 || !number.chars().all(|c| c.is_ascii_digit()) {
                return Err(AppError::Config(format!(
                    "platforms.whatsapp_allowed entries must be 12-digit numbers with country code (got {number:?})"
                )));
            }
        }
        Ok(())
    }

    /// Resolve the LLM API key from the configured environment variable
    ///
    /// A missing key is allowed: self-hosted OpenAI-compatible endpoints
    /// commonly run without authentication.
    pub fn llm_api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env).ok().filter(|k| !k.is_empty())
    }

    /// Resolve the Telegram bot token from the configured environment variable
    pub fn telegram_token(&self) -> Option<String> {
        std::env::var(&self.platforms.telegram_token_env)
            .ok()
            .filter(|t| !t.is_empty())
    }
}
