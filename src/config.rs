//! Configuration and settings management
//!
//! Loads settings from configuration files and environment variables and defines
//! the limits shared by the bot, the upstream clients and the liveness monitor.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Default chat-completions endpoint (DeepInfra, OpenAI-compatible)
pub const DEEPINFRA_API_URL: &str = "https://api.deepinfra.com/v1/openai/chat/completions";
/// Default text-to-image endpoint (Stability AI, SDXL 1.0)
pub const STABILITY_TEXT_TO_IMAGE_URL: &str =
    "https://api.stability.ai/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image";
/// Default model used for chat and translation
pub const DEFAULT_TEXT_MODEL: &str = "meta-llama/Meta-Llama-3-8B-Instruct";

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token (required)
    #[serde(default)]
    pub telegram_token: String,

    /// API key for the text-completion upstream
    pub deepinfra_api_key: Option<String>,
    /// API key for the image-generation upstream
    pub stability_api_key: Option<String>,

    /// Chat-completions endpoint
    #[serde(default = "default_text_api_url")]
    pub text_api_url: String,
    /// Text-to-image endpoint
    #[serde(default = "default_image_api_url")]
    pub image_api_url: String,
    /// Model identifier sent to the text upstream
    #[serde(default = "default_text_model")]
    pub text_model: String,
}

fn default_text_api_url() -> String {
    DEEPINFRA_API_URL.to_string()
}

fn default_image_api_url() -> String {
    STABILITY_TEXT_TO_IMAGE_URL.to_string()
}

fn default_text_model() -> String {
    DEFAULT_TEXT_MODEL.to_string()
}

/// Builds the layered configuration source shared by all settings loaders.
///
/// # Errors
///
/// Returns a `ConfigError` if a present configuration file cannot be parsed.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Local overrides, never checked in
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Plain UPPER_SNAKE_CASE variables map onto snake_case keys;
        // empty values count as unset.
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use relay_chat_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or the Telegram token is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let settings: Self = build_config()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that the settings required at startup are present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` if `TELEGRAM_TOKEN` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram_token.trim().is_empty() {
            return Err(ConfigError::Message(
                "TELEGRAM_TOKEN is not set".to_string(),
            ));
        }
        Ok(())
    }

    /// Names of the optional API keys that are not configured.
    #[must_use]
    pub fn missing_api_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(self.deepinfra_api_key.as_deref()) {
            missing.push("DEEPINFRA_API_KEY");
        }
        if is_blank(self.stability_api_key.as_deref()) {
            missing.push("STABILITY_API_KEY");
        }
        missing
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Maximum length of one outgoing Telegram message (characters)
pub const MAX_MESSAGE_LENGTH: usize = 4096;
/// Maximum length of a photo caption (characters)
pub const MAX_CAPTION_LENGTH: usize = 1024;
/// Maximum accepted length of incoming user text (characters)
pub const MAX_INPUT_LENGTH: usize = 2000;

// Upstream retry policy
/// Attempts per upstream call, including the first one. Also the hard ceiling.
pub const UPSTREAM_MAX_RETRIES: u32 = 5;
/// Base delay of the exponential backoff
pub const UPSTREAM_INITIAL_BACKOFF_SECS: u64 = 1;
/// Upper bound for a single backoff delay
pub const UPSTREAM_MAX_BACKOFF_SECS: u64 = 30;

/// Timeout for text-completion calls
pub const TEXT_API_TIMEOUT_SECS: u64 = 30;
/// Timeout for image-generation calls
pub const IMAGE_API_TIMEOUT_SECS: u64 = 60;
/// Timeout for the startup availability probe
pub const PROBE_TIMEOUT_SECS: u64 = 10;

// Telegram delivery retry (fixed interval)
/// Extra attempts after the first failed Telegram call
pub const TELEGRAM_API_MAX_RETRIES: usize = 2;
/// Pause between Telegram delivery attempts
pub const TELEGRAM_API_RETRY_DELAY_MS: u64 = 1000;

/// Inactivity after which the keep-alive ping fires.
/// Default: 10 minutes.
pub const KEEP_ALIVE_INTERVAL_SECS: u64 = 600;
/// How often the liveness monitor wakes up.
/// Default: 5 minutes.
pub const LIVENESS_WAKE_SECS: u64 = 300;
/// Idle time after which a conversation entry is dropped (back to idle).
/// Default: 24 hours.
pub const CONVERSATION_IDLE_TTL_SECS: u64 = 86_400;
/// Maximum number of tracked conversations.
pub const CONVERSATION_MAX_ENTRIES: u64 = 100_000;
/// Pause before the single restart after the bot stops with an error.
pub const RESTART_DELAY_SECS: u64 = 10;

fn env_or(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Get keep-alive interval from env or default.
///
/// Environment variable: `KEEP_ALIVE_INTERVAL_SECS`.
#[must_use]
pub fn get_keep_alive_interval() -> u64 {
    env_or("KEEP_ALIVE_INTERVAL_SECS", KEEP_ALIVE_INTERVAL_SECS)
}

/// Get liveness wake interval from env or default.
///
/// Environment variable: `LIVENESS_WAKE_SECS`.
#[must_use]
pub fn get_liveness_wake_interval() -> u64 {
    env_or("LIVENESS_WAKE_SECS", LIVENESS_WAKE_SECS)
}

/// Get conversation idle TTL from env or default.
///
/// Environment variable: `CONVERSATION_IDLE_TTL_SECS`.
#[must_use]
pub fn get_conversation_idle_ttl() -> u64 {
    env_or("CONVERSATION_IDLE_TTL_SECS", CONVERSATION_IDLE_TTL_SECS)
}
