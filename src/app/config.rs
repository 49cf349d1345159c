//! Application configuration types

use faultline_audio::SpeechConfig;
use faultline_core::AlertThreshold;
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generative model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model for report generation (empty = provider default)
    #[serde(default)]
    pub model: String,
    /// Model for follow-up chat (empty = same as `model`)
    #[serde(default)]
    pub chat_model: String,
    /// Sampling temperature for reports
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Output token cap for reports
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// API base URL override
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            chat_model: String::new(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
            base_url: None,
        }
    }
}

/// Session behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// disabled | low | medium | high | critical
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: AlertThreshold,
    /// Ask before clearing history
    #[serde(default = "default_true")]
    pub require_clear_confirmation: bool,
}

fn default_alert_threshold() -> AlertThreshold {
    AlertThreshold::Level(faultline_core::Severity::High)
}

fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            alert_threshold: default_alert_threshold(),
            require_clear_confirmation: default_true(),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files (unset = stderr only)
    #[serde(default)]
    pub directory: Option<String>,
}
