//! Speech capture configuration

use serde::{Deserialize, Serialize};

/// Speech capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Backend: "auto" | "whisper" | "none"
    /// - auto: Whisper API when `OPENAI_API_KEY` is set, otherwise disabled
    /// - whisper: Whisper API only
    /// - none: recording controls disabled
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Recognition language (ISO 639-1)
    #[serde(default = "default_language")]
    pub language: String,

    /// Whisper model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Seconds of audio per transcription request
    #[serde(default = "default_chunk_secs")]
    pub chunk_secs: u32,
}

fn default_backend() -> String {
    "auto".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_model() -> String {
    "whisper-1".to_string()
}

fn default_chunk_secs() -> u32 {
    10
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            language: default_language(),
            model: default_model(),
            chunk_secs: default_chunk_secs(),
        }
    }
}

impl SpeechConfig {
    /// Set language
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set backend
    #[must_use]
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    /// Whether recording is switched off entirely
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.backend.eq_ignore_ascii_case("none")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SpeechConfig::default();
        assert_eq!(config.backend, "auto");
        assert_eq!(config.language, "en");
        assert_eq!(config.chunk_secs, 10);
        assert!(!config.is_disabled());
    }

    #[test]
    fn test_builders() {
        let config = SpeechConfig::default()
            .with_language("de")
            .with_backend("none");
        assert_eq!(config.language, "de");
        assert!(config.is_disabled());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: SpeechConfig = serde_json::from_str(r#"{"backend":"whisper"}"#).unwrap();
        assert_eq!(config.backend, "whisper");
        assert_eq!(config.model, "whisper-1");
    }
}
