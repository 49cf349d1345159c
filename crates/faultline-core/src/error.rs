//! Error types for faultline-core
//!
//! This module provides error types and user-friendly error formatting.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Submission had no description, image, or transcript
    #[error("validation error: {0}")]
    Validation(String),

    /// Report generation failed (upstream error or malformed report)
    #[error("diagnostic error: {0}")]
    Diagnostic(String),

    /// Follow-up reply failed to stream
    #[error("chat error: {0}")]
    Chat(String),

    /// Required credential or setting missing at startup
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// No history entry with the given identifier
    #[error("history entry not found: {0}")]
    HistoryEntryNotFound(uuid::Uuid),

    /// Destructive action attempted without explicit confirmation
    #[error("confirmation required: {0}")]
    ConfirmationRequired(String),

    /// Image file could not be loaded
    #[error("image error: {0}")]
    Image(String),

    /// LLM transport error
    #[error("llm error: {0}")]
    Llm(faultline_llm::Error),
}

impl From<faultline_llm::Error> for Error {
    fn from(error: faultline_llm::Error) -> Self {
        match error {
            faultline_llm::Error::NotConfigured(msg) => Error::NotConfigured(msg),
            other => Error::Llm(other),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::Validation(msg) => format!("Nothing to diagnose: {}", msg),
            Error::Diagnostic(msg) => format!("Diagnosis failed: {}", msg),
            Error::Chat(msg) => format!("Follow-up failed: {}", msg),
            Error::NotConfigured(msg) => format!("Not configured: {}", msg),
            Error::HistoryEntryNotFound(_) => "That history entry no longer exists.".to_string(),
            Error::ConfirmationRequired(msg) => format!("Please confirm: {}", msg),
            Error::Image(msg) => format!("Could not use that image: {}", msg),
            Error::Llm(e) => format!("Model service error: {}", e),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::Validation(_) => Some(
                "Describe the problem, attach a photo, or record a voice note first.".to_string(),
            ),
            Error::Diagnostic(_) => {
                Some("Your input was kept. Check your connection and submit again.".to_string())
            }
            Error::NotConfigured(_) => Some(
                "Set the GEMINI_API_KEY environment variable (or add it to .env).".to_string(),
            ),
            Error::Image(_) => {
                Some("Use a JPEG, PNG, WEBP, HEIC, or GIF photo.".to_string())
            }
            Error::Llm(faultline_llm::Error::RateLimit) => {
                Some("Wait a moment before retrying.".to_string())
            }
            _ => None,
        }
    }
}

/// Format an error for display in the CLI
pub fn format_error_for_cli(error: &Error) -> String {
    let mut output = error.user_message();
    if let Some(suggestion) = error.suggestion() {
        output.push('\n');
        output.push_str(&suggestion);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_and_suggestion() {
        let err = Error::Validation("empty submission".to_string());
        assert!(err.user_message().contains("empty submission"));
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_format_error_for_cli_includes_suggestion() {
        let err = Error::Diagnostic("upstream timeout".to_string());
        let text = format_error_for_cli(&err);
        assert!(text.starts_with("Diagnosis failed: upstream timeout"));
        assert!(text.contains("submit again"));
    }

    #[test]
    fn test_llm_error_conversion() {
        let err: Error = faultline_llm::Error::RateLimit.into();
        assert!(matches!(err, Error::Llm(_)));
        assert!(err.suggestion().unwrap().contains("Wait"));
    }

    #[test]
    fn test_missing_credential_suggests_api_key() {
        let err: Error =
            faultline_llm::Error::NotConfigured("GEMINI_API_KEY not set".to_string()).into();
        assert!(matches!(err, Error::NotConfigured(_)));

        let text = format_error_for_cli(&err);
        assert!(text.starts_with("Not configured: GEMINI_API_KEY not set"));
        assert!(text.contains("Set the GEMINI_API_KEY environment variable"));
    }
}
