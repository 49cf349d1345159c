//! Generation request and response types

use crate::error::Result;
use crate::message::Message;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Receiving half of a streamed reply.
///
/// Yields text fragments in the order the upstream produced them; the channel
/// closes when the reply is complete. An `Err` item terminates the stream.
pub type FragmentStream = mpsc::Receiver<Result<String>>;

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub prompt_tokens: u32,
    /// Completion tokens
    pub completion_tokens: u32,
    /// Total tokens
    pub total_tokens: u32,
}

/// Generation request
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    /// Model to use (empty = provider default)
    pub model: String,
    /// Hidden instruction that frames every turn
    pub system_instruction: Option<String>,
    /// Conversation turns, oldest first
    pub messages: Vec<Message>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// JSON schema the output must satisfy; implies a JSON response
    pub response_schema: Option<serde_json::Value>,
}

impl GenerateRequest {
    /// Create a new request
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the system instruction
    #[must_use]
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Add a message
    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Add messages
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Set max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Constrain the output to a JSON schema
    #[must_use]
    pub fn with_response_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// Generation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Generated text (raw, untrimmed)
    pub content: String,
    /// Token usage
    pub usage: Option<TokenUsage>,
    /// Finish reason
    pub finish_reason: Option<String>,
    /// Model used
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_builder() {
        let request = GenerateRequest::new("gemini-2.5-flash")
            .with_system_instruction("You are a technician")
            .with_message(Message::user("Hello"))
            .with_max_tokens(100)
            .with_temperature(0.2)
            .with_response_schema(serde_json::json!({"type": "object"}));

        assert_eq!(request.model, "gemini-2.5-flash");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.max_tokens, Some(100));
        assert_eq!(request.temperature, Some(0.2));
        assert!(request.response_schema.is_some());
        assert_eq!(
            request.system_instruction.as_deref(),
            Some("You are a technician")
        );
    }
}
