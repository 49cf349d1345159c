//! Request conversion utilities for Gemini API

use super::schema::strip_unsupported_schema_fields;
use super::types::*;
use crate::completion::GenerateRequest;
use crate::message::{Message, MessageRole};

/// Convert messages to Gemini contents.
///
/// System messages found inline are folded into the returned system
/// instruction (appended after `explicit_system`, if any).
pub(crate) fn convert_messages(
    explicit_system: Option<&str>,
    messages: &[Message],
) -> (Option<GeminiContent>, Vec<GeminiContent>) {
    let mut system_parts: Vec<GeminiPart> = explicit_system
        .filter(|s| !s.is_empty())
        .map(|s| GeminiPart::Text {
            text: s.to_string(),
        })
        .into_iter()
        .collect();
    let mut gemini_contents = Vec::new();

    for msg in messages {
        match msg.role {
            MessageRole::System => {
                system_parts.push(GeminiPart::Text {
                    text: msg.content.clone(),
                });
            }
            MessageRole::User => {
                let mut parts = Vec::new();
                if !msg.content.is_empty() {
                    parts.push(GeminiPart::Text {
                        text: msg.content.clone(),
                    });
                }
                for img in &msg.images {
                    parts.push(GeminiPart::InlineData {
                        inline_data: InlineData {
                            mime_type: img.mime_type.clone(),
                            data: img.data.clone(),
                        },
                    });
                }
                if !parts.is_empty() {
                    gemini_contents.push(GeminiContent {
                        role: Some("user".to_string()),
                        parts,
                    });
                }
            }
            MessageRole::Assistant => {
                if !msg.content.is_empty() {
                    gemini_contents.push(GeminiContent {
                        role: Some("model".to_string()),
                        parts: vec![GeminiPart::Text {
                            text: msg.content.clone(),
                        }],
                    });
                }
            }
        }
    }

    let system_instruction = if system_parts.is_empty() {
        None
    } else {
        Some(GeminiContent {
            role: None,
            parts: system_parts,
        })
    };

    (system_instruction, gemini_contents)
}

/// Build the wire request for a generation call
pub(crate) fn build_request(request: &GenerateRequest, default_max_tokens: u32) -> GeminiRequest {
    let (system_instruction, contents) =
        convert_messages(request.system_instruction.as_deref(), &request.messages);

    let response_schema = request.response_schema.clone().map(|mut schema| {
        strip_unsupported_schema_fields(&mut schema);
        schema
    });

    GeminiRequest {
        contents,
        system_instruction,
        generation_config: Some(GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens.or(Some(default_max_tokens)),
            response_mime_type: response_schema
                .as_ref()
                .map(|_| "application/json".to_string()),
            response_schema,
        }),
    }
}
