//! Faultline LLM - Generative API transport
//!
//! This crate provides the upstream model integration for Faultline:
//! - Provider: the `GenerativeProvider` trait (single-shot and streamed generation)
//! - Gemini: Google Gemini provider (JSON-schema output, SSE streaming)
//! - Mock: scripted provider for tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod gemini;
pub mod message;
pub mod mock;
pub mod provider;
pub mod util;

pub use completion::{FragmentStream, GenerateRequest, GenerateResponse, TokenUsage};
pub use error::{Error, Result};
pub use gemini::{GeminiConfig, GeminiProvider};
pub use message::{ImageAttachment, Message, MessageRole};
pub use mock::MockProvider;
pub use provider::GenerativeProvider;
