//! Gemini - Google Gemini API provider
//!
//! Structured (JSON-schema constrained) generation via `generateContent`
//! and incremental replies via `streamGenerateContent?alt=sse`.

mod config;
mod convert;
mod provider;
mod schema;
mod security;
mod sse;
mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use config::{GeminiConfig, DEFAULT_MODEL, MODELS};
pub use provider::GeminiProvider;
