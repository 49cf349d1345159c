//! Generative provider trait definition
//!
//! This module defines the core trait that every upstream model provider implements.

use crate::completion::{FragmentStream, GenerateRequest, GenerateResponse};
use crate::error::Result;

/// Trait for generative language providers
#[async_trait::async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Generate a complete response in a single request/response exchange
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    /// Start a streamed generation.
    ///
    /// Returns once the upstream has accepted the request; fragments are then
    /// delivered through the returned channel as they arrive.
    async fn stream(&self, request: GenerateRequest) -> Result<FragmentStream>;
}
