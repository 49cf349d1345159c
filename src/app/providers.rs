//! Assistant construction
//!
//! Resolves the Gemini provider from the environment and wires the
//! diagnostic and follow-up clients into an [`Assistant`].

use super::config::AppConfig;
use anyhow::{Context, Result};
use faultline_core::{Assistant, DiagnosticClient, FollowUpClient};
use faultline_llm::{GeminiConfig, GeminiProvider, GenerativeProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Resolve the Gemini provider. A missing credential is fatal.
pub fn resolve_provider(config: &AppConfig) -> Result<Arc<dyn GenerativeProvider>> {
    let mut gemini = GeminiConfig::from_env()
        .map_err(faultline_core::Error::from)
        .map_err(|e| anyhow::anyhow!(faultline_core::format_error_for_cli(&e)))
        .context("Gemini credentials are required")?;

    if let Some(base_url) = &config.llm.base_url {
        gemini = gemini.with_base_url(base_url);
    }
    if !config.llm.model.is_empty() {
        gemini = gemini.with_model(&config.llm.model);
    }
    gemini = gemini
        .with_max_tokens(config.llm.max_output_tokens)
        .with_timeout(Duration::from_secs(config.llm.timeout_secs));

    let provider = GeminiProvider::new(gemini).context("Failed to create Gemini provider")?;
    info!(model = provider.default_model(), "Registered Gemini provider");
    Ok(Arc::new(provider))
}

/// Build the assistant around a provider
pub fn build_assistant(config: &AppConfig, provider: Arc<dyn GenerativeProvider>) -> Assistant {
    let diagnostic = DiagnosticClient::new(Arc::clone(&provider))
        .with_temperature(config.llm.temperature)
        .with_max_tokens(config.llm.max_output_tokens);

    let chat_model = if config.llm.chat_model.is_empty() {
        diagnostic.model().to_string()
    } else {
        config.llm.chat_model.clone()
    };
    let followup = FollowUpClient::new(provider).with_model(chat_model);

    Assistant::new(diagnostic, followup, config.session.alert_threshold)
}
