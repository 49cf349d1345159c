//! Diagnostic client
//!
//! Builds the fixed instruction and output schema, sends the case to the
//! generative provider, and decodes the structured report.

use crate::error::{Error, Result};
use crate::input::CaseInput;
use crate::report::{decode_report, report_schema, DiagnosticReport};
use faultline_llm::{GenerateRequest, GenerativeProvider, ImageAttachment, Message};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Persona shared by the diagnostic and follow-up instructions
pub const PERSONA: &str = "You are an expert field technician who diagnoses faults in \
household appliances, vehicles, electronics, plumbing, and electrical systems. \
You are careful, practical, and safety-first.";

const FORMAT_INSTRUCTION: &str = "Analyse the photo, written description, and voice note \
the user provides. Respond with a single JSON object matching the provided schema and \
nothing else. Order possible causes from most to least likely. Number troubleshooting \
steps from 1 with no gaps. Give a severity of Low, Medium, High, or Critical and say \
plainly when the user should stop using the equipment or call a professional. Keep the \
simplified explanation free of jargon.";

/// Placeholder sent when no description was written
pub const NO_DESCRIPTION: &str = "No written description provided.";
/// Placeholder sent when no voice note was recorded
pub const NO_TRANSCRIPT: &str = "No voice note provided.";

/// Default sampling temperature for report generation
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Client that turns a case into a [`DiagnosticReport`]
#[derive(Clone)]
pub struct DiagnosticClient {
    provider: Arc<dyn GenerativeProvider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl DiagnosticClient {
    /// Create a client using the provider's default model
    #[must_use]
    pub fn new(provider: Arc<dyn GenerativeProvider>) -> Self {
        Self {
            model: provider.default_model().to_string(),
            provider,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }

    /// Override the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.is_empty() {
            self.model = model;
        }
        self
    }

    /// Override the sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Cap the output length
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Model used for reports
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full system instruction sent with every report request
    #[must_use]
    pub fn system_instruction() -> String {
        format!("{}\n\n{}", PERSONA, FORMAT_INSTRUCTION)
    }

    /// Build the upstream request for a case
    #[must_use]
    pub fn build_request(&self, input: &CaseInput) -> GenerateRequest {
        let description = non_empty_or(&input.description, NO_DESCRIPTION);
        let transcript = non_empty_or(&input.transcript, NO_TRANSCRIPT);

        let prompt = format!(
            "Written description:\n{}\n\nVoice note transcript:\n{}",
            description, transcript
        );

        let mut message = Message::user(prompt);
        if let Some(image) = &input.image {
            message = message.with_image(ImageAttachment::new(&image.media_type, &image.data));
        }

        let mut request = GenerateRequest::new(&self.model)
            .with_system_instruction(Self::system_instruction())
            .with_message(message)
            .with_temperature(self.temperature)
            .with_response_schema(report_schema());
        if let Some(max) = self.max_tokens {
            request = request.with_max_tokens(max);
        }
        request
    }

    /// Generate and validate a report.
    ///
    /// Fails with [`Error::Diagnostic`] on any upstream error or on output
    /// that does not decode into a complete report.
    #[instrument(skip(self, input), fields(model = %self.model, has_image = input.image.is_some()))]
    pub async fn generate_report(&self, input: &CaseInput) -> Result<DiagnosticReport> {
        let request = self.build_request(input);

        let response = self.provider.generate(request).await.map_err(|e| {
            warn!(error = %e, "Report request failed");
            Error::Diagnostic(e.to_string())
        })?;

        debug!(
            chars = response.content.len(),
            finish_reason = ?response.finish_reason,
            "Report response received"
        );

        let report = decode_report(&response.content).map_err(|e| {
            warn!(error = %e, "Report failed validation");
            e
        })?;

        info!(
            severity = %report.risk_assessment.severity,
            steps = report.troubleshooting_steps.len(),
            "Report generated"
        );
        Ok(report)
    }
}

fn non_empty_or<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        placeholder
    } else {
        trimmed
    }
}
