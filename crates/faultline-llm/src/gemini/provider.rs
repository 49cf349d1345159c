//! Gemini provider implementation

use super::config::GeminiConfig;
use super::convert::build_request;
use super::security::sanitize_api_error;
use super::sse::SseDecoder;
use super::types::*;
use crate::completion::{FragmentStream, GenerateRequest, GenerateResponse, TokenUsage};
use crate::error::{Error, Result};
use crate::provider::GenerativeProvider;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

/// Same-request retries on 429/5xx before the error is surfaced
const MAX_RETRIES: u32 = 2;

/// Server-suggested delays at or above this are not worth waiting for
const MAX_RETRY_WAIT_SECS: u64 = 30;

/// Google Gemini provider
pub struct GeminiProvider {
    client: Client,
    pub(crate) config: GeminiConfig,
    /// Last retry-after delay reported by Gemini (seconds), used for smart backoff.
    last_retry_after: AtomicU64,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            client,
            config,
            last_retry_after: AtomicU64::new(0),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    fn resolve_model<'a>(&'a self, request: &'a GenerateRequest) -> &'a str {
        if request.model.is_empty() {
            &self.config.default_model
        } else {
            &request.model
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        let base = format!("{}/models/{}:{}", self.config.base_url, model, method);
        if method == "streamGenerateContent" {
            format!("{}?alt=sse&key={}", base, self.config.api_key)
        } else {
            format!("{}?key={}", base, self.config.api_key)
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(self.config.timeout.as_millis() as u64)
        } else {
            // SECURITY: reqwest errors embed the request URL, which carries the key
            Error::Network(sanitize_api_error(&e.without_url().to_string()))
        }
    }

    /// Send request to Gemini API, retrying on 429 and 5xx
    async fn send_request(&self, model: &str, request: &GeminiRequest) -> Result<GeminiResponse> {
        let mut attempt = 0;
        loop {
            match self.send_request_once(model, request).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    let hinted = self.last_retry_after.swap(0, Ordering::Relaxed);
                    if hinted >= MAX_RETRY_WAIT_SECS {
                        warn!(
                            gemini_hint_secs = hinted,
                            "Gemini retry_after is too long, giving up"
                        );
                        return Err(e);
                    }
                    let delay_secs = if hinted > 0 {
                        hinted
                    } else {
                        2 + u64::from(attempt) * 2
                    };
                    warn!(
                        attempt = attempt + 1,
                        model,
                        delay_secs,
                        error = %e,
                        "Gemini request failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Single attempt to send request to Gemini API.
    async fn send_request_once(
        &self,
        model: &str,
        request: &GeminiRequest,
    ) -> Result<GeminiResponse> {
        // SECURITY: Don't log the full URL (contains API key)
        debug!("Sending request to Gemini model: {}", model);

        let response = self
            .client
            .post(self.endpoint(model, "generateContent"))
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(self.error_from_response(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::InvalidResponse(sanitize_api_error(&format!("{}: {}", e, body)))
        })
    }

    /// Classify a non-2xx response into a typed error
    fn error_from_response(&self, status: StatusCode, body: &str) -> Error {
        warn!(status = %status, "Gemini API error response");

        let Ok(error) = serde_json::from_str::<GeminiError>(body) else {
            if status.is_server_error() {
                return Error::ServerError(format!("HTTP {}", status));
            }
            // SECURITY: Don't expose raw HTTP response body
            return Error::Api(sanitize_api_error(&format!("HTTP {}: {}", status, body)));
        };

        warn!(
            error_status = %error.error.status,
            error_code = error.error.code,
            "Gemini API error detail"
        );

        if status == StatusCode::TOO_MANY_REQUESTS {
            if let Some(secs) = error.error.retry_after_secs() {
                self.last_retry_after.store(secs, Ordering::Relaxed);
            }
            return Error::RateLimit;
        }

        let message = sanitize_api_error(&format!("{}: {}", error.error.status, error.error.message));
        if status.is_server_error() {
            Error::ServerError(message)
        } else {
            Error::Api(message)
        }
    }
}

/// Decode one SSE `data:` payload into its text fragment.
///
/// Returns `Ok(None)` for chunks that carry no text (usage-only, empty
/// parts). A blocked prompt or a safety stop with no text is an error.
pub(crate) fn parse_stream_event(data: &str) -> Result<Option<String>> {
    let chunk: GeminiResponse = serde_json::from_str(data)
        .map_err(|e| Error::InvalidResponse(format!("malformed stream chunk: {}", e)))?;

    if let Some(reason) = chunk
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(Error::Api(format!("prompt blocked: {}", reason)));
    }

    let Some(candidate) = chunk.candidates.first() else {
        return Ok(None);
    };

    let text = candidate.text();
    if text.is_empty() {
        if let Some(reason @ ("SAFETY" | "RECITATION" | "PROHIBITED_CONTENT")) =
            candidate.finish_reason.as_deref()
        {
            return Err(Error::Api(format!("response stopped: {}", reason)));
        }
        return Ok(None);
    }
    Ok(Some(text))
}

#[async_trait::async_trait]
impl GenerativeProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let model = self.resolve_model(&request).to_string();
        let gemini_request = build_request(&request, self.config.default_max_tokens);

        let response = self.send_request(&model, &gemini_request).await?;

        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(Error::Api(format!("prompt blocked: {}", reason)));
        }

        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| Error::InvalidResponse("No candidates in response".to_string()))?;

        let content = candidate.text();
        if content.is_empty() {
            return Err(Error::InvalidResponse(format!(
                "empty response (finish_reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        let usage = response.usage_metadata.as_ref().map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count.unwrap_or(0),
            total_tokens: u.total_token_count,
        });

        Ok(GenerateResponse {
            content,
            usage,
            finish_reason: candidate.finish_reason.clone(),
            model,
        })
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn stream(&self, request: GenerateRequest) -> Result<FragmentStream> {
        let model = self.resolve_model(&request).to_string();
        let gemini_request = build_request(&request, self.config.default_max_tokens);

        debug!("Opening Gemini stream: {}", model);

        let response = self
            .client
            .post(self.endpoint(&model, "streamGenerateContent"))
            .header("content-type", "application/json")
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.error_from_response(status, &body));
        }

        let (tx, rx) = mpsc::channel(32);
        let timeout_ms = self.config.timeout.as_millis() as u64;

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut decoder = SseDecoder::default();

            while let Some(item) = bytes.next().await {
                let chunk = match item {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let err = if e.is_timeout() {
                            Error::Timeout(timeout_ms)
                        } else {
                            Error::Network(e.without_url().to_string())
                        };
                        let _ = tx.send(Err(err)).await;
                        return;
                    }
                };
                for event in decoder.push(&chunk) {
                    match parse_stream_event(&event) {
                        Ok(Some(text)) => {
                            if tx.send(Ok(text)).await.is_err() {
                                // Receiver dropped; stop reading the body
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }

            if let Some(event) = decoder.finish() {
                match parse_stream_event(&event) {
                    Ok(Some(text)) => {
                        let _ = tx.send(Ok(text)).await;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                    }
                }
            }
        });

        Ok(rx)
    }
}
