//! Mock generative provider for testing
//!
//! Queues canned responses and scripted streams, and records every request
//! it receives so callers can assert on prompts and schemas.

use crate::completion::{FragmentStream, GenerateRequest, GenerateResponse};
use crate::error::{Error, Result};
use crate::provider::GenerativeProvider;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Scripted outcome of one `stream` call
enum MockStream {
    /// Stream opens and yields these items in order
    Items(Vec<Result<String>>),
    /// Stream fails to open
    OpenError(Error),
}

/// A mock provider that returns queued responses or default ones.
#[derive(Clone, Default)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<Result<GenerateResponse>>>>,
    streams: Arc<Mutex<VecDeque<MockStream>>>,
    requests: Arc<Mutex<Vec<GenerateRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful `generate` response with the given raw text.
    pub fn push_response(&self, content: impl Into<String>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(GenerateResponse {
                content: content.into(),
                usage: None,
                finish_reason: Some("STOP".to_string()),
                model: "mock-model".to_string(),
            }));
    }

    /// Queue a failing `generate` call.
    pub fn push_error(&self, error: Error) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(error));
    }

    /// Queue a stream that yields `fragments` and then ends normally.
    pub fn push_stream<S: Into<String>>(&self, fragments: impl IntoIterator<Item = S>) {
        let items = fragments.into_iter().map(|f| Ok(f.into())).collect();
        self.streams
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(MockStream::Items(items));
    }

    /// Queue a stream that yields `fragments` and then fails mid-way.
    pub fn push_stream_failure<S: Into<String>>(
        &self,
        fragments: impl IntoIterator<Item = S>,
        error: Error,
    ) {
        let mut items: Vec<Result<String>> = fragments.into_iter().map(|f| Ok(f.into())).collect();
        items.push(Err(error));
        self.streams
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(MockStream::Items(items));
    }

    /// Queue a stream call that is rejected before any fragment is produced.
    pub fn push_stream_open_error(&self, error: Error) {
        self.streams
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(MockStream::OpenError(error));
    }

    /// Every request received so far, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, request: GenerateRequest) {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
    }
}

#[async_trait::async_trait]
impl GenerativeProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        self.record(request);
        let queued = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        queued.unwrap_or_else(|| {
            Ok(GenerateResponse {
                content: "mock response".to_string(),
                usage: None,
                finish_reason: Some("STOP".to_string()),
                model: "mock-model".to_string(),
            })
        })
    }

    async fn stream(&self, request: GenerateRequest) -> Result<FragmentStream> {
        self.record(request);
        let queued = self
            .streams
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        let items = match queued {
            Some(MockStream::Items(items)) => items,
            Some(MockStream::OpenError(e)) => return Err(e),
            None => vec![Ok("mock response".to_string())],
        };

        let (tx, rx) = mpsc::channel(items.len().max(1));
        for item in items {
            // Capacity covers every item, so this never fails
            let _ = tx.try_send(item);
        }
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_generate_queue_order() {
        let mock = MockProvider::new();
        mock.push_response("first");
        mock.push_error(Error::RateLimit);

        let first = mock.generate(GenerateRequest::new("m")).await.unwrap();
        assert_eq!(first.content, "first");
        assert!(matches!(
            mock.generate(GenerateRequest::new("m")).await,
            Err(Error::RateLimit)
        ));
        let fallback = mock.generate(GenerateRequest::new("m")).await.unwrap();
        assert_eq!(fallback.content, "mock response");
        assert_eq!(mock.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_stream_yields_in_order_then_closes() {
        let mock = MockProvider::new();
        mock.push_stream(["a", "b"]);

        let mut rx = mock.stream(GenerateRequest::new("m")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().unwrap(), "a");
        assert_eq!(rx.recv().await.unwrap().unwrap(), "b");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_mock_stream_failure() {
        let mock = MockProvider::new();
        mock.push_stream_failure(["partial"], Error::Network("reset".into()));
        mock.push_stream_open_error(Error::RateLimit);

        let mut rx = mock.stream(GenerateRequest::new("m")).await.unwrap();
        assert!(rx.recv().await.unwrap().is_ok());
        assert!(rx.recv().await.unwrap().is_err());

        assert!(mock.stream(GenerateRequest::new("m")).await.is_err());
    }
}
