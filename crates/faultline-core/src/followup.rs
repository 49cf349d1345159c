//! Conversational follow-up client
//!
//! A [`ChatSession`] is seeded once from a report and keeps the conversation
//! history client-side. Each question opens a fresh upstream stream.

use crate::diagnostic::PERSONA;
use crate::error::{Error, Result};
use crate::report::DiagnosticReport;
use faultline_llm::{GenerateRequest, GenerativeProvider, Message};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Receiving half of a streamed reply, in arrival order.
///
/// Closes when the reply is complete; an `Err` item ends the reply early.
pub type ReplyStream = mpsc::Receiver<Result<String>>;

const REPLY_BUFFER: usize = 64;

/// Opens chat sessions scoped to a report
#[derive(Clone)]
pub struct FollowUpClient {
    provider: Arc<dyn GenerativeProvider>,
    model: String,
    temperature: Option<f32>,
}

impl FollowUpClient {
    /// Create a client using the provider's default model
    #[must_use]
    pub fn new(provider: Arc<dyn GenerativeProvider>) -> Self {
        Self {
            model: provider.default_model().to_string(),
            provider,
            temperature: None,
        }
    }

    /// Override the chat model
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
        self.temperature = Some(temperature);
        self
    }

    /// Seed a new conversation from a report.
    ///
    /// The report is copied into the hidden instruction; later changes to the
    /// active report do not affect this session.
    #[must_use]
    pub fn open_session(&self, report: &DiagnosticReport) -> ChatSession {
        let session = ChatSession {
            id: Uuid::new_v4(),
            system_instruction: context_instruction(report),
            history: Arc::new(Mutex::new(Vec::new())),
            provider: Arc::clone(&self.provider),
            model: self.model.clone(),
            temperature: self.temperature,
        };
        debug!(session_id = %session.id, model = %session.model, "Chat session opened");
        session
    }
}

fn context_instruction(report: &DiagnosticReport) -> String {
    let causes = report
        .possible_causes
        .iter()
        .map(|c| format!("- {}", c))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{persona}\n\n\
         You already diagnosed the user's problem. Answer follow-up questions about \
         that diagnosis concisely and stay consistent with it. If the user describes \
         new symptoms that change the picture, say so and suggest submitting a new case.\n\n\
         Fault summary: {summary}\n\
         Possible causes:\n{causes}\n\
         Risk severity: {severity}\n\
         Risk summary: {risk}",
        persona = PERSONA,
        summary = report.fault_summary,
        causes = causes,
        severity = report.risk_assessment.severity,
        risk = report.risk_assessment.summary,
    )
}

/// Handle to one report-scoped conversation
#[derive(Clone)]
pub struct ChatSession {
    id: Uuid,
    system_instruction: String,
    history: Arc<Mutex<Vec<Message>>>,
    provider: Arc<dyn GenerativeProvider>,
    model: String,
    temperature: Option<f32>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("model", &self.model)
            .field("turns", &self.history_len())
            .finish()
    }
}

impl ChatSession {
    /// Session identifier
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Hidden instruction seeded from the report
    #[must_use]
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Number of completed messages held for context
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.lock().map(|h| h.len()).unwrap_or(0)
    }

    /// Ask a question and stream the answer.
    ///
    /// Returns once the upstream accepts the request. The question and the
    /// full answer join the history only when the reply completes; a failed
    /// or cancelled reply leaves history untouched.
    #[instrument(skip(self, text, cancel), fields(session_id = %self.id))]
    pub async fn send_message(&self, text: &str, cancel: CancellationToken) -> Result<ReplyStream> {
        let question = Message::user(text);
        let mut messages = self
            .history
            .lock()
            .map_err(|_| Error::Chat("chat history unavailable".to_string()))?
            .clone();
        messages.push(question.clone());

        let mut request = GenerateRequest::new(&self.model)
            .with_system_instruction(&self.system_instruction)
            .with_messages(messages);
        if let Some(t) = self.temperature {
            request = request.with_temperature(t);
        }

        let mut upstream = self
            .provider
            .stream(request)
            .await
            .map_err(|e| Error::Chat(e.to_string()))?;

        let (tx, rx) = mpsc::channel(REPLY_BUFFER);
        let history = Arc::clone(&self.history);
        let session_id = self.id;

        tokio::spawn(async move {
            let mut answer = String::new();
            loop {
                let item = tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!(session_id = %session_id, "Reply cancelled");
                        return;
                    }
                    item = upstream.recv() => item,
                };

                match item {
                    Some(Ok(fragment)) => {
                        answer.push_str(&fragment);
                        if tx.send(Ok(fragment)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(session_id = %session_id, error = %e, "Reply stream failed");
                        let _ = tx.send(Err(Error::Chat(e.to_string()))).await;
                        return;
                    }
                    None => break,
                }
            }

            if let Ok(mut h) = history.lock() {
                h.push(question);
                h.push(Message::assistant(answer));
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{fixtures, Severity};
    use faultline_llm::{MessageRole, MockProvider};

    async fn collect(mut rx: ReplyStream) -> (String, Option<Error>) {
        let mut text = String::new();
        while let Some(item) = rx.recv().await {
            match item {
                Ok(f) => text.push_str(&f),
                Err(e) => return (text, Some(e)),
            }
        }
        (text, None)
    }

    #[test]
    fn test_context_restates_report() {
        let mock = MockProvider::new();
        let report = fixtures::report(Severity::High);
        let session = FollowUpClient::new(Arc::new(mock)).open_session(&report);

        let ctx = session.system_instruction();
        assert!(ctx.contains("field technician"));
        assert!(ctx.contains(&report.fault_summary));
        assert!(ctx.contains("- Belt wear"));
        assert!(ctx.contains("Risk severity: High"));
        assert!(ctx.contains(&report.risk_assessment.summary));
    }

    #[tokio::test]
    async fn test_fragments_concatenate_in_order() {
        let mock = MockProvider::new();
        mock.push_stream(["The ", "issue ", "is resolved."]);
        let session = FollowUpClient::new(Arc::new(mock.clone()))
            .open_session(&fixtures::report(Severity::Low));

        let rx = session
            .send_message("Is it fixed?", CancellationToken::new())
            .await
            .unwrap();
        let (text, err) = collect(rx).await;
        assert_eq!(text, "The issue is resolved.");
        assert!(err.is_none());

        // Forwarder records history after the channel closes
        tokio::task::yield_now().await;
        assert_eq!(session.history_len(), 2);
    }

    #[tokio::test]
    async fn test_follow_up_carries_history() {
        let mock = MockProvider::new();
        mock.push_stream(["first"]);
        mock.push_stream(["second"]);
        let session = FollowUpClient::new(Arc::new(mock.clone()))
            .open_session(&fixtures::report(Severity::Low));

        let rx = session.send_message("q1", CancellationToken::new()).await.unwrap();
        collect(rx).await;
        tokio::task::yield_now().await;

        let rx = session.send_message("q2", CancellationToken::new()).await.unwrap();
        collect(rx).await;

        let requests = mock.requests();
        let last = &requests[1];
        assert_eq!(last.messages.len(), 3);
        assert_eq!(last.messages[0].content, "q1");
        assert_eq!(last.messages[1].role, MessageRole::Assistant);
        assert_eq!(last.messages[1].content, "first");
        assert_eq!(last.messages[2].content, "q2");
        assert!(last.system_instruction.is_some());
    }

    #[tokio::test]
    async fn test_stream_failure_surfaces_chat_error() {
        let mock = MockProvider::new();
        mock.push_stream_failure(["partial "], faultline_llm::Error::Network("reset".into()));
        let session = FollowUpClient::new(Arc::new(mock.clone()))
            .open_session(&fixtures::report(Severity::Low));

        let rx = session.send_message("q", CancellationToken::new()).await.unwrap();
        let (text, err) = collect(rx).await;
        assert_eq!(text, "partial ");
        assert!(matches!(err, Some(Error::Chat(_))));
        tokio::task::yield_now().await;
        assert_eq!(session.history_len(), 0);
    }

    #[tokio::test]
    async fn test_open_error_is_chat_error() {
        let mock = MockProvider::new();
        mock.push_stream_open_error(faultline_llm::Error::RateLimit);
        let session = FollowUpClient::new(Arc::new(mock))
            .open_session(&fixtures::report(Severity::Low));

        let err = session
            .send_message("q", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Chat(_)));
    }
}
