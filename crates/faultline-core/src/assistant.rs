//! Async driver around the [`Session`] state machine
//!
//! Every event takes the session lock once, applies one transition, releases
//! the lock, then publishes a [`SessionEvent`]. Network calls happen with the
//! lock released, so a slow diagnosis never blocks chat or navigation.

use crate::alert::AlertThreshold;
use crate::diagnostic::DiagnosticClient;
use crate::error::{Result, UserFriendlyError};
use crate::event_bus::{EventBus, SessionEvent};
use crate::followup::FollowUpClient;
use crate::input::{CaseInput, ImageInput};
use crate::session::{Session, SubmissionOutcome};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// How a chat message ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOutcome {
    /// Blank text, no open chat, or a reply already streaming
    Ignored,
    /// Reply streamed to completion
    Completed,
    /// Reply failed and was replaced with the apology
    Failed,
    /// A newer report or navigation made the reply stale
    Superseded,
}

/// Shared handle to the session and its clients
#[derive(Clone)]
pub struct Assistant {
    session: Arc<RwLock<Session>>,
    diagnostic: DiagnosticClient,
    followup: FollowUpClient,
    events: EventBus,
}

impl Assistant {
    /// Create an assistant with an idle session
    #[must_use]
    pub fn new(
        diagnostic: DiagnosticClient,
        followup: FollowUpClient,
        alert_threshold: AlertThreshold,
    ) -> Self {
        Self {
            session: Arc::new(RwLock::new(Session::new(alert_threshold))),
            diagnostic,
            followup,
            events: EventBus::default(),
        }
    }

    /// Subscribe to session events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Read the session under the lock
    pub async fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        let session = self.session.read().await;
        f(&session)
    }

    async fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self.session.write().await;
        f(&mut session)
    }

    // ── Input buffers ────────────────────────────────────────────────────

    /// Replace the written description
    pub async fn set_description(&self, text: impl Into<String>) {
        let text = text.into();
        self.update(|s| s.set_description(text)).await;
    }

    /// Attach a photo
    pub async fn set_image(&self, image: ImageInput) {
        self.update(|s| s.set_image(image)).await;
    }

    /// Remove the photo
    pub async fn clear_image(&self) {
        self.update(Session::clear_image).await;
    }

    /// Replace the voice note transcript
    pub async fn set_transcript(&self, text: impl Into<String>) {
        let text = text.into();
        self.update(|s| s.set_transcript(text)).await;
    }

    /// Empty every input buffer
    pub async fn clear_input(&self) {
        self.update(Session::clear_input).await;
    }

    // ── Submission ───────────────────────────────────────────────────────

    /// Diagnose a case.
    ///
    /// Returns `Err` only for validation failures. Diagnostic failures are
    /// recorded in the session and reported as [`SubmissionOutcome::Failed`].
    #[instrument(skip(self, input))]
    pub async fn submit_case(&self, input: CaseInput) -> Result<SubmissionOutcome> {
        let submission = self.update(|s| s.begin_submission(input)).await?;
        let ticket = submission.ticket;
        self.events.publish(SessionEvent::SubmissionStarted { ticket });

        let result = self.diagnostic.generate_report(&submission.input).await;

        let (outcome, severity) = self
            .update(|s| {
                let outcome = s.complete_submission(ticket, result, &self.followup);
                let severity = s.active_report().map(|r| r.risk_assessment.severity);
                (outcome, severity)
            })
            .await;

        match &outcome {
            SubmissionOutcome::Committed { entry_id, alert } => {
                if let Some(severity) = severity {
                    self.events.publish(SessionEvent::SubmissionCompleted {
                        ticket,
                        entry_id: *entry_id,
                        severity,
                    });
                }
                if let Some(alert) = alert {
                    self.events.publish(SessionEvent::AlertRaised {
                        severity: alert.severity,
                        threshold: alert.threshold,
                        message: alert.message(),
                    });
                }
            }
            SubmissionOutcome::Failed { error } => {
                self.events.publish(SessionEvent::SubmissionFailed {
                    ticket,
                    error: error.user_message(),
                });
            }
            SubmissionOutcome::Stale => {
                self.events
                    .publish(SessionEvent::SubmissionSuperseded { ticket });
            }
        }
        Ok(outcome)
    }

    /// Diagnose whatever is in the input buffers
    pub async fn submit_buffered(&self) -> Result<SubmissionOutcome> {
        let input = self.read(|s| s.input().clone()).await;
        self.submit_case(input).await
    }

    // ── History ──────────────────────────────────────────────────────────

    /// Make a stored report active
    pub async fn select_history(&self, entry_id: Uuid) -> Result<()> {
        self.update(|s| s.select_history(entry_id, &self.followup))
            .await?;
        self.events
            .publish(SessionEvent::HistorySelected { entry_id });
        Ok(())
    }

    /// Make the entry at `index` (0 = newest) active
    pub async fn select_history_at(&self, index: usize) -> Result<Uuid> {
        let entry_id = self
            .update(|s| s.select_history_at(index, &self.followup))
            .await?;
        self.events
            .publish(SessionEvent::HistorySelected { entry_id });
        Ok(entry_id)
    }

    /// Empty history; fails unless `confirmed`
    pub async fn clear_history(&self, confirmed: bool) -> Result<()> {
        self.update(|s| s.clear_history(confirmed)).await?;
        self.events.publish(SessionEvent::HistoryCleared);
        Ok(())
    }

    // ── Dismissal & settings ─────────────────────────────────────────────

    /// Leave the Error state
    pub async fn dismiss_error(&self) -> bool {
        let changed = self.update(Session::dismiss_error).await;
        if changed {
            self.events.publish(SessionEvent::ErrorDismissed);
        }
        changed
    }

    /// Clear the raised alert
    pub async fn dismiss_alert(&self) -> bool {
        let changed = self.update(Session::dismiss_alert).await;
        if changed {
            self.events.publish(SessionEvent::AlertDismissed);
        }
        changed
    }

    /// Change the alert threshold for future reports
    pub async fn set_alert_threshold(&self, threshold: AlertThreshold) {
        self.update(|s| s.set_alert_threshold(threshold)).await;
    }

    // ── Chat ─────────────────────────────────────────────────────────────

    /// Ask a follow-up question and stream the reply into the chat log.
    ///
    /// Resolves when the reply completes, fails, or goes stale.
    #[instrument(skip(self, text))]
    pub async fn send_chat_message(&self, text: &str) -> ChatOutcome {
        let Some(pending) = self.update(|s| s.begin_chat_message(text)).await else {
            debug!("Chat message ignored");
            return ChatOutcome::Ignored;
        };
        let epoch = pending.epoch;

        let mut stream = match pending
            .session
            .send_message(&pending.text, pending.cancel.clone())
            .await
        {
            Ok(stream) => stream,
            Err(e) => return self.fail_chat(epoch, e.user_message()).await,
        };

        if !self.update(|s| s.start_reply(epoch)).await {
            return ChatOutcome::Superseded;
        }

        while let Some(item) = stream.recv().await {
            match item {
                Ok(fragment) => {
                    if !self.update(|s| s.apply_reply_fragment(epoch, &fragment)).await {
                        return ChatOutcome::Superseded;
                    }
                    self.events.publish(SessionEvent::ChatDelta {
                        epoch,
                        delta: fragment,
                    });
                }
                Err(e) => return self.fail_chat(epoch, e.user_message()).await,
            }
        }

        // The forwarder stops without an error item when the reply is cancelled
        if pending.cancel.is_cancelled() {
            return ChatOutcome::Superseded;
        }
        if !self.update(|s| s.finish_reply(epoch)).await {
            return ChatOutcome::Superseded;
        }
        self.events.publish(SessionEvent::ChatFinished { epoch });
        ChatOutcome::Completed
    }

    async fn fail_chat(&self, epoch: u64, error: String) -> ChatOutcome {
        warn!(epoch, error = %error, "Chat reply failed");
        if !self.update(|s| s.fail_reply(epoch)).await {
            return ChatOutcome::Superseded;
        }
        self.events.publish(SessionEvent::ChatFailed { epoch, error });
        ChatOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::report_json;
    use crate::report::Severity;
    use crate::session::{ChatStatus, SessionState, APOLOGY};
    use faultline_llm::MockProvider;

    fn assistant(mock: &MockProvider, threshold: AlertThreshold) -> Assistant {
        let provider: Arc<dyn faultline_llm::GenerativeProvider> = Arc::new(mock.clone());
        Assistant::new(
            DiagnosticClient::new(Arc::clone(&provider)),
            FollowUpClient::new(provider),
            threshold,
        )
    }

    #[tokio::test]
    async fn test_submit_then_chat() {
        let mock = MockProvider::new();
        mock.push_response(report_json("Critical"));
        mock.push_stream(["The ", "issue ", "is resolved."]);
        let assistant = assistant(&mock, AlertThreshold::Level(Severity::High));
        let mut events = assistant.subscribe();

        let outcome = assistant
            .submit_case(CaseInput::new("Smoke from outlet", None, ""))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            SubmissionOutcome::Committed { alert: Some(_), .. }
        ));

        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::SubmissionStarted { .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::SubmissionCompleted { severity: Severity::Critical, .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::AlertRaised { .. }
        ));

        let chat = assistant.send_chat_message("Is it resolved?").await;
        assert_eq!(chat, ChatOutcome::Completed);

        let (text, status) = assistant
            .read(|s| {
                (
                    s.chat().turns().last().map(|t| t.text.clone()),
                    s.chat().status(),
                )
            })
            .await;
        assert_eq!(text.as_deref(), Some("The issue is resolved."));
        assert_eq!(status, ChatStatus::ChatOpen);
    }

    #[tokio::test]
    async fn test_validation_error_surfaces_immediately() {
        let mock = MockProvider::new();
        let assistant = assistant(&mock, AlertThreshold::Disabled);

        let err = assistant.submit_case(CaseInput::default()).await.unwrap_err();
        assert!(matches!(err, crate::Error::Validation(_)));
        assert!(mock.requests().is_empty());
        assert_eq!(assistant.read(|s| s.state()).await, SessionState::Idle);
    }

    #[tokio::test]
    async fn test_diagnostic_failure_keeps_input() {
        let mock = MockProvider::new();
        mock.push_response("{\"faultSummary\": \"half\"}");
        let assistant = assistant(&mock, AlertThreshold::Disabled);

        assistant.set_description("Washer won't drain").await;
        let outcome = assistant.submit_buffered().await.unwrap();
        assert!(matches!(outcome, SubmissionOutcome::Failed { .. }));

        let (state, description, report) = assistant
            .read(|s| {
                (
                    s.state(),
                    s.input().description.clone(),
                    s.active_report().cloned(),
                )
            })
            .await;
        assert_eq!(state, SessionState::Error);
        assert_eq!(description, "Washer won't drain");
        assert!(report.is_none());

        assert!(assistant.dismiss_error().await);
    }

    #[tokio::test]
    async fn test_chat_stream_failure_finalizes_with_apology() {
        let mock = MockProvider::new();
        mock.push_response(report_json("Low"));
        mock.push_stream_failure(["Check the "], faultline_llm::Error::Network("reset".into()));
        let assistant = assistant(&mock, AlertThreshold::Disabled);

        assistant
            .submit_case(CaseInput::new("x", None, ""))
            .await
            .unwrap();
        let outcome = assistant.send_chat_message("how?").await;
        assert_eq!(outcome, ChatOutcome::Failed);

        let turns = assistant.read(|s| s.chat().turns().to_vec()).await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].text, APOLOGY);
        assert!(!turns[1].streaming);
    }

    #[tokio::test]
    async fn test_chat_ignored_without_report() {
        let mock = MockProvider::new();
        let assistant = assistant(&mock, AlertThreshold::Disabled);
        assert_eq!(assistant.send_chat_message("hello").await, ChatOutcome::Ignored);
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_history_navigation_and_clear() {
        let mock = MockProvider::new();
        mock.push_response(report_json("Low"));
        mock.push_response(report_json("High"));
        let assistant = assistant(&mock, AlertThreshold::Level(Severity::Medium));

        assistant.submit_case(CaseInput::new("a", None, "")).await.unwrap();
        assistant.submit_case(CaseInput::new("b", None, "")).await.unwrap();
        assert!(assistant.read(|s| s.alert().is_some()).await);

        let id = assistant.select_history_at(1).await.unwrap();
        let (severity, alert, index) = assistant
            .read(|s| {
                (
                    s.active_report().map(|r| r.risk_assessment.severity),
                    s.alert().is_some(),
                    s.active_history_index(),
                )
            })
            .await;
        assert_eq!(severity, Some(Severity::Low));
        assert!(!alert);
        assert_eq!(index, Some(1));
        assistant.select_history(id).await.unwrap();

        assert!(assistant.clear_history(false).await.is_err());
        assistant.clear_history(true).await.unwrap();
        assert!(assistant.read(|s| s.history().is_empty()).await);
    }
}
