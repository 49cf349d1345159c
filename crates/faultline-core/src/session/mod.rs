//! Session state machine
//!
//! [`Session`] owns every piece of per-process state: input buffers, the
//! submission lifecycle, the active report, history, alerting, and the chat
//! log. All transitions are plain synchronous methods; the async driver in
//! [`crate::assistant`] holds the session behind one lock and applies each
//! event atomically.
//!
//! ```text
//! Idle ──submit──▶ Submitting ──ok──▶ ReportReady ──submit──▶ Submitting
//!                      │
//!                      └──err──▶ Error ──dismiss/submit──▶ Idle/Submitting
//! ```

mod chat;

pub use chat::{ChatLog, ChatRole, ChatStatus, ChatTurn, PendingReply, APOLOGY};

use crate::alert::{Alert, AlertThreshold};
use crate::error::{Error, Result, UserFriendlyError};
use crate::followup::FollowUpClient;
use crate::history::{History, HistoryEntry};
use crate::input::{CaseInput, ImageInput, InputSummary};
use crate::report::DiagnosticReport;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Submission lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing submitted, or error dismissed
    Idle,
    /// Waiting on the diagnostic client
    Submitting,
    /// A report is active
    ReportReady,
    /// Last submission failed
    Error,
}

/// Accepted submission handed to the diagnostic client
#[derive(Debug, Clone)]
pub struct Submission {
    /// Monotonic ticket; only the latest one may commit
    pub ticket: u64,
    /// Snapshot of the input that was submitted
    pub input: CaseInput,
}

/// What happened when a submission completed
#[derive(Debug)]
pub enum SubmissionOutcome {
    /// Report stored and made active
    Committed {
        /// New history entry
        entry_id: Uuid,
        /// Alert raised by this report, if any
        alert: Option<Alert>,
    },
    /// Diagnosis failed; input kept for retry
    Failed {
        /// The failure
        error: Error,
    },
    /// A later submission or navigation superseded this one
    Stale,
}

/// Per-process session state
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    input: CaseInput,
    last_error: Option<String>,
    active_report: Option<Arc<DiagnosticReport>>,
    active_entry: Option<Uuid>,
    history: History,
    chat: ChatLog,
    alert_threshold: AlertThreshold,
    alert: Option<Alert>,
    next_ticket: u64,
    /// Ticket in flight and the summary of the input it carries
    pending: Option<(u64, InputSummary)>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(AlertThreshold::default())
    }
}

impl Session {
    /// Create an idle session
    #[must_use]
    pub fn new(alert_threshold: AlertThreshold) -> Self {
        Self {
            state: SessionState::Idle,
            input: CaseInput::default(),
            last_error: None,
            active_report: None,
            active_entry: None,
            history: History::new(),
            chat: ChatLog::default(),
            alert_threshold,
            alert: None,
            next_ticket: 0,
            pending: None,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    /// Submission lifecycle state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current input buffers
    #[must_use]
    pub fn input(&self) -> &CaseInput {
        &self.input
    }

    /// Message from the last failed submission
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The active report
    #[must_use]
    pub fn active_report(&self) -> Option<&Arc<DiagnosticReport>> {
        self.active_report.as_ref()
    }

    /// History entry backing the active report
    #[must_use]
    pub fn active_entry_id(&self) -> Option<Uuid> {
        self.active_entry
    }

    /// Position of the active entry in history (0 = newest)
    #[must_use]
    pub fn active_history_index(&self) -> Option<usize> {
        self.active_entry.and_then(|id| self.history.index_of(id))
    }

    /// All entries, newest first
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Chat log and sub-state
    #[must_use]
    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    /// Configured alert threshold
    #[must_use]
    pub fn alert_threshold(&self) -> AlertThreshold {
        self.alert_threshold
    }

    /// Currently raised alert
    #[must_use]
    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    /// A submission is in flight
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.pending.is_some()
    }

    // ── Input buffers ────────────────────────────────────────────────────

    /// Replace the written description
    pub fn set_description(&mut self, text: impl Into<String>) {
        self.input.description = text.into();
    }

    /// Attach a photo
    pub fn set_image(&mut self, image: ImageInput) {
        self.input.image = Some(image);
    }

    /// Remove the photo
    pub fn clear_image(&mut self) {
        self.input.image = None;
    }

    /// Replace the voice note transcript
    pub fn set_transcript(&mut self, text: impl Into<String>) {
        self.input.transcript = text.into();
    }

    /// Empty every input buffer
    pub fn clear_input(&mut self) {
        self.input = CaseInput::default();
    }

    // ── Submission ───────────────────────────────────────────────────────

    /// Accept a case for diagnosis.
    ///
    /// Empty input fails with [`Error::Validation`] and changes nothing.
    /// Otherwise the buffers take the submitted values, the previous report,
    /// error, alert, and chat are cleared, and a new ticket supersedes any
    /// submission still in flight.
    pub fn begin_submission(&mut self, input: CaseInput) -> Result<Submission> {
        if input.is_empty() {
            return Err(Error::Validation(
                "a description, photo, or voice note is required".to_string(),
            ));
        }

        if let Some((old, _)) = &self.pending {
            debug!(ticket = *old, "Superseding in-flight submission");
        }

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.pending = Some((ticket, input.summary()));

        self.input = input.clone();
        self.last_error = None;
        self.active_report = None;
        self.active_entry = None;
        self.alert = None;
        self.chat.reset();
        self.state = SessionState::Submitting;

        info!(ticket, has_image = input.image.is_some(), "Submission started");
        Ok(Submission { ticket, input })
    }

    /// Apply the diagnostic client's result for `ticket`.
    ///
    /// Results for any ticket other than the latest pending one are dropped.
    pub fn complete_submission(
        &mut self,
        ticket: u64,
        result: Result<DiagnosticReport>,
        followup: &FollowUpClient,
    ) -> SubmissionOutcome {
        let summary = match self.pending.take() {
            Some((pending, summary)) if pending == ticket => summary,
            other => {
                let pending = other.as_ref().map(|(t, _)| *t);
                self.pending = other;
                warn!(
                    ticket,
                    pending = ?pending,
                    ok = result.is_ok(),
                    "Dropping stale submission result"
                );
                return SubmissionOutcome::Stale;
            }
        };

        match result {
            Ok(report) => {
                let report = Arc::new(report);
                let entry = HistoryEntry::new(Arc::clone(&report), summary);
                let entry_id = entry.id();
                self.history.prepend(entry);

                self.chat.open(followup.open_session(&report));
                self.alert = self
                    .alert_threshold
                    .evaluate(report.risk_assessment.severity);
                self.active_report = Some(report);
                self.active_entry = Some(entry_id);
                self.last_error = None;
                self.input = CaseInput::default();
                self.state = SessionState::ReportReady;

                info!(ticket, entry_id = %entry_id, alert = self.alert.is_some(), "Report ready");
                SubmissionOutcome::Committed {
                    entry_id,
                    alert: self.alert,
                }
            }
            Err(error) => {
                warn!(ticket, error = %error, "Submission failed");
                self.last_error = Some(error.user_message());
                self.state = SessionState::Error;
                SubmissionOutcome::Failed { error }
            }
        }
    }

    // ── History ──────────────────────────────────────────────────────────

    /// Make a stored report active.
    ///
    /// Opens a fresh chat scoped to that report, clears the alert, and
    /// supersedes any submission still in flight.
    pub fn select_history(&mut self, entry_id: Uuid, followup: &FollowUpClient) -> Result<()> {
        let report = self
            .history
            .get(entry_id)
            .map(|e| Arc::clone(e.report()))
            .ok_or(Error::HistoryEntryNotFound(entry_id))?;

        if let Some((ticket, _)) = self.pending.take() {
            debug!(ticket, "History selection superseded in-flight submission");
        }

        self.chat.open(followup.open_session(&report));
        self.active_report = Some(report);
        self.active_entry = Some(entry_id);
        self.alert = None;
        self.last_error = None;
        self.state = SessionState::ReportReady;
        Ok(())
    }

    /// Make the entry at `index` (0 = newest) active
    pub fn select_history_at(&mut self, index: usize, followup: &FollowUpClient) -> Result<Uuid> {
        let id = self
            .history
            .at(index)
            .map(HistoryEntry::id)
            .ok_or_else(|| {
                Error::Validation(format!("no history entry at position {}", index + 1))
            })?;
        self.select_history(id, followup)?;
        Ok(id)
    }

    /// Empty history and clear the active report, chat, and alert.
    ///
    /// Requires `confirmed`; an in-flight submission is left running.
    pub fn clear_history(&mut self, confirmed: bool) -> Result<()> {
        if !confirmed {
            return Err(Error::ConfirmationRequired(
                "clearing history cannot be undone".to_string(),
            ));
        }

        let removed = self.history.len();
        self.history.clear();
        self.active_report = None;
        self.active_entry = None;
        self.alert = None;
        self.chat.reset();
        if self.state == SessionState::ReportReady {
            self.state = SessionState::Idle;
        }
        info!(removed, "History cleared");
        Ok(())
    }

    // ── Dismissal & settings ─────────────────────────────────────────────

    /// Leave the Error state. Returns whether anything changed.
    pub fn dismiss_error(&mut self) -> bool {
        if self.state != SessionState::Error {
            return false;
        }
        self.state = SessionState::Idle;
        self.last_error = None;
        true
    }

    /// Clear the raised alert. Returns whether one was raised.
    pub fn dismiss_alert(&mut self) -> bool {
        self.alert.take().is_some()
    }

    /// Change the threshold used for future reports
    pub fn set_alert_threshold(&mut self, threshold: AlertThreshold) {
        self.alert_threshold = threshold;
    }

    // ── Chat ─────────────────────────────────────────────────────────────

    /// Accept a chat question; `None` means the message was ignored
    pub fn begin_chat_message(&mut self, text: &str) -> Option<PendingReply> {
        self.chat.begin_message(text)
    }

    /// Add the empty assistant turn for `epoch`
    pub fn start_reply(&mut self, epoch: u64) -> bool {
        self.chat.start_reply(epoch)
    }

    /// Append a reply fragment; `false` means the reply went stale
    pub fn apply_reply_fragment(&mut self, epoch: u64, fragment: &str) -> bool {
        self.chat.apply_fragment(epoch, fragment)
    }

    /// Freeze the reply
    pub fn finish_reply(&mut self, epoch: u64) -> bool {
        self.chat.finish_reply(epoch)
    }

    /// Replace the reply with the apology
    pub fn fail_reply(&mut self, epoch: u64) -> bool {
        self.chat.fail_reply(epoch)
    }
}
