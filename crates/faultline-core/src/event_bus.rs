//! EventBus - broadcast-based event system for session updates.
//!
//! The [`crate::Assistant`] publishes an event after each state transition so
//! renderers can redraw without polling the session.

use crate::report::Severity;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted by the assistant.
///
/// Events carry identifiers and short strings only; full reports and image
/// data are read from the session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A case was accepted for diagnosis
    SubmissionStarted {
        /// Submission ticket
        ticket: u64,
    },
    /// A report was stored and made active
    SubmissionCompleted {
        /// Submission ticket
        ticket: u64,
        /// New history entry
        entry_id: Uuid,
        /// Report severity
        severity: Severity,
    },
    /// Diagnosis failed
    SubmissionFailed {
        /// Submission ticket
        ticket: u64,
        /// User-facing error message
        error: String,
    },
    /// A result arrived after being superseded and was dropped
    SubmissionSuperseded {
        /// Submission ticket
        ticket: u64,
    },
    /// The report's severity met the alert threshold
    AlertRaised {
        /// Report severity
        severity: Severity,
        /// Threshold in effect
        threshold: Severity,
        /// Alert text
        message: String,
    },
    /// The raised alert was dismissed
    AlertDismissed,
    /// The Error state was dismissed
    ErrorDismissed,
    /// A stored report was made active
    HistorySelected {
        /// Selected entry
        entry_id: Uuid,
    },
    /// History was emptied
    HistoryCleared,
    /// Streaming text delta for the trailing assistant turn
    ChatDelta {
        /// Chat epoch
        epoch: u64,
        /// Text chunk
        delta: String,
    },
    /// Reply completed
    ChatFinished {
        /// Chat epoch
        epoch: u64,
    },
    /// Reply failed and was replaced with an apology
    ChatFailed {
        /// Chat epoch
        epoch: u64,
        /// Error description (sanitized)
        error: String,
    },
}

/// Broadcast-based event bus for session events.
///
/// Uses `tokio::broadcast` so multiple subscribers can receive the same events.
/// Slow subscribers will miss events (lagged) rather than blocking the publisher.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all active subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, event: SessionEvent) -> usize {
        // send() returns Err if there are no receivers, which is fine
        self.sender.send(event).unwrap_or(0)
    }

    /// Get the current number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
