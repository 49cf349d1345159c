//! Chat sub-state: turn log, reply status, and stale-stream epochs

use crate::followup::ChatSession;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Text that replaces a reply that failed to stream
pub const APOLOGY: &str =
    "Sorry, I couldn't finish that answer. Please try asking again in a moment.";

/// Chat sub-state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatStatus {
    /// No report is active
    NoChat,
    /// Ready for a question
    ChatOpen,
    /// A reply is streaming
    AwaitingReply,
}

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    /// The person asking
    User,
    /// The model
    Assistant,
}

/// One visible chat turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    /// Author
    pub role: ChatRole,
    /// Text so far
    pub text: String,
    /// Still receiving fragments
    pub streaming: bool,
}

impl ChatTurn {
    fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            streaming: false,
        }
    }

    fn assistant(text: impl Into<String>, streaming: bool) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
            streaming,
        }
    }
}

/// A question accepted by the log, ready to be sent upstream
#[derive(Debug, Clone)]
pub struct PendingReply {
    /// Epoch the reply belongs to
    pub epoch: u64,
    /// Session to send through
    pub session: ChatSession,
    /// Trimmed question text
    pub text: String,
    /// Cancelled when the reply goes stale
    pub cancel: CancellationToken,
}

/// Turn log plus the open session handle
#[derive(Debug, Default)]
pub struct ChatLog {
    turns: Vec<ChatTurn>,
    session: Option<ChatSession>,
    awaiting: bool,
    epoch: u64,
    cancel: Option<CancellationToken>,
}

impl ChatLog {
    /// Current sub-state
    #[must_use]
    pub fn status(&self) -> ChatStatus {
        match (&self.session, self.awaiting) {
            (None, _) => ChatStatus::NoChat,
            (Some(_), false) => ChatStatus::ChatOpen,
            (Some(_), true) => ChatStatus::AwaitingReply,
        }
    }

    /// Visible turns, oldest first
    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Current epoch
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Open session handle, if any
    #[must_use]
    pub fn session(&self) -> Option<&ChatSession> {
        self.session.as_ref()
    }

    /// Drop turns and session, and mark any in-flight reply stale
    pub(crate) fn reset(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.turns.clear();
        self.session = None;
        self.awaiting = false;
        self.epoch += 1;
    }

    /// Reset, then attach a fresh session
    pub(crate) fn open(&mut self, session: ChatSession) {
        self.reset();
        self.session = Some(session);
    }

    /// Accept a question.
    ///
    /// Returns `None` without changing anything when the text is blank, no
    /// session is open, or a reply is already streaming.
    pub(crate) fn begin_message(&mut self, text: &str) -> Option<PendingReply> {
        let text = text.trim();
        if text.is_empty() || self.awaiting {
            return None;
        }
        let session = self.session.clone()?;

        let cancel = CancellationToken::new();
        self.turns.push(ChatTurn::user(text));
        self.awaiting = true;
        self.cancel = Some(cancel.clone());

        Some(PendingReply {
            epoch: self.epoch,
            session,
            text: text.to_string(),
            cancel,
        })
    }

    fn is_current(&self, epoch: u64) -> bool {
        let current = epoch == self.epoch && self.awaiting;
        if !current {
            debug!(epoch, current = self.epoch, "Dropping stale chat update");
        }
        current
    }

    fn trailing_reply(&mut self) -> Option<&mut ChatTurn> {
        self.turns
            .last_mut()
            .filter(|t| t.role == ChatRole::Assistant && t.streaming)
    }

    /// Append the empty assistant turn that fragments will fill
    pub(crate) fn start_reply(&mut self, epoch: u64) -> bool {
        if !self.is_current(epoch) {
            return false;
        }
        if self.trailing_reply().is_none() {
            self.turns.push(ChatTurn::assistant("", true));
        }
        true
    }

    /// Append a fragment to the trailing assistant turn
    pub(crate) fn apply_fragment(&mut self, epoch: u64, fragment: &str) -> bool {
        if !self.is_current(epoch) {
            return false;
        }
        match self.trailing_reply() {
            Some(turn) => turn.text.push_str(fragment),
            None => self.turns.push(ChatTurn::assistant(fragment, true)),
        }
        true
    }

    /// Freeze the trailing turn and reopen the chat
    pub(crate) fn finish_reply(&mut self, epoch: u64) -> bool {
        if !self.is_current(epoch) {
            return false;
        }
        if let Some(turn) = self.trailing_reply() {
            turn.streaming = false;
        }
        self.awaiting = false;
        self.cancel = None;
        true
    }

    /// Replace the trailing turn with the apology and reopen the chat
    pub(crate) fn fail_reply(&mut self, epoch: u64) -> bool {
        if !self.is_current(epoch) {
            return false;
        }
        match self.trailing_reply() {
            Some(turn) => {
                turn.text = APOLOGY.to_string();
                turn.streaming = false;
            }
            None => self.turns.push(ChatTurn::assistant(APOLOGY, false)),
        }
        self.awaiting = false;
        self.cancel = None;
        true
    }
}
