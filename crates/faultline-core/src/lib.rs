//! Faultline Core - diagnostic session engine
//!
//! This crate provides:
//! - Report model with strict decode and validation
//! - Diagnostic client (structured report generation)
//! - Follow-up chat sessions with streamed replies
//! - Session state machine (submission, history, alerting, chat)
//! - Async `Assistant` driver and event bus
//! - Plain-text report rendering

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alert;
pub mod assistant;
pub mod diagnostic;
pub mod error;
pub mod event_bus;
pub mod followup;
pub mod history;
pub mod input;
pub mod render;
pub mod report;
pub mod session;

pub use alert::{Alert, AlertThreshold};
pub use assistant::{Assistant, ChatOutcome};
pub use diagnostic::DiagnosticClient;
pub use error::{format_error_for_cli, Error, Result, UserFriendlyError};
pub use event_bus::{EventBus, SessionEvent};
pub use followup::{ChatSession, FollowUpClient, ReplyStream};
pub use history::{History, HistoryEntry};
pub use input::{CaseInput, ImageInput, InputSummary};
pub use report::{
    decode_report, report_schema, DiagnosticReport, FixPriority, RecommendedFix, RiskAssessment,
    Severity, ToolsAndParts, TroubleshootingStep,
};
pub use session::{
    ChatLog, ChatRole, ChatStatus, ChatTurn, Session, SessionState, Submission, SubmissionOutcome,
};
