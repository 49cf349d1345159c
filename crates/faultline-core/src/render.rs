//! Plain-text report renderer
//!
//! Pure functions from validated state to display strings. No styling beyond
//! headings, indentation, and a bracketed severity badge.

use crate::alert::Alert;
use crate::history::History;
use crate::report::{DiagnosticReport, FixPriority, Severity};
use crate::session::{ChatRole, ChatTurn};
use std::fmt::Write;

const RULE: &str = "────────────────────────────────────────";

/// Bracketed severity badge, e.g. `[HIGH]`
#[must_use]
pub fn severity_badge(severity: Severity) -> String {
    format!("[{}]", severity.as_str().to_ascii_uppercase())
}

fn priority_tag(priority: FixPriority) -> &'static str {
    match priority {
        FixPriority::Urgent => "URGENT",
        FixPriority::Recommended => "recommended",
        FixPriority::Optional => "optional",
    }
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}\n{}", title, "-".repeat(title.chars().count()));
}

fn bullets(out: &mut String, items: &[String], empty: &str) {
    if items.is_empty() {
        let _ = writeln!(out, "  {}", empty);
    }
    for item in items {
        let _ = writeln!(out, "  • {}", item);
    }
}

/// Render a full report
#[must_use]
pub fn render_report(report: &DiagnosticReport) -> String {
    let mut out = String::new();
    let risk = &report.risk_assessment;

    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "{} {}", severity_badge(risk.severity), report.fault_summary);
    let _ = writeln!(out, "{}", RULE);

    heading(&mut out, "Possible causes");
    for (i, cause) in report.possible_causes.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, cause);
    }
    if report.possible_causes.is_empty() {
        let _ = writeln!(out, "  None identified");
    }

    heading(&mut out, "Risk assessment");
    let _ = writeln!(out, "  Severity: {}", risk.severity);
    let _ = writeln!(out, "  {}", risk.summary);
    let _ = writeln!(out, "  If ignored:");
    bullets(&mut out, &risk.potential_consequences, "Nothing noted");
    let _ = writeln!(out, "  Stay safe:");
    bullets(&mut out, &risk.mitigation_steps, "No special precautions");

    heading(&mut out, "Troubleshooting");
    for step in report.ordered_steps() {
        let _ = writeln!(out, "  {}. {}", step.step, step.action);
        let _ = writeln!(out, "     {}", step.details);
    }

    heading(&mut out, "Recommended fixes");
    for fix in &report.recommended_fixes {
        let _ = writeln!(out, "  ({}) {}", priority_tag(fix.priority), fix.fix);
        let _ = writeln!(out, "     {}", fix.details);
    }

    heading(&mut out, "In plain terms");
    let _ = writeln!(out, "  {}", report.simplified_explanation);

    heading(&mut out, "Tools");
    bullets(&mut out, &report.tools_and_parts.tools, "None");
    heading(&mut out, "Parts");
    bullets(&mut out, &report.tools_and_parts.parts, "None");

    out
}

/// Render the raised alert as a banner
#[must_use]
pub fn render_alert(alert: &Alert) -> String {
    format!("!! {} !!", alert.message())
}

/// Render one chat turn
#[must_use]
pub fn render_turn(turn: &ChatTurn) -> String {
    let who = match turn.role {
        ChatRole::User => "you",
        ChatRole::Assistant => "tech",
    };
    let cursor = if turn.streaming { "▍" } else { "" };
    format!("{}> {}{}", who, turn.text, cursor)
}

/// Render the history list, marking the active entry
#[must_use]
pub fn render_history(history: &History, active: Option<usize>) -> String {
    if history.is_empty() {
        return "No diagnoses yet.".to_string();
    }

    let mut out = String::new();
    for (i, entry) in history.iter().enumerate() {
        let marker = if active == Some(i) { "*" } else { " " };
        let report = entry.report();
        let mut inputs = Vec::new();
        if entry.input().has_description {
            inputs.push("text");
        }
        if entry.input().has_image {
            inputs.push("photo");
        }
        if !entry.input().transcript.is_empty() {
            inputs.push("voice");
        }
        let _ = writeln!(
            out,
            "{} {:>2}. {} {} {} ({})",
            marker,
            i + 1,
            entry.created_at().format("%H:%M:%S"),
            severity_badge(report.risk_assessment.severity),
            report.fault_summary,
            inputs.join("+"),
        );
    }
    out
}
