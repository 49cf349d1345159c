//! Diagnostic report model
//!
//! The report is produced only by [`decode_report`], which parses the model's
//! raw JSON and validates it. There is no partially-filled report: any missing
//! field, unknown enum value, or structural violation is a decode error.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

/// Risk severity, ordered `Low < Medium < High < Critical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Cosmetic or convenience issue
    Low,
    /// Degraded function, no immediate hazard
    Medium,
    /// Likely damage or safety concern
    High,
    /// Stop using the equipment now
    Critical,
}

impl Severity {
    /// All severities in rank order
    pub const ALL: [Severity; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Numeric rank, 0 for `Low` through 3 for `Critical`
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Validation(format!("unknown severity: {}", s)))
    }
}

/// Priority of a recommended fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixPriority {
    /// Should be done
    Recommended,
    /// Nice to have
    Optional,
    /// Do before further use
    Urgent,
}

impl FixPriority {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recommended => "Recommended",
            Self::Optional => "Optional",
            Self::Urgent => "Urgent",
        }
    }
}

/// Risk section of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// Overall severity
    pub severity: Severity,
    /// One-paragraph risk summary
    pub summary: String,
    /// What can happen if left unaddressed
    pub potential_consequences: Vec<String>,
    /// How to reduce risk in the meantime
    pub mitigation_steps: Vec<String>,
}

/// One numbered troubleshooting step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TroubleshootingStep {
    /// 1-based step number
    pub step: u32,
    /// Short imperative action
    pub action: String,
    /// How to carry it out and what to look for
    pub details: String,
}

/// One recommended fix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedFix {
    /// The fix itself
    pub fix: String,
    /// How important it is
    pub priority: FixPriority,
    /// Supporting explanation
    pub details: String,
}

/// Tools and replacement parts needed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsAndParts {
    /// Tools needed
    pub tools: Vec<String>,
    /// Replacement parts or consumables
    pub parts: Vec<String>,
}

/// A validated, immutable diagnostic report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    /// One-sentence statement of the fault
    pub fault_summary: String,
    /// Likely causes, most likely first
    pub possible_causes: Vec<String>,
    /// Risk section
    pub risk_assessment: RiskAssessment,
    /// Ordered troubleshooting procedure
    pub troubleshooting_steps: Vec<TroubleshootingStep>,
    /// Fixes, in the order they should be considered
    pub recommended_fixes: Vec<RecommendedFix>,
    /// Plain-language explanation for non-experts
    pub simplified_explanation: String,
    /// Required tools and parts
    pub tools_and_parts: ToolsAndParts,
}

impl DiagnosticReport {
    /// Check structural rules serde cannot express.
    ///
    /// Step numbers must be unique and 1-based. Gaps are tolerated but logged.
    pub fn validate(&self) -> Result<()> {
        if self.fault_summary.trim().is_empty() {
            return Err(Error::Diagnostic("report has an empty fault summary".to_string()));
        }

        let mut seen = HashSet::new();
        for step in &self.troubleshooting_steps {
            if step.step == 0 {
                return Err(Error::Diagnostic(
                    "troubleshooting step numbers must start at 1".to_string(),
                ));
            }
            if !seen.insert(step.step) {
                return Err(Error::Diagnostic(format!(
                    "duplicate troubleshooting step number {}",
                    step.step
                )));
            }
        }

        let contiguous = (1..=self.troubleshooting_steps.len() as u32).all(|n| seen.contains(&n));
        if !contiguous {
            warn!(
                steps = ?self.troubleshooting_steps.iter().map(|s| s.step).collect::<Vec<_>>(),
                "troubleshooting steps are not contiguous"
            );
        }

        Ok(())
    }

    /// Steps sorted by step number
    #[must_use]
    pub fn ordered_steps(&self) -> Vec<&TroubleshootingStep> {
        let mut steps: Vec<_> = self.troubleshooting_steps.iter().collect();
        steps.sort_by_key(|s| s.step);
        steps
    }
}

/// Parse and validate the model's raw output.
///
/// The text is trimmed and must be exactly one JSON object matching
/// [`report_schema`]; anything else is [`Error::Diagnostic`].
pub fn decode_report(raw: &str) -> Result<DiagnosticReport> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Diagnostic("model returned an empty response".to_string()));
    }

    let report: DiagnosticReport = serde_json::from_str(trimmed)
        .map_err(|e| Error::Diagnostic(format!("malformed report: {}", e)))?;
    report.validate()?;
    Ok(report)
}

fn string_array(description: &str) -> serde_json::Value {
    json!({
        "type": "array",
        "description": description,
        "items": { "type": "string" }
    })
}

/// Output schema that constrains the model to the [`DiagnosticReport`] shape
#[must_use]
pub fn report_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "faultSummary": {
                "type": "string",
                "description": "One or two sentences naming the most likely fault."
            },
            "possibleCauses": string_array("Likely causes, most likely first."),
            "riskAssessment": {
                "type": "object",
                "properties": {
                    "severity": {
                        "type": "string",
                        "enum": ["Low", "Medium", "High", "Critical"]
                    },
                    "summary": { "type": "string" },
                    "potentialConsequences": string_array("What can happen if this is ignored."),
                    "mitigationSteps": string_array("How to stay safe until it is fixed.")
                },
                "required": ["severity", "summary", "potentialConsequences", "mitigationSteps"]
            },
            "troubleshootingSteps": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "step": { "type": "integer", "description": "1-based step number." },
                        "action": { "type": "string" },
                        "details": { "type": "string" }
                    },
                    "required": ["step", "action", "details"]
                }
            },
            "recommendedFixes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "fix": { "type": "string" },
                        "priority": {
                            "type": "string",
                            "enum": ["Recommended", "Optional", "Urgent"]
                        },
                        "details": { "type": "string" }
                    },
                    "required": ["fix", "priority", "details"]
                }
            },
            "simplifiedExplanation": {
                "type": "string",
                "description": "The diagnosis explained to someone with no technical background."
            },
            "toolsAndParts": {
                "type": "object",
                "properties": {
                    "tools": string_array("Tools needed."),
                    "parts": string_array("Replacement parts or consumables.")
                },
                "required": ["tools", "parts"]
            }
        },
        "required": [
            "faultSummary",
            "possibleCauses",
            "riskAssessment",
            "troubleshootingSteps",
            "recommendedFixes",
            "simplifiedExplanation",
            "toolsAndParts"
        ]
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A well-formed report with the given severity
    pub(crate) fn report_json(severity: &str) -> String {
        json!({
            "faultSummary": "Worn drive belt slipping on the drum pulley.",
            "possibleCauses": ["Belt wear", "Loose tensioner"],
            "riskAssessment": {
                "severity": severity,
                "summary": "Belt may snap during a cycle.",
                "potentialConsequences": ["Motor strain"],
                "mitigationSteps": ["Avoid heavy loads"]
            },
            "troubleshootingSteps": [
                { "step": 1, "action": "Unplug the dryer", "details": "Disconnect mains power." },
                { "step": 2, "action": "Inspect the belt", "details": "Look for glazing or cracks." }
            ],
            "recommendedFixes": [
                { "fix": "Replace the drive belt", "priority": "Recommended", "details": "OEM part." }
            ],
            "simplifiedExplanation": "The rubber band that spins the drum is worn out.",
            "toolsAndParts": { "tools": ["Nut driver"], "parts": ["Drive belt"] }
        })
        .to_string()
    }

    pub(crate) fn report(severity: Severity) -> DiagnosticReport {
        decode_report(&report_json(severity.as_str())).expect("fixture decodes")
    }
}
