//! Severity alert rule

use crate::error::Error;
use crate::report::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum severity that raises an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AlertThreshold {
    /// Never alert
    #[default]
    Disabled,
    /// Alert at or above this severity
    Level(Severity),
}

impl AlertThreshold {
    /// Evaluate the rule against a report severity
    #[must_use]
    pub fn evaluate(&self, severity: Severity) -> Option<Alert> {
        match self {
            Self::Disabled => None,
            Self::Level(threshold) if severity.rank() >= threshold.rank() => Some(Alert {
                severity,
                threshold: *threshold,
            }),
            Self::Level(_) => None,
        }
    }
}

impl fmt::Display for AlertThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Level(s) => f.write_str(&s.as_str().to_ascii_lowercase()),
        }
    }
}

impl FromStr for AlertThreshold {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("disabled") || s.eq_ignore_ascii_case("off") {
            return Ok(Self::Disabled);
        }
        s.parse::<Severity>().map(Self::Level).map_err(|_| {
            Error::Validation(format!(
                "unknown alert threshold '{}' (expected disabled, low, medium, high, or critical)",
                s
            ))
        })
    }
}

impl TryFrom<String> for AlertThreshold {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AlertThreshold> for String {
    fn from(value: AlertThreshold) -> Self {
        value.to_string()
    }
}

/// A raised alert. At most one exists per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    /// Severity of the report that raised it
    pub severity: Severity,
    /// Threshold in effect
    pub threshold: Severity,
}

impl Alert {
    /// Message naming both the severity and the threshold
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "{} severity detected (alert threshold: {})",
            self.severity, self.threshold
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_iff_rank_at_or_above_threshold() {
        for t in Severity::ALL {
            for s in Severity::ALL {
                let alert = AlertThreshold::Level(t).evaluate(s);
                assert_eq!(alert.is_some(), s.rank() >= t.rank(), "t={t} s={s}");
            }
        }
    }

    #[test]
    fn test_examples() {
        let high = AlertThreshold::Level(Severity::High);
        assert!(high.evaluate(Severity::Critical).is_some());
        assert!(high.evaluate(Severity::Medium).is_none());
    }

    #[test]
    fn test_disabled_never_alerts() {
        for s in Severity::ALL {
            assert!(AlertThreshold::Disabled.evaluate(s).is_none());
        }
    }

    #[test]
    fn test_message_names_both_values() {
        let alert = AlertThreshold::Level(Severity::High)
            .evaluate(Severity::Critical)
            .unwrap();
        let msg = alert.message();
        assert!(msg.contains("Critical"));
        assert!(msg.contains("High"));
    }

    #[test]
    fn test_parse_and_serde() {
        assert_eq!("disabled".parse::<AlertThreshold>().unwrap(), AlertThreshold::Disabled);
        assert_eq!(
            "HIGH".parse::<AlertThreshold>().unwrap(),
            AlertThreshold::Level(Severity::High)
        );
        assert!("sometimes".parse::<AlertThreshold>().is_err());

        let json = serde_json::to_string(&AlertThreshold::Level(Severity::Medium)).unwrap();
        assert_eq!(json, "\"medium\"");
        let back: AlertThreshold = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(back, AlertThreshold::Level(Severity::Critical));
    }
}
