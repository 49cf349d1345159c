//! Session-scoped diagnosis history

use crate::input::InputSummary;
use crate::report::DiagnosticReport;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

/// One completed diagnosis. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    id: Uuid,
    created_at: DateTime<Utc>,
    report: Arc<DiagnosticReport>,
    input: InputSummary,
}

impl HistoryEntry {
    /// Create an entry stamped now
    #[must_use]
    pub fn new(report: Arc<DiagnosticReport>, input: InputSummary) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            report,
            input,
        }
    }

    /// Entry identifier
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Creation time
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The stored report
    #[must_use]
    pub fn report(&self) -> &Arc<DiagnosticReport> {
        &self.report
    }

    /// Redacted input summary
    #[must_use]
    pub fn input(&self) -> &InputSummary {
        &self.input
    }
}

/// Newest-first list of entries
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
}

impl History {
    /// Create an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the head
    pub fn prepend(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
    }

    /// Entry by id
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entry at a position (0 = newest)
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    /// Position of an entry
    #[must_use]
    pub fn index_of(&self, id: Uuid) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Iterate newest first
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether history is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{fixtures, Severity};

    fn entry(severity: Severity) -> HistoryEntry {
        HistoryEntry::new(Arc::new(fixtures::report(severity)), InputSummary::default())
    }

    #[test]
    fn test_prepend_is_newest_first() {
        let mut history = History::new();
        let first = entry(Severity::Low);
        let second = entry(Severity::High);
        let (first_id, second_id) = (first.id(), second.id());

        history.prepend(first);
        history.prepend(second);

        assert_eq!(history.len(), 2);
        assert_eq!(history.at(0).unwrap().id(), second_id);
        assert_eq!(history.index_of(first_id), Some(1));
        assert!(history.get(first_id).is_some());
        assert!(history.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_clear() {
        let mut history = History::new();
        history.prepend(entry(Severity::Low));
        history.clear();
        assert!(history.is_empty());
        history.clear();
        assert!(history.is_empty());
    }
}
