//! Scenario result log
//!
//! Ordered, append-only. Pass/fail state is derived by scanning entry kinds.

use serde::Serialize;

/// Kind of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Heading,
    Subheading,
    Comment,
    Pass,
    Fail,
    /// A failure marked optional; never fails the scenario
    Warning,
}

/// One log entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub message: String,
    /// Extra context such as the actual value of a failed assertion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl LogEntry {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_failure(&self) -> bool {
        self.kind == LogKind::Fail
    }
}

/// Append-only log for one scenario
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Log {
    entries: Vec<LogEntry>,
}

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// At least one failing entry exists
    pub fn has_failed(&self) -> bool {
        self.entries.iter().any(LogEntry::is_failure)
    }

    pub fn failures(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| e.is_failure())
    }

    pub fn count(&self, kind: LogKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_and_failure_scan() {
        let mut log = Log::new();
        log.push(LogEntry::new(LogKind::Heading, "Homepage"));
        log.push(LogEntry::new(LogKind::Pass, "Loaded html /"));
        log.push(LogEntry::new(LogKind::Warning, "Optional check failed"));
        assert!(!log.has_failed());

        log.push(LogEntry::new(LogKind::Fail, "Title exists"));
        assert!(log.has_failed());
        assert_eq!(log.count(LogKind::Pass), 1);

        let kinds: Vec<LogKind> = log.entries().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![LogKind::Heading, LogKind::Pass, LogKind::Warning, LogKind::Fail]
        );
    }

    #[test]
    fn test_serializes_as_list() {
        let mut log = Log::new();
        log.push(LogEntry::new(LogKind::Fail, "status").with_detail("actual 500"));
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"kind": "fail", "message": "status", "detail": "actual 500"}])
        );
    }
}
