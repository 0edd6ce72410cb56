//! Scenario lifecycle states

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Classification of a completed scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// No failing log entries
    Passed,
    /// At least one assertion failed
    Failed,
    /// Fetch, pipe hook, phase callback or phase timeout error
    Errored,
}

/// Scenario state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "outcome")]
pub enum ScenarioStatus {
    Created,
    /// Blocked on an explicit wait, a dependency, path parameters, a
    /// missing target, or missing phases
    Waiting,
    Executing,
    ResponseReceived,
    RunningPhases,
    Completed(Outcome),
    Skipped,
    Cancelled,
}

impl ScenarioStatus {
    /// Not yet started
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Created | Self::Waiting)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Skipped | Self::Cancelled)
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Completed(Outcome::Passed))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Completed(Outcome::Failed | Outcome::Errored))
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Waiting => write!(f, "waiting"),
            Self::Executing => write!(f, "executing"),
            Self::ResponseReceived => write!(f, "response received"),
            Self::RunningPhases => write!(f, "running phases"),
            Self::Completed(Outcome::Passed) => write!(f, "passed"),
            Self::Completed(Outcome::Failed) => write!(f, "failed"),
            Self::Completed(Outcome::Errored) => write!(f, "errored"),
            Self::Skipped => write!(f, "skipped"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A state transition, delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub title: String,
    pub from: ScenarioStatus,
    pub to: ScenarioStatus,
}

/// Timing marks for one scenario
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    pub initialized: Instant,
    pub execution_started: Option<Instant>,
    pub request_started: Option<Instant>,
    pub response_loaded: Option<Instant>,
    pub finished: Option<Instant>,
}

impl Timing {
    pub fn new() -> Self {
        Self {
            initialized: Instant::now(),
            execution_started: None,
            request_started: None,
            response_loaded: None,
            finished: None,
        }
    }

    /// Time from execution start to finish
    pub fn total(&self) -> Option<Duration> {
        Some(self.finished?.duration_since(self.execution_started?))
    }

    /// Time spent waiting on the adapter
    pub fn request(&self) -> Option<Duration> {
        Some(self.response_loaded?.duration_since(self.request_started?))
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(ScenarioStatus::Skipped.is_terminal());
        assert!(ScenarioStatus::Completed(Outcome::Errored).is_failed());
        assert!(!ScenarioStatus::Skipped.is_failed());
        assert!(ScenarioStatus::Waiting.is_pending());
        assert!(!ScenarioStatus::RunningPhases.is_terminal());
    }

    #[test]
    fn test_timing_requires_both_marks() {
        let mut timing = Timing::new();
        assert!(timing.total().is_none());
        timing.execution_started = Some(timing.initialized);
        timing.finished = Some(timing.initialized + Duration::from_millis(5));
        assert_eq!(timing.total(), Some(Duration::from_millis(5)));
    }
}
