//! Outcome records emitted by the scheduler

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::context::TestState;
use crate::error::StepError;

/// Where in a test's lifecycle a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePhase {
    BeforeAll,
    BeforeEach,
    Body,
    AfterEach,
    AfterAll,
}

impl FailurePhase {
    /// Whether the failure came from a hook rather than the test body
    pub fn is_hook(&self) -> bool {
        !matches!(self, FailurePhase::Body)
    }
}

impl fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailurePhase::BeforeAll => "\"before all\" hook",
            FailurePhase::BeforeEach => "\"before each\" hook",
            FailurePhase::Body => "test body",
            FailurePhase::AfterEach => "\"after each\" hook",
            FailurePhase::AfterAll => "\"after all\" hook",
        };
        f.write_str(s)
    }
}

/// Reference to an artifact captured for a failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub path: PathBuf,

    /// SHA-256 of the artifact contents, hex encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// One recorded failure of a test or hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub phase: FailurePhase,

    /// Path of the suite that owns the failing hook, for hook failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hook_suite: Vec<String>,

    pub message: String,

    /// Whether a polled assertion ran out of time
    #[serde(default)]
    pub timed_out: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactRef>,
}

impl FailureDetail {
    pub fn new(phase: FailurePhase, error: &StepError) -> Self {
        Self {
            phase,
            hook_suite: Vec::new(),
            message: error.to_string(),
            timed_out: error.is_timeout(),
            artifact: None,
        }
    }

    pub fn in_suite(mut self, suite_path: Vec<String>) -> Self {
        self.hook_suite = suite_path;
        self
    }
}

impl fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.phase.is_hook() {
            write!(f, "{}: {}", self.phase, self.message)
        } else {
            f.write_str(&self.message)
        }
    }
}

/// Per-test result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub title: String,
    pub suite_path: Vec<String>,
    pub state: TestState,
    pub duration_ms: u64,

    /// Attempts made, including retries (0 for tests that never ran)
    pub attempts: u32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureDetail>,
}

impl TestOutcome {
    pub(crate) fn skipped(title: String, suite_path: Vec<String>) -> Self {
        Self {
            title,
            suite_path,
            state: TestState::Skipped,
            duration_ms: 0,
            attempts: 0,
            failures: Vec::new(),
        }
    }

    /// Suite path and title joined with spaces
    pub fn full_title(&self) -> String {
        full_title(&self.suite_path, &self.title)
    }

    /// The first recorded failure
    pub fn failure(&self) -> Option<&FailureDetail> {
        self.failures.first()
    }

    pub fn passed(&self) -> bool {
        self.state == TestState::Passed
    }

    pub fn failed(&self) -> bool {
        self.state == TestState::Failed
    }
}

pub(crate) fn full_title(suite_path: &[String], title: &str) -> String {
    suite_path
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(title))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Aggregated results of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub outcomes: Vec<TestOutcome>,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: Vec<TestOutcome>, duration: Duration) -> Self {
        let count = |state: TestState| outcomes.iter().filter(|o| o.state == state).count();
        Self {
            total: outcomes.len(),
            passed: count(TestState::Passed),
            failed: count(TestState::Failed),
            skipped: count(TestState::Skipped),
            duration_ms: duration.as_millis() as u64,
            outcomes,
        }
    }

    /// Whether no test failed
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Outcomes of tests that actually ran
    pub fn executed(&self) -> impl Iterator<Item = &TestOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.state != TestState::Skipped)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestOutcome> {
        self.outcomes.iter().filter(|o| o.failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(title: &str, state: TestState) -> TestOutcome {
        TestOutcome {
            title: title.to_string(),
            suite_path: vec!["cart".to_string()],
            state,
            duration_ms: 1,
            attempts: 1,
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_summary_counts() {
        let summary = RunSummary::from_outcomes(
            vec![
                outcome("a", TestState::Passed),
                outcome("b", TestState::Failed),
                outcome("c", TestState::Skipped),
                outcome("d", TestState::Passed),
            ],
            Duration::from_millis(12),
        );

        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.executed().count(), 3);
        assert!(!summary.all_passed());
    }

    #[test]
    fn test_full_title_skips_empty_segments() {
        let o = TestOutcome {
            suite_path: vec!["checkout".to_string(), "payment".to_string()],
            ..outcome("declines expired card", TestState::Passed)
        };
        assert_eq!(o.full_title(), "checkout payment declines expired card");
        assert_eq!(full_title(&[], "top level"), "top level");
    }

    #[test]
    fn test_hook_failure_display() {
        let detail = FailureDetail::new(
            FailurePhase::BeforeEach,
            &StepError::failed("login failed"),
        );
        assert_eq!(detail.to_string(), "\"before each\" hook: login failed");
    }
}
