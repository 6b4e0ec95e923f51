//! Per-test execution context handed to hooks and bodies

use serde::{Deserialize, Serialize};

use crate::outcome::{full_title, FailureDetail};

/// Test state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestState {
    #[default]
    Pending,
    Passed,
    Failed,
    Skipped,
}

/// Summary of the test that ran before the current one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousTest {
    pub full_title: String,
    pub state: TestState,
}

/// Transient state of one test attempt.
///
/// For `beforeAll`/`afterAll` hooks the title is the hook's description and
/// the suite path is the owning group.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    title: String,
    suite_path: Vec<String>,
    tags: Vec<String>,
    state: TestState,
    failures: Vec<FailureDetail>,
    attempt: u32,
    previous: Option<PreviousTest>,
}

impl ExecutionContext {
    pub fn new(title: impl Into<String>, suite_path: Vec<String>) -> Self {
        Self {
            title: title.into(),
            suite_path,
            tags: Vec::new(),
            state: TestState::Pending,
            failures: Vec::new(),
            attempt: 1,
            previous: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn with_previous(mut self, previous: Option<PreviousTest>) -> Self {
        self.previous = previous;
        self
    }

    pub fn with_state(mut self, state: TestState) -> Self {
        self.state = state;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn suite_path(&self) -> &[String] {
        &self.suite_path
    }

    pub fn full_title(&self) -> String {
        full_title(&self.suite_path, &self.title)
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// `Pending` while before-hooks and the body run, then `Passed` or
    /// `Failed` for after-hooks
    pub fn state(&self) -> TestState {
        self.state
    }

    pub fn failures(&self) -> &[FailureDetail] {
        &self.failures
    }

    pub fn is_failed(&self) -> bool {
        !self.failures.is_empty()
    }

    /// 1-based attempt number
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn previous(&self) -> Option<&PreviousTest> {
        self.previous.as_ref()
    }

    pub fn previous_failed(&self) -> bool {
        self.previous
            .as_ref()
            .is_some_and(|p| p.state == TestState::Failed)
    }

    pub(crate) fn set_state(&mut self, state: TestState) {
        self.state = state;
    }

    pub(crate) fn record_failure(&mut self, failure: FailureDetail) {
        self.failures.push(failure);
        if self.state != TestState::Pending {
            self.state = TestState::Failed;
        }
    }

    pub(crate) fn take_failures(&mut self) -> Vec<FailureDetail> {
        std::mem::take(&mut self.failures)
    }

    pub(crate) fn failures_mut(&mut self) -> &mut Vec<FailureDetail> {
        &mut self.failures
    }
}
