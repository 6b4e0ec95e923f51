//! Reporting sink: ordered run events

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::context::TestState;
use crate::outcome::{FailureDetail, RunSummary, TestOutcome};

/// Events emitted by the scheduler, in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// A run is starting; `total` tests will produce an outcome
    RunStarted { total: usize },

    SuiteStarted { suite_path: Vec<String> },

    /// A test attempt is starting
    TestStarted { full_title: String, attempt: u32 },

    /// A test attempt failed and will be retried
    TestRetrying { full_title: String, attempt: u32, failures: Vec<FailureDetail> },

    TestFinished(TestOutcome),

    /// An "after all" hook failed after the group's tests had been reported
    HookFailed { suite_path: Vec<String>, failure: FailureDetail },

    SuiteFinished { suite_path: Vec<String> },

    RunFinished(RunSummary),
}

/// Receives run events
pub trait Reporter: Send {
    fn report(&mut self, event: &RunEvent);
}

/// Logs progress through `tracing`
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted { total } => info!("Running {} test(s)...", total),
            RunEvent::SuiteStarted { suite_path } => debug!("▶ {}", suite_path.join(" › ")),
            RunEvent::TestStarted { .. } | RunEvent::SuiteFinished { .. } => {}
            RunEvent::TestRetrying { full_title, attempt, failures } => {
                let reason = failures.first().map(|f| f.to_string()).unwrap_or_default();
                info!("↻ {} (attempt {} failed: {})", full_title, attempt, reason);
            }
            RunEvent::TestFinished(outcome) => match outcome.state {
                TestState::Passed => {
                    info!("✓ {} ({} ms)", outcome.full_title(), outcome.duration_ms)
                }
                TestState::Failed => error!(
                    "✗ {} - {}",
                    outcome.full_title(),
                    outcome
                        .failure()
                        .map(|f| f.to_string())
                        .unwrap_or_else(|| "unknown error".to_string())
                ),
                TestState::Skipped => info!("- {} (skipped)", outcome.full_title()),
                TestState::Pending => {}
            },
            RunEvent::HookFailed { suite_path, failure } => {
                error!("✗ {} - {}", suite_path.join(" "), failure)
            }
            RunEvent::RunFinished(summary) => info!(
                "Test Results: {} passed, {} failed, {} skipped ({} ms)",
                summary.passed, summary.failed, summary.skipped, summary.duration_ms
            ),
        }
    }
}

/// Collects every event; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<RunEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().clone()
    }

    /// Outcomes in the order they were reported
    pub fn outcomes(&self) -> Vec<TestOutcome> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                RunEvent::TestFinished(o) => Some(o.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for EventLog {
    fn report(&mut self, event: &RunEvent) {
        self.events.lock().push(event.clone());
    }
}
