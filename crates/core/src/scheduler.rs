//! Execution scheduler
//!
//! Walks a [`SuiteTree`] depth-first in registration order and runs one test at
//! a time. Failures of bodies and hooks are recorded on the affected outcome;
//! they never abort the run.

use async_trait::async_trait;
use futures::future::BoxFuture;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::context::{ExecutionContext, PreviousTest, TestState};
use crate::outcome::{full_title, ArtifactRef, FailureDetail, FailurePhase, RunSummary, TestOutcome};
use crate::plan::{Inclusion, Plan, TestFilter};
use crate::report::{Reporter, RunEvent};
use crate::tree::{Child, HookKind, SuiteId, SuiteTree, TestCase, TestId, ROOT};

/// Options for one run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Extra attempts for a failing test
    pub retries: u32,

    pub filter: TestFilter,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_grep(mut self, grep: Regex) -> Self {
        self.filter.grep = Some(grep);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.filter.tags = tags;
        self
    }
}

/// Captures an artifact (log, screenshot, ...) for a failed test attempt
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn capture(&self, ctx: &ExecutionContext) -> Option<ArtifactRef>;
}

#[derive(Default)]
struct RunState {
    outcomes: Vec<TestOutcome>,
    previous: Option<PreviousTest>,
}

/// Runs suite trees
pub struct Scheduler {
    options: RunOptions,
    reporters: Vec<Box<dyn Reporter>>,
    artifacts: Option<Arc<dyn ArtifactSink>>,
}

impl Scheduler {
    pub fn new(options: RunOptions) -> Self {
        Self {
            options,
            reporters: Vec::new(),
            artifacts: None,
        }
    }

    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    pub fn with_artifact_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.artifacts = Some(sink);
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Run every selected test of `tree` and return the aggregated outcomes
    pub async fn run(&mut self, tree: &SuiteTree) -> RunSummary {
        let start = Instant::now();
        let plan = Plan::new(tree, &self.options.filter);

        self.emit(RunEvent::RunStarted {
            total: plan.total_reported(),
        });

        let mut state = RunState::default();
        self.run_suite(tree, &plan, ROOT, None, &mut state).await;

        let summary = RunSummary::from_outcomes(state.outcomes, start.elapsed());
        self.emit(RunEvent::RunFinished(summary.clone()));
        summary
    }

    /// `blocked` carries an ancestor's failed "before all" hook: every
    /// runnable test below is recorded as failed without running.
    fn run_suite<'a>(
        &'a mut self,
        tree: &'a SuiteTree,
        plan: &'a Plan,
        id: SuiteId,
        blocked: Option<FailureDetail>,
        state: &'a mut RunState,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if plan.reported(id) == 0 {
                return;
            }

            let suite = tree.suite(id);
            let suite_path = tree.suite_path(id);
            if id != ROOT {
                debug!("Entering suite: {}", suite_path.join(" › "));
                self.emit(RunEvent::SuiteStarted {
                    suite_path: suite_path.clone(),
                });
            }

            let runs_hooks = blocked.is_none() && plan.runnable(id) > 0;
            let mut blocked = blocked;
            if runs_hooks {
                blocked = self
                    .run_group_hooks(tree, id, HookKind::BeforeAll, &suite_path, state)
                    .await
                    .into_iter()
                    .next();
            }

            let first = state.outcomes.len();
            for child in &suite.children {
                match *child {
                    Child::Test(t) => match plan.inclusion(t) {
                        Inclusion::Excluded => {}
                        Inclusion::Skip => {
                            let outcome =
                                TestOutcome::skipped(tree.test(t).name.clone(), suite_path.clone());
                            self.finish(state, outcome);
                        }
                        Inclusion::Run => {
                            let outcome = match &blocked {
                                Some(failure) => TestOutcome {
                                    title: tree.test(t).name.clone(),
                                    suite_path: suite_path.clone(),
                                    state: TestState::Failed,
                                    duration_ms: 0,
                                    attempts: 0,
                                    failures: vec![failure.clone()],
                                },
                                None => {
                                    let previous = state.previous.clone();
                                    self.run_test(tree, t, &suite_path, previous).await
                                }
                            };
                            self.finish(state, outcome);
                        }
                    },
                    Child::Suite(s) => {
                        self.run_suite(tree, plan, s, blocked.clone(), state).await;
                    }
                }
            }

            if runs_hooks {
                let failures = self
                    .run_group_hooks(tree, id, HookKind::AfterAll, &suite_path, state)
                    .await;
                for failure in failures {
                    if let Some(last) = state.outcomes[first..]
                        .iter_mut()
                        .rev()
                        .find(|o| o.state != TestState::Skipped)
                    {
                        last.state = TestState::Failed;
                        last.failures.push(failure.clone());
                    }
                    self.emit(RunEvent::HookFailed {
                        suite_path: suite_path.clone(),
                        failure,
                    });
                }
            }

            if id != ROOT {
                self.emit(RunEvent::SuiteFinished { suite_path });
            }
        })
    }

    /// Run a group's "before all" or "after all" hooks.
    ///
    /// "before all" stops at the first failure; "after all" hooks all run.
    async fn run_group_hooks(
        &mut self,
        tree: &SuiteTree,
        id: SuiteId,
        kind: HookKind,
        suite_path: &[String],
        state: &RunState,
    ) -> Vec<FailureDetail> {
        let phase = match kind {
            HookKind::BeforeAll => FailurePhase::BeforeAll,
            _ => FailurePhase::AfterAll,
        };
        let ctx = ExecutionContext::new(format!("\"{}\" hook", kind), suite_path.to_vec())
            .with_tags(tree.suite(id).tags.clone())
            .with_previous(state.previous.clone());

        let mut failures = Vec::new();
        for hook in tree.suite(id).hooks.get(kind) {
            if let Err(e) = hook.invoke(&ctx).await {
                warn!("{} hook failed in '{}': {}", kind, suite_path.join(" "), e);
                failures.push(FailureDetail::new(phase, &e).in_suite(suite_path.to_vec()));
                if kind == HookKind::BeforeAll {
                    break;
                }
            }
        }
        failures
    }

    async fn run_test(
        &mut self,
        tree: &SuiteTree,
        t: TestId,
        suite_path: &[String],
        previous: Option<PreviousTest>,
    ) -> TestOutcome {
        let test = tree.test(t);
        let ancestors = tree.ancestors(test.suite);
        let tags = tree.effective_tags(t);
        let title = full_title(suite_path, &test.name);
        let max_attempts = self.options.retries + 1;
        let start = Instant::now();

        let mut attempt = 1;
        loop {
            debug!("Running test: {} (attempt {})", title, attempt);
            self.emit(RunEvent::TestStarted {
                full_title: title.clone(),
                attempt,
            });

            let mut ctx = ExecutionContext::new(test.name.clone(), suite_path.to_vec())
                .with_tags(tags.clone())
                .with_attempt(attempt)
                .with_previous(previous.clone());

            Self::run_attempt(tree, test, &ancestors, &mut ctx).await;

            if ctx.is_failed() {
                if let Some(sink) = self.artifacts.clone() {
                    if let Some(artifact) = sink.capture(&ctx).await {
                        if let Some(first) = ctx.failures_mut().first_mut() {
                            first.artifact = Some(artifact);
                        }
                    }
                }
            }

            if !ctx.is_failed() || attempt >= max_attempts {
                let state = ctx.state();
                return TestOutcome {
                    title: test.name.clone(),
                    suite_path: suite_path.to_vec(),
                    state,
                    duration_ms: start.elapsed().as_millis() as u64,
                    attempts: attempt,
                    failures: ctx.take_failures(),
                };
            }

            self.emit(RunEvent::TestRetrying {
                full_title: title.clone(),
                attempt,
                failures: ctx.failures().to_vec(),
            });
            attempt += 1;
        }
    }

    /// beforeEach outermost first, body, then afterEach innermost first
    async fn run_attempt(
        tree: &SuiteTree,
        test: &TestCase,
        ancestors: &[SuiteId],
        ctx: &mut ExecutionContext,
    ) {
        let mut body_allowed = true;
        'before: for &s in ancestors {
            for hook in tree.suite(s).hooks.get(HookKind::BeforeEach) {
                if let Err(e) = hook.invoke(ctx).await {
                    warn!("before each hook failed for '{}': {}", ctx.full_title(), e);
                    ctx.record_failure(
                        FailureDetail::new(FailurePhase::BeforeEach, &e).in_suite(tree.suite_path(s)),
                    );
                    body_allowed = false;
                    break 'before;
                }
            }
        }

        if body_allowed {
            if let Err(e) = test.body.invoke(ctx).await {
                ctx.record_failure(FailureDetail::new(FailurePhase::Body, &e));
            }
        }

        let settled = if ctx.is_failed() {
            TestState::Failed
        } else {
            TestState::Passed
        };
        ctx.set_state(settled);

        for &s in ancestors.iter().rev() {
            for hook in tree.suite(s).hooks.get(HookKind::AfterEach) {
                if let Err(e) = hook.invoke(ctx).await {
                    warn!("after each hook failed for '{}': {}", ctx.full_title(), e);
                    ctx.record_failure(
                        FailureDetail::new(FailurePhase::AfterEach, &e).in_suite(tree.suite_path(s)),
                    );
                }
            }
        }
    }

    fn finish(&mut self, state: &mut RunState, outcome: TestOutcome) {
        if outcome.state != TestState::Skipped {
            state.previous = Some(PreviousTest {
                full_title: outcome.full_title(),
                state: outcome.state,
            });
        }
        self.emit(RunEvent::TestFinished(outcome.clone()));
        state.outcomes.push(outcome);
    }

    fn emit(&mut self, event: RunEvent) {
        for reporter in &mut self.reporters {
            reporter.report(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::StepError;
    use crate::expect::equals;
    use crate::poll::{poll, PollOptions};
    use crate::report::EventLog;
    use crate::step::{from_async, from_fn, SharedStep};
    use crate::tree::SuiteBuilder;
    use parking_lot::Mutex;
    use std::path::PathBuf;

    /// Shared log of which steps ran
    #[derive(Clone, Default)]
    struct Trace(Arc<Mutex<Vec<String>>>);

    impl Trace {
        fn ok(&self, label: &str) -> SharedStep {
            let trace = self.clone();
            let label = label.to_string();
            from_fn(move |_| {
                trace.0.lock().push(label.clone());
                Ok(())
            })
        }

        fn fail(&self, label: &str) -> SharedStep {
            let trace = self.clone();
            let label = label.to_string();
            from_fn(move |_| {
                trace.0.lock().push(label.clone());
                Err(StepError::failed(format!("{} failed", label)))
            })
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().clone()
        }
    }

    async fn run(tree: &SuiteTree) -> RunSummary {
        Scheduler::new(RunOptions::default()).run(tree).await
    }

    fn titles(summary: &RunSummary) -> Vec<String> {
        summary.executed().map(|o| o.title.clone()).collect()
    }

    #[tokio::test]
    async fn test_runs_every_test_once_in_order() {
        let trace = Trace::default();
        let mut b = SuiteBuilder::new();
        b.describe("a", |s| {
            s.it("1", trace.ok("1"))?;
            s.describe("b", |s| {
                s.it("2", trace.ok("2"))?;
                s.it("3", trace.ok("3"))?;
                Ok(())
            })?;
            s.it("4", trace.ok("4"))?;
            Ok(())
        })
        .unwrap();
        let tree = b.build().unwrap();

        let summary = run(&tree).await;

        assert_eq!(trace.entries(), vec!["1", "2", "3", "4"]);
        assert_eq!(titles(&summary), vec!["1", "2", "3", "4"]);
        assert_eq!(summary.passed, 4);
        assert!(summary.all_passed());
    }

    #[tokio::test]
    async fn test_only_among_siblings_runs_one() {
        let trace = Trace::default();
        let mut b = SuiteBuilder::new();
        b.describe("a", |s| {
            s.it("1", trace.ok("1"))?;
            s.it_only("2", trace.ok("2"))?;
            s.it("3", trace.ok("3"))?;
            Ok(())
        })
        .unwrap();
        let tree = b.build().unwrap();

        let summary = run(&tree).await;

        assert_eq!(summary.total, 1);
        assert_eq!(titles(&summary), vec!["2"]);
        assert_eq!(trace.entries(), vec!["2"]);
    }

    #[tokio::test]
    async fn test_skip_under_only_group() {
        let trace = Trace::default();
        let mut b = SuiteBuilder::new();
        b.describe_only("a", |s| {
            s.it_skip("skipped", trace.ok("skipped"))?;
            s.it("normal", trace.ok("normal"))?;
            Ok(())
        })
        .unwrap();
        b.describe("b", |s| s.it("elsewhere", trace.ok("elsewhere")).map(|_| ()))
            .unwrap();
        let tree = b.build().unwrap();

        let summary = run(&tree).await;

        assert_eq!(titles(&summary), vec!["normal"]);
        assert_eq!(summary.skipped, 1);
        assert_eq!(trace.entries(), vec!["normal"]);
    }

    #[tokio::test]
    async fn test_hook_order_across_levels() {
        let trace = Trace::default();
        let mut b = SuiteBuilder::new();
        b.describe("outer", |s| {
            s.before_all(trace.ok("outer before all"))?;
            s.before_each(trace.ok("outer before each"))?;
            s.after_each(trace.ok("outer after each"))?;
            s.after_all(trace.ok("outer after all"))?;
            s.describe("inner", |s| {
                s.before_all(trace.ok("inner before all"))?;
                s.before_each(trace.ok("inner before each"))?;
                s.after_each(trace.ok("inner after each"))?;
                s.after_all(trace.ok("inner after all"))?;
                s.it("t", trace.ok("body"))?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
        let tree = b.build().unwrap();

        run(&tree).await;

        assert_eq!(
            trace.entries(),
            vec![
                "outer before all",
                "inner before all",
                "outer before each",
                "inner before each",
                "body",
                "inner after each",
                "outer after each",
                "inner after all",
                "outer after all",
            ]
        );
    }

    #[tokio::test]
    async fn test_after_each_runs_when_body_fails() {
        let trace = Trace::default();
        let mut b = SuiteBuilder::new();
        b.describe("a", |s| {
            s.after_each(trace.ok("cleanup"))?;
            s.it("broken", trace.fail("body"))?;
            s.it("fine", trace.ok("fine"))?;
            Ok(())
        })
        .unwrap();
        let tree = b.build().unwrap();

        let summary = run(&tree).await;

        assert_eq!(trace.entries(), vec!["body", "cleanup", "fine", "cleanup"]);
        let broken = &summary.outcomes[0];
        assert_eq!(broken.state, TestState::Failed);
        assert_eq!(broken.failure().unwrap().phase, FailurePhase::Body);
        assert_eq!(broken.failure().unwrap().message, "body failed");
        assert_eq!(summary.outcomes[1].state, TestState::Passed);
    }

    #[tokio::test]
    async fn test_after_each_failures_recorded_independently() {
        let trace = Trace::default();
        let mut b = SuiteBuilder::new();
        b.describe("outer", |s| {
            s.after_each(trace.fail("outer after"))?;
            s.describe("inner", |s| {
                s.after_each(trace.fail("inner after 1"))?;
                s.after_each(trace.ok("inner after 2"))?;
                s.it("t", trace.fail("body"))?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
        let tree = b.build().unwrap();

        let summary = run(&tree).await;

        assert_eq!(
            trace.entries(),
            vec!["body", "inner after 1", "inner after 2", "outer after"]
        );
        let phases: Vec<_> = summary.outcomes[0].failures.iter().map(|f| f.phase).collect();
        assert_eq!(
            phases,
            vec![
                FailurePhase::Body,
                FailurePhase::AfterEach,
                FailurePhase::AfterEach
            ]
        );
        assert_eq!(summary.outcomes[0].failures[2].hook_suite, vec!["outer".to_string()]);
    }

    #[tokio::test]
    async fn test_before_each_failure_skips_body_but_runs_after_each() {
        let trace = Trace::default();
        let mut b = SuiteBuilder::new();
        b.describe("outer", |s| {
            s.before_each(trace.fail("login"))?;
            s.after_each(trace.ok("logout"))?;
            s.describe("inner", |s| {
                s.before_each(trace.ok("inner before"))?;
                s.it("t", trace.ok("body"))?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
        let tree = b.build().unwrap();

        let summary = run(&tree).await;

        assert_eq!(trace.entries(), vec!["login", "logout"]);
        let failure = summary.outcomes[0].failure().unwrap();
        assert_eq!(failure.phase, FailurePhase::BeforeEach);
        assert_eq!(failure.hook_suite, vec!["outer".to_string()]);
    }

    #[tokio::test]
    async fn test_before_all_failure_fails_group_without_running() {
        let trace = Trace::default();
        let mut b = SuiteBuilder::new();
        b.describe("outer", |s| {
            s.before_each(trace.ok("outer before each"))?;
            s.after_all(trace.ok("outer after all"))?;
            s.describe("group", |s| {
                s.before_all(trace.fail("seed"))?;
                s.before_each(trace.ok("before each"))?;
                s.after_each(trace.ok("after each"))?;
                s.after_all(trace.ok("group after all"))?;
                s.it("1", trace.ok("body 1"))?;
                s.describe("nested", |s| {
                    s.before_all(trace.ok("nested before all"))?;
                    s.after_all(trace.ok("nested after all"))?;
                    s.it("2", trace.ok("body 2"))?;
                    Ok(())
                })?;
                Ok(())
            })?;
            s.it("after group", trace.ok("body 3"))?;
            Ok(())
        })
        .unwrap();
        let tree = b.build().unwrap();

        let summary = run(&tree).await;

        assert_eq!(
            trace.entries(),
            vec![
                "seed",
                "group after all",
                "outer before each",
                "body 3",
                "outer after all"
            ]
        );
        assert_eq!(summary.failed, 2);
        for outcome in &summary.outcomes[..2] {
            assert_eq!(outcome.state, TestState::Failed);
            assert_eq!(outcome.attempts, 0);
            let failure = outcome.failure().unwrap();
            assert_eq!(failure.phase, FailurePhase::BeforeAll);
            assert_eq!(failure.hook_suite, vec!["outer".to_string(), "group".to_string()]);
        }
        assert_eq!(summary.outcomes[2].state, TestState::Passed);
    }

    #[tokio::test]
    async fn test_after_all_failure_attaches_to_last_outcome() {
        let trace = Trace::default();
        let log = EventLog::new();
        let mut b = SuiteBuilder::new();
        b.describe("a", |s| {
            s.after_all(trace.fail("teardown"))?;
            s.it("1", trace.ok("1"))?;
            s.it("2", trace.ok("2"))?;
            s.it_skip("3", trace.ok("3"))?;
            Ok(())
        })
        .unwrap();
        let tree = b.build().unwrap();

        let summary = Scheduler::new(RunOptions::default())
            .with_reporter(log.clone())
            .run(&tree)
            .await;

        assert_eq!(summary.outcomes[0].state, TestState::Passed);
        assert_eq!(summary.outcomes[1].state, TestState::Failed);
        assert_eq!(
            summary.outcomes[1].failure().unwrap().phase,
            FailurePhase::AfterAll
        );
        assert!(log
            .events()
            .iter()
            .any(|e| matches!(e, RunEvent::HookFailed { .. })));
    }

    #[tokio::test]
    async fn test_after_all_failure_attaches_to_last_outcome_of_nested_group() {
        let trace = Trace::default();
        let mut b = SuiteBuilder::new();
        b.describe("a", |s| {
            s.after_all(trace.fail("outer teardown"))?;
            s.it("1", trace.ok("1"))?;
            s.describe("b", |s| {
                s.after_all(trace.fail("inner teardown"))?;
                s.it("2", trace.ok("2"))?;
                s.it_skip("3", trace.ok("3"))?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
        b.describe("c", |s| {
            s.it("4", trace.ok("4"))?;
            Ok(())
        })
        .unwrap();
        let tree = b.build().unwrap();

        let summary = run(&tree).await;

        let states: Vec<TestState> = summary.outcomes.iter().map(|o| o.state).collect();
        assert_eq!(
            states,
            vec![
                TestState::Passed,
                TestState::Failed,
                TestState::Skipped,
                TestState::Passed
            ]
        );
        assert_eq!(summary.failed, 1);

        let nested = &summary.outcomes[1];
        assert_eq!(nested.title, "2");
        let suites: Vec<Vec<String>> = nested
            .failures
            .iter()
            .map(|f| {
                assert_eq!(f.phase, FailurePhase::AfterAll);
                f.hook_suite.clone()
            })
            .collect();
        assert_eq!(
            suites,
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["a".to_string()]
            ]
        );
        assert!(summary.outcomes[2].failures.is_empty());
        assert!(summary.outcomes[3].failures.is_empty());
    }

    #[tokio::test]
    async fn test_hooks_skipped_for_groups_without_runnable_tests() {
        let trace = Trace::default();
        let mut b = SuiteBuilder::new();
        b.describe_skip("a", |s| {
            s.before_all(trace.ok("before all"))?;
            s.after_all(trace.ok("after all"))?;
            s.it("1", trace.ok("1"))?;
            Ok(())
        })
        .unwrap();
        let tree = b.build().unwrap();

        let summary = run(&tree).await;

        assert!(trace.entries().is_empty());
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_retries_until_pass() {
        let attempts = Arc::new(Mutex::new(0u32));
        let counter = attempts.clone();
        let mut b = SuiteBuilder::new();
        b.describe("flaky", |s| {
            s.it(
                "eventually passes",
                from_fn(move |ctx| {
                    *counter.lock() += 1;
                    if ctx.attempt() < 3 {
                        Err(StepError::failed("not yet"))
                    } else {
                        Ok(())
                    }
                }),
            )?;
            Ok(())
        })
        .unwrap();
        let tree = b.build().unwrap();

        let log = EventLog::new();
        let summary = Scheduler::new(RunOptions::new().with_retries(3))
            .with_reporter(log.clone())
            .run(&tree)
            .await;

        assert_eq!(*attempts.lock(), 3);
        assert_eq!(summary.outcomes[0].state, TestState::Passed);
        assert_eq!(summary.outcomes[0].attempts, 3);
        assert!(summary.outcomes[0].failures.is_empty());
        let retries = log
            .events()
            .iter()
            .filter(|e| matches!(e, RunEvent::TestRetrying { .. }))
            .count();
        assert_eq!(retries, 2);
    }

    #[tokio::test]
    async fn test_retries_exhausted_reports_last_attempt() {
        let trace = Trace::default();
        let mut b = SuiteBuilder::new();
        b.describe("a", |s| s.it("always fails", trace.fail("body")).map(|_| ()))
            .unwrap();
        let tree = b.build().unwrap();

        let summary = Scheduler::new(RunOptions::new().with_retries(1))
            .run(&tree)
            .await;

        assert_eq!(trace.entries(), vec!["body", "body"]);
        assert_eq!(summary.outcomes[0].attempts, 2);
        assert_eq!(summary.outcomes[0].failures.len(), 1);
    }

    struct FixedSink;

    #[async_trait]
    impl ArtifactSink for FixedSink {
        async fn capture(&self, ctx: &ExecutionContext) -> Option<ArtifactRef> {
            Some(ArtifactRef {
                path: PathBuf::from(format!("{} (failed).log", ctx.title())),
                digest: None,
            })
        }
    }

    #[tokio::test]
    async fn test_artifact_attached_to_failure() {
        let trace = Trace::default();
        let mut b = SuiteBuilder::new();
        b.describe("a", |s| {
            s.it("ok", trace.ok("ok"))?;
            s.it("broken", trace.fail("broken"))?;
            Ok(())
        })
        .unwrap();
        let tree = b.build().unwrap();

        let summary = Scheduler::new(RunOptions::default())
            .with_artifact_sink(Arc::new(FixedSink))
            .run(&tree)
            .await;

        assert!(summary.outcomes[0].failures.is_empty());
        assert_eq!(
            summary.outcomes[1].failure().unwrap().artifact,
            Some(ArtifactRef {
                path: PathBuf::from("broken (failed).log"),
                digest: None
            })
        );
    }

    #[tokio::test]
    async fn test_hooks_see_previous_and_current_state() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut b = SuiteBuilder::new();
        let record = seen.clone();
        b.describe("a", move |s| {
            let r = record.clone();
            s.before_each(from_fn(move |ctx| {
                r.lock().push(format!("{} previous_failed={}", ctx.title(), ctx.previous_failed()));
                Ok(())
            }))?;
            let r = record.clone();
            s.after_each(from_fn(move |ctx| {
                r.lock().push(format!("{} state={:?}", ctx.title(), ctx.state()));
                Ok(())
            }))?;
            s.it("1", from_fn(|_| Err(StepError::failed("boom"))))?;
            s.it("2", from_fn(|_| Ok(())))?;
            Ok(())
        })
        .unwrap();
        let tree = b.build().unwrap();

        run(&tree).await;

        assert_eq!(
            *seen.lock(),
            vec![
                "1 previous_failed=false",
                "1 state=Failed",
                "2 previous_failed=true",
                "2 state=Passed",
            ]
        );
    }

    #[tokio::test]
    async fn test_poll_timeout_fails_only_its_test() {
        let clock = Arc::new(ManualClock::new());
        let poll_clock = clock.clone();
        let mut b = SuiteBuilder::new();
        b.describe("a", move |s| {
            let clock = poll_clock.clone();
            s.it(
                "waits forever",
                from_async(move |_| {
                    let clock = clock.clone();
                    async move {
                        poll(
                            clock.as_ref(),
                            || async { Ok::<_, String>(0) },
                            equals(1),
                            PollOptions::from_millis(50, 10),
                        )
                        .await?;
                        Ok(())
                    }
                }),
            )?;
            s.it("next", from_fn(|_| Ok(())))?;
            Ok(())
        })
        .unwrap();
        let tree = b.build().unwrap();

        let summary = run(&tree).await;

        let failure = summary.outcomes[0].failure().unwrap();
        assert!(failure.timed_out);
        assert!(failure.message.contains("expected 1, got 0"));
        assert_eq!(summary.outcomes[1].state, TestState::Passed);
        assert_eq!(clock.elapsed(), std::time::Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_event_order() {
        let log = EventLog::new();
        let mut b = SuiteBuilder::new();
        b.describe("a", |s| s.it("t", from_fn(|_| Ok(()))).map(|_| ()))
            .unwrap();
        let tree = b.build().unwrap();

        Scheduler::new(RunOptions::default())
            .with_reporter(log.clone())
            .run(&tree)
            .await;

        let kinds: Vec<&str> = log
            .events()
            .iter()
            .map(|e| match e {
                RunEvent::RunStarted { .. } => "run started",
                RunEvent::SuiteStarted { .. } => "suite started",
                RunEvent::TestStarted { .. } => "test started",
                RunEvent::TestRetrying { .. } => "test retrying",
                RunEvent::TestFinished(_) => "test finished",
                RunEvent::HookFailed { .. } => "hook failed",
                RunEvent::SuiteFinished { .. } => "suite finished",
                RunEvent::RunFinished(_) => "run finished",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "run started",
                "suite started",
                "test started",
                "test finished",
                "suite finished",
                "run finished"
            ]
        );
    }

    #[tokio::test]
    async fn test_grep_filters_unreported() {
        let trace = Trace::default();
        let mut b = SuiteBuilder::new();
        b.describe("cart", |s| {
            s.it("adds item", trace.ok("adds"))?;
            s.it("removes item", trace.ok("removes"))?;
            Ok(())
        })
        .unwrap();
        let tree = b.build().unwrap();

        let summary = Scheduler::new(RunOptions::new().with_grep(Regex::new("removes").unwrap()))
            .run(&tree)
            .await;

        assert_eq!(summary.total, 1);
        assert_eq!(trace.entries(), vec!["removes"]);
    }
}
