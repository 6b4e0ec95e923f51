//! Suite runner: loads suite files, builds the tree and runs it

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use suiterun_core::{
    Clock, Inclusion, Plan, RunOptions, RunSummary, Scheduler, SuiteTree, TestFilter,
    TracingReporter,
};

use crate::artifacts::ArtifactStore;
use crate::compile::compile;
use crate::config::RunnerConfig;
use crate::error::RunnerResult;
use crate::spec::{SpecFile, SuiteSpec};
use crate::steps::StepExecutor;

/// A test as it would be treated by `run`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedTest {
    pub full_title: String,
    pub suite_path: Vec<String>,
    pub title: String,
    pub tags: Vec<String>,
    pub inclusion: Inclusion,
}

/// Totals from a successful validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub files: usize,
    pub suites: usize,
    pub tests: usize,
    pub shared_groups: usize,
}

/// Main suite runner
pub struct SuiteRunner {
    config: RunnerConfig,
    executor: Arc<StepExecutor>,
    filter: TestFilter,
}

impl SuiteRunner {
    pub fn new(config: RunnerConfig) -> Self {
        let executor = Arc::new(StepExecutor::new(config.poll_options()));
        Self {
            config,
            executor,
            filter: TestFilter::default(),
        }
    }

    /// Use `clock` for polled steps and sleeps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.executor = Arc::new(StepExecutor::new(self.config.poll_options()).with_clock(clock));
        self
    }

    /// Only run tests whose full title matches `pattern`
    pub fn with_grep(mut self, pattern: &str) -> RunnerResult<Self> {
        self.filter.grep = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Only run tests carrying one of `tags`
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.filter.tags = tags;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Load every suite file in the specs directory
    pub fn load(&self) -> RunnerResult<Vec<SpecFile>> {
        let files = SuiteSpec::load_all(&self.config.specs_dir)?;
        debug!(
            "Loaded {} suite file(s) from {}",
            files.len(),
            self.config.specs_dir.display()
        );
        Ok(files)
    }

    /// Load and register every suite
    pub fn build(&self) -> RunnerResult<SuiteTree> {
        let files = self.load()?;
        compile(&files, &self.executor)
    }

    /// Parse and register every suite without running anything
    pub fn validate(&self) -> RunnerResult<ValidationReport> {
        let files = self.load()?;
        let tree = compile(&files, &self.executor)?;
        Ok(ValidationReport {
            files: files.len(),
            suites: tree.suites().len() - 1,
            tests: tree.test_count(),
            shared_groups: files.iter().map(|f| f.suite.shared_groups().len()).sum(),
        })
    }

    /// Every registered test with what a run would do with it
    pub fn list(&self) -> RunnerResult<Vec<ListedTest>> {
        let tree = self.build()?;
        let plan = Plan::new(&tree, &self.filter);
        Ok((0..tree.test_count())
            .map(|t| {
                let test = tree.test(t);
                ListedTest {
                    full_title: tree.test_full_title(t),
                    suite_path: tree.suite_path(test.suite),
                    title: test.name.clone(),
                    tags: tree.effective_tags(t),
                    inclusion: plan.inclusion(t),
                }
            })
            .collect())
    }

    /// Run every selected test
    pub async fn run(&self) -> RunnerResult<RunSummary> {
        let tree = self.build()?;
        Ok(self.run_tree(&tree).await)
    }

    /// Run an already built tree
    pub async fn run_tree(&self, tree: &SuiteTree) -> RunSummary {
        let options = RunOptions {
            retries: self.config.retries,
            filter: self.filter.clone(),
        };
        let mut scheduler = Scheduler::new(options).with_reporter(TracingReporter);
        if self.config.capture_on_failure {
            scheduler =
                scheduler.with_artifact_sink(Arc::new(ArtifactStore::new(&self.config.artifacts_dir)));
        }
        scheduler.run(tree).await
    }

    /// Write run results to JSON file
    pub fn write_results(&self, summary: &RunSummary) -> RunnerResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.results_path();
        let json = serde_json::to_string_pretty(summary)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
