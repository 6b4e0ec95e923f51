//! Run Command
//!
//! Runs every selected suite, prints the outcomes and writes
//! `test-results.json`.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use suiterun_core::{RunSummary, TestOutcome};
use suiterun_runner::{RunnerConfig, SuiteRunner};

use super::is_invalid_suite;
use crate::output::{
    print_error, print_list, print_serialized, print_warning, state_label, OutputFormat,
    TableDisplay,
};

/// Longest failure message shown in the table
const MESSAGE_DISPLAY_LENGTH: usize = 80;

#[derive(Args)]
pub struct RunArgs {
    /// Directory containing suite files
    #[arg(short, long)]
    pub specs: Option<PathBuf>,

    /// Only run tests whose full title matches this regex
    #[arg(short, long)]
    pub grep: Option<String>,

    /// Only run tests carrying this tag (repeatable)
    #[arg(short, long)]
    pub tag: Vec<String>,

    /// Extra attempts for a failing test
    #[arg(long)]
    pub retries: Option<u32>,

    /// Do not write failure artifacts
    #[arg(long)]
    pub no_capture: bool,

    /// Output directory for results
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// One outcome for display
#[derive(Serialize)]
pub struct OutcomeRow {
    pub test: String,
    pub state: String,
    pub duration_ms: u64,
    pub attempts: u32,
    pub error: String,
}

impl From<&TestOutcome> for OutcomeRow {
    fn from(outcome: &TestOutcome) -> Self {
        Self {
            test: outcome.full_title(),
            state: state_label(outcome.state),
            duration_ms: outcome.duration_ms,
            attempts: outcome.attempts,
            error: outcome
                .failures
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

impl TableDisplay for OutcomeRow {
    fn headers() -> Vec<&'static str> {
        vec!["Test", "State", "Duration", "Attempts", "Error"]
    }

    fn row(&self) -> Vec<String> {
        let error = if self.error.chars().count() > MESSAGE_DISPLAY_LENGTH {
            let cut: String = self.error.chars().take(MESSAGE_DISPLAY_LENGTH).collect();
            format!("{}…", cut)
        } else {
            self.error.clone()
        };
        vec![
            self.test.clone(),
            self.state.clone(),
            format!("{} ms", self.duration_ms),
            self.attempts.to_string(),
            error,
        ]
    }
}

/// Returns whether every test passed
pub async fn execute(args: RunArgs, mut config: RunnerConfig, format: OutputFormat) -> Result<bool> {
    if let Some(specs) = args.specs {
        config.specs_dir = specs;
    }
    if let Some(output) = args.output {
        config.artifacts_dir = output.join("artifacts");
        config.output_dir = output;
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if args.no_capture {
        config.capture_on_failure = false;
    }

    let mut runner = SuiteRunner::new(config);
    if let Some(grep) = &args.grep {
        runner = runner
            .with_grep(grep)
            .with_context(|| format!("Invalid --grep pattern: {}", grep))?;
    }
    if !args.tag.is_empty() {
        runner = runner.with_tags(args.tag);
    }

    let summary = match runner.run().await {
        Ok(summary) => summary,
        Err(e) if is_invalid_suite(&e) => {
            print_error(&e.to_string());
            return Ok(false);
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Failed to run suites")),
    };
    runner
        .write_results(&summary)
        .context("Failed to write test results")?;

    match format {
        OutputFormat::Json | OutputFormat::Yaml => print_serialized(&summary, format),
        OutputFormat::Table | OutputFormat::Plain => {
            let rows: Vec<OutcomeRow> = summary.outcomes.iter().map(OutcomeRow::from).collect();
            print_list(&rows, format);
            print_summary(&summary);
        }
    }

    Ok(summary.all_passed())
}

fn print_summary(summary: &RunSummary) {
    if summary.total == 0 {
        print_warning("No tests selected");
        return;
    }

    let line = format!(
        "{} passed, {} failed, {} skipped ({} ms)",
        summary.passed, summary.failed, summary.skipped, summary.duration_ms
    );
    if summary.all_passed() {
        println!("{} {}", "✓".green(), line.bold());
    } else {
        println!("{} {}", "✗".red(), line.bold());
        for outcome in summary.failures() {
            if let Some(failure) = outcome.failure() {
                print_error(&format!("{} - {}", outcome.full_title(), failure));
                if let Some(artifact) = &failure.artifact {
                    println!("   {} {}", "artifact:".dimmed(), artifact.path.display());
                }
            }
        }
    }
}
