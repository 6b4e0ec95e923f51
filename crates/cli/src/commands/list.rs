//! List Command
//!
//! Shows every registered test and whether a run would execute it, skip it or
//! leave it out.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use suiterun_core::Inclusion;
use suiterun_runner::{ListedTest, RunnerConfig, SuiteRunner};

use crate::output::{inclusion_label, print_list, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct ListArgs {
    /// Directory containing suite files
    #[arg(short, long)]
    pub specs: Option<PathBuf>,

    /// Only select tests whose full title matches this regex
    #[arg(short, long)]
    pub grep: Option<String>,

    /// Only select tests carrying this tag (repeatable)
    #[arg(short, long)]
    pub tag: Vec<String>,

    /// Hide tests a run would leave out
    #[arg(long)]
    pub selected: bool,
}

/// Listed test for display
#[derive(Serialize)]
pub struct TestRow {
    pub test: String,
    pub tags: Vec<String>,
    pub status: Inclusion,
}

impl TableDisplay for TestRow {
    fn headers() -> Vec<&'static str> {
        vec!["Test", "Tags", "Status"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.test.clone(),
            self.tags.join(", "),
            inclusion_label(self.status),
        ]
    }
}

impl From<ListedTest> for TestRow {
    fn from(test: ListedTest) -> Self {
        Self {
            test: test.full_title,
            tags: test.tags,
            status: test.inclusion,
        }
    }
}

pub fn execute(args: ListArgs, mut config: RunnerConfig, format: OutputFormat) -> Result<bool> {
    if let Some(specs) = args.specs {
        config.specs_dir = specs;
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

    let rows: Vec<TestRow> = runner
        .list()
        .context("Failed to load suites")?
        .into_iter()
        .filter(|t| !args.selected || t.inclusion != Inclusion::Excluded)
        .map(TestRow::from)
        .collect();

    print_list(&rows, format);
    Ok(true)
}
