//! Validate Command
//!
//! Parses and registers every suite without running anything.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use suiterun_runner::{RunnerConfig, SuiteRunner};

use super::is_invalid_suite;
use crate::output::{print_error, print_serialized, print_success, OutputFormat};

#[derive(Args)]
pub struct ValidateArgs {
    /// Directory containing suite files
    #[arg(short, long)]
    pub specs: Option<PathBuf>,
}

/// Returns whether every suite is valid
pub fn execute(args: ValidateArgs, mut config: RunnerConfig, format: OutputFormat) -> Result<bool> {
    if let Some(specs) = args.specs {
        config.specs_dir = specs;
    }

    match SuiteRunner::new(config).validate() {
        Ok(report) => {
            match format {
                OutputFormat::Json | OutputFormat::Yaml => print_serialized(&report, format),
                OutputFormat::Table | OutputFormat::Plain => print_success(&format!(
                    "{} file(s), {} suite(s), {} test(s), {} shared group(s) valid",
                    report.files, report.suites, report.tests, report.shared_groups
                )),
            }
            Ok(true)
        }
        Err(e) if is_invalid_suite(&e) => {
            print_error(&e.to_string());
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
