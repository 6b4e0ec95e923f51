//! CLI Commands

use suiterun_runner::RunnerError;

pub mod list;
pub mod run;
pub mod validate;

/// Suite files that cannot be parsed or registered; reported, exit code 1
pub(crate) fn is_invalid_suite(err: &RunnerError) -> bool {
    matches!(
        err,
        RunnerError::SpecParse { .. } | RunnerError::Structure { .. }
    )
}
