//! Declarative YAML suite files

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use suiterun_core::{ExecutionContext, FilterMode, TestState};

use crate::error::{RunnerError, RunnerResult};

/// A suite parsed from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteSpec {
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub mode: FilterMode,

    /// Tags for filtering, inherited by every test below
    #[serde(default)]
    pub tags: Vec<String>,

    /// Reusable groups any suite of the run may `include`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub shared: BTreeMap<String, GroupSpec>,

    #[serde(flatten)]
    pub body: GroupSpec,
}

/// Contents of a group: hooks, includes, tests and nested suites
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before_all: Vec<HookSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before_each: Vec<HookSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after_each: Vec<HookSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after_all: Vec<HookSpec>,

    /// Shared groups spliced in before this group's own tests
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suites: Vec<SuiteSpec>,
}

/// A single test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSpec {
    pub name: String,

    #[serde(default)]
    pub mode: FilterMode,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order; the first failure ends the test
    #[serde(default)]
    pub steps: Vec<SuiteStep>,
}

/// A hook: steps that run only when `when` holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookSpec {
    #[serde(default)]
    pub when: Condition,

    pub steps: Vec<SuiteStep>,
}

/// Condition on the execution context under which a hook runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    #[default]
    Always,
    CurrentFailed,
    CurrentPassed,
    PreviousFailed,
}

impl Condition {
    pub fn holds(&self, ctx: &ExecutionContext) -> bool {
        match self {
            Condition::Always => true,
            Condition::CurrentFailed => ctx.state() == TestState::Failed,
            Condition::CurrentPassed => ctx.state() == TestState::Passed,
            Condition::PreviousFailed => ctx.previous_failed(),
        }
    }
}

/// A single step of a test or hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SuiteStep {
    /// Log a message
    Log { message: String },

    /// Pause for a fixed amount of time
    Sleep { ms: u64 },

    /// Run a command once and check its exit code and output
    Exec {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        exit_code: i32,
        #[serde(default)]
        stdout_contains: Option<String>,
    },

    /// Re-run a command until its exit code and output match
    WaitForCommand {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        exit_code: i32,
        #[serde(default)]
        stdout_contains: Option<String>,
        #[serde(default)]
        timeout_ms: Option<u64>,
        #[serde(default)]
        interval_ms: Option<u64>,
    },

    /// Write a file, creating parent directories
    WriteFile { path: PathBuf, content: String },

    /// Remove a file; a missing file is not an error
    RemoveFile { path: PathBuf },

    /// Check a file once
    AssertFile {
        path: PathBuf,
        #[serde(default = "default_true")]
        exists: bool,
        #[serde(default)]
        contains: Option<String>,
    },

    /// Re-read a file until it matches
    WaitForFile {
        path: PathBuf,
        #[serde(default = "default_true")]
        exists: bool,
        #[serde(default)]
        contains: Option<String>,
        #[serde(default)]
        timeout_ms: Option<u64>,
        #[serde(default)]
        interval_ms: Option<u64>,
    },

    /// Fail unconditionally
    Fail { message: String },
}

fn default_true() -> bool {
    true
}

impl SuiteStep {
    /// Short label used in logs and failure messages
    pub fn name(&self) -> String {
        match self {
            SuiteStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
            SuiteStep::Sleep { ms } => format!("sleep:{}ms", ms),
            SuiteStep::Exec { command, .. } => format!("exec:{}", command),
            SuiteStep::WaitForCommand { command, .. } => format!("wait_for_command:{}", command),
            SuiteStep::WriteFile { path, .. } => format!("write_file:{}", path.display()),
            SuiteStep::RemoveFile { path } => format!("remove_file:{}", path.display()),
            SuiteStep::AssertFile { path, .. } => format!("assert_file:{}", path.display()),
            SuiteStep::WaitForFile { path, .. } => format!("wait_for_file:{}", path.display()),
            SuiteStep::Fail { .. } => "fail".to_string(),
        }
    }
}

/// A suite together with the file it was loaded from
#[derive(Debug, Clone, PartialEq)]
pub struct SpecFile {
    pub path: PathBuf,
    pub suite: SuiteSpec,
}

impl SuiteSpec {
    /// Parse a suite from a YAML string
    pub fn from_yaml(yaml: &str) -> RunnerResult<Self> {
        serde_yaml::from_str(yaml).map_err(RunnerError::from)
    }

    /// Parse a suite from a YAML file
    pub fn from_file(path: &Path) -> RunnerResult<SpecFile> {
        let content = std::fs::read_to_string(path)?;
        let suite = serde_yaml::from_str(&content).map_err(|e| RunnerError::SpecParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(SpecFile {
            path: path.to_path_buf(),
            suite,
        })
    }

    /// Load every suite file under `dir`, sorted by path
    pub fn load_all(dir: &Path) -> RunnerResult<Vec<SpecFile>> {
        if !dir.is_dir() {
            return Err(RunnerError::NoSuites(dir.to_path_buf()));
        }

        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_type().is_file()
                    && e.path()
                        .extension()
                        .map(|ext| ext == "yaml" || ext == "yml")
                        .unwrap_or(false)
            })
        {
            files.push(Self::from_file(entry.path())?);
        }

        if files.is_empty() {
            return Err(RunnerError::NoSuites(dir.to_path_buf()));
        }
        Ok(files)
    }

    /// Shared groups declared on this suite and on any nested suite
    pub fn shared_groups(&self) -> Vec<(&str, &GroupSpec)> {
        let mut groups: Vec<(&str, &GroupSpec)> = self
            .shared
            .iter()
            .map(|(name, group)| (name.as_str(), group))
            .collect();
        for suite in &self.body.suites {
            groups.extend(suite.shared_groups());
        }
        groups
    }

    /// Number of tests declared directly in this suite and its nested suites
    pub fn test_count(&self) -> usize {
        self.body.tests.len() + self.body.suites.iter().map(SuiteSpec::test_count).sum::<usize>()
    }
}
