//! Runner configuration (`suiterun.toml`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use suiterun_core::poll::{DEFAULT_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use suiterun_core::PollOptions;

use crate::error::{RunnerError, RunnerResult};

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "suiterun.toml";

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Directory searched recursively for `*.yaml` / `*.yml` suite files
    pub specs_dir: PathBuf,

    /// Where `test-results.json` is written
    pub output_dir: PathBuf,

    /// Where failure artifacts are written
    pub artifacts_dir: PathBuf,

    /// Extra attempts for a failing test
    pub retries: u32,

    /// Write an artifact for every failed test attempt
    pub capture_on_failure: bool,

    /// Defaults for polled steps
    pub poll: PollConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            specs_dir: PathBuf::from("tests/suites"),
            output_dir: PathBuf::from("test-results"),
            artifacts_dir: PathBuf::from("test-results/artifacts"),
            retries: 0,
            capture_on_failure: true,
            poll: PollConfig::default(),
        }
    }
}

/// Poll timing defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub timeout_ms: u64,
    pub interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

impl From<PollConfig> for PollOptions {
    fn from(config: PollConfig) -> Self {
        PollOptions::new(
            Duration::from_millis(config.timeout_ms),
            Duration::from_millis(config.interval_ms),
        )
    }
}

impl RunnerConfig {
    /// Load configuration from file, falling back to defaults if it is missing
    pub fn load(path: &Path) -> RunnerResult<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<Self>(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> RunnerResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> RunnerResult<()> {
        if self.poll.interval_ms == 0 {
            return Err(RunnerError::Config(
                "poll.interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_options(&self) -> PollOptions {
        self.poll.into()
    }

    /// Path of the JSON results file
    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join("test-results.json")
    }
}
