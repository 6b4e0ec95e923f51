//! Execution of declarative steps

use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use suiterun_core::expect::Verdict;
use suiterun_core::{
    check, poll, Clock, ExecutionContext, PollOptions, SharedStep, Step, StepError, StepResult,
    SystemClock,
};

use crate::spec::{Condition, HookSpec, SuiteStep};

/// Captured result of one command run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs [`SuiteStep`]s; polled steps sleep on the injected clock
pub struct StepExecutor {
    clock: Arc<dyn Clock>,
    poll: PollOptions,
}

impl StepExecutor {
    pub fn new(poll: PollOptions) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            poll,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn poll_options(&self) -> PollOptions {
        self.poll
    }

    /// Execute a single step
    pub async fn execute(&self, step: &SuiteStep) -> StepResult {
        match step {
            SuiteStep::Log { message } => {
                info!("[TEST LOG] {}", message);
                Ok(())
            }
            SuiteStep::Sleep { ms } => {
                self.clock.sleep(Duration::from_millis(*ms)).await;
                Ok(())
            }
            SuiteStep::Exec {
                command,
                args,
                exit_code,
                stdout_contains,
            } => {
                check(
                    || run_command(command, args),
                    command_matches(*exit_code, stdout_contains.clone()),
                )
                .await?;
                Ok(())
            }
            SuiteStep::WaitForCommand {
                command,
                args,
                exit_code,
                stdout_contains,
                timeout_ms,
                interval_ms,
            } => {
                poll(
                    self.clock.as_ref(),
                    || run_command(command, args),
                    command_matches(*exit_code, stdout_contains.clone()),
                    self.options(*timeout_ms, *interval_ms),
                )
                .await?;
                Ok(())
            }
            SuiteStep::WriteFile { path, content } => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
                tokio::fs::write(path, content).await?;
                Ok(())
            }
            SuiteStep::RemoveFile { path } => match tokio::fs::remove_file(path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            },
            SuiteStep::AssertFile {
                path,
                exists,
                contains,
            } => {
                check(
                    || read_file(path),
                    file_matches(path, *exists, contains.clone()),
                )
                .await?;
                Ok(())
            }
            SuiteStep::WaitForFile {
                path,
                exists,
                contains,
                timeout_ms,
                interval_ms,
            } => {
                poll(
                    self.clock.as_ref(),
                    || read_file(path),
                    file_matches(path, *exists, contains.clone()),
                    self.options(*timeout_ms, *interval_ms),
                )
                .await?;
                Ok(())
            }
            SuiteStep::Fail { message } => Err(StepError::failed(message.clone())),
        }
    }

    /// Execute steps in order, stopping at the first failure
    pub async fn execute_all(&self, steps: &[SuiteStep]) -> StepResult {
        for step in steps {
            let name = step.name();
            debug!("Executing step: {}", name);
            self.execute(step).await.map_err(|e| e.with_context(&name))?;
        }
        Ok(())
    }

    /// A test body running `steps`
    pub fn sequence(self: &Arc<Self>, steps: Vec<SuiteStep>) -> SharedStep {
        Arc::new(StepSequence {
            executor: Arc::clone(self),
            steps,
            when: Condition::Always,
        })
    }

    /// A hook running its steps when its condition holds
    pub fn hook(self: &Arc<Self>, hook: &HookSpec) -> SharedStep {
        Arc::new(StepSequence {
            executor: Arc::clone(self),
            steps: hook.steps.clone(),
            when: hook.when,
        })
    }

    fn options(&self, timeout_ms: Option<u64>, interval_ms: Option<u64>) -> PollOptions {
        let mut options = self.poll;
        if let Some(ms) = timeout_ms {
            options = options.with_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = interval_ms {
            options = options.with_interval(Duration::from_millis(ms));
        }
        options
    }
}

/// Declared steps bound to an executor
struct StepSequence {
    executor: Arc<StepExecutor>,
    steps: Vec<SuiteStep>,
    when: Condition,
}

#[async_trait]
impl Step for StepSequence {
    async fn invoke(&self, ctx: &ExecutionContext) -> StepResult {
        if !self.when.holds(ctx) {
            debug!("Skipping hook for '{}': {:?} does not hold", ctx.full_title(), self.when);
            return Ok(());
        }
        self.executor.execute_all(&self.steps).await
    }
}

async fn run_command(command: &str, args: &[String]) -> io::Result<CommandOutput> {
    let output = Command::new(command).args(args).output().await?;
    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn command_matches(
    exit_code: i32,
    stdout_contains: Option<String>,
) -> impl Fn(&CommandOutput) -> Verdict {
    move |output: &CommandOutput| {
        if output.code != Some(exit_code) {
            return Err(format!(
                "expected exit code {}, got {}{}",
                exit_code,
                output
                    .code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                stderr_hint(&output.stderr)
            ));
        }
        match &stdout_contains {
            Some(needle) if !output.stdout.contains(needle.as_str()) => Err(format!(
                "expected stdout to contain {:?}, got {:?}",
                needle,
                output.stdout.trim_end()
            )),
            _ => Ok(()),
        }
    }
}

fn stderr_hint(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(" (stderr: {})", stderr.lines().next().unwrap_or_default())
    }
}

/// Contents of the file, or `None` if it does not exist
async fn read_file(path: &Path) -> io::Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn file_matches(
    path: &Path,
    exists: bool,
    contains: Option<String>,
) -> impl Fn(&Option<String>) -> Verdict {
    let path = path.display().to_string();
    move |content: &Option<String>| match (content, exists) {
        (None, true) => Err(format!("expected {} to exist", path)),
        (Some(_), false) => Err(format!("expected {} not to exist", path)),
        (None, false) => Ok(()),
        (Some(content), true) => match &contains {
            Some(needle) if !content.contains(needle.as_str()) => Err(format!(
                "expected {} to contain {:?}",
                path, needle
            )),
            _ => Ok(()),
        },
    }
}
