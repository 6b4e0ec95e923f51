//! Error types for suiterun

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::tree::HookKind;

/// Invalid registration, raised while the suite tree is being built.
///
/// A structure error is fatal: no test runs once one has been recorded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("{hook} hook registered outside of any group")]
    HookOutsideGroup { hook: HookKind },

    #[error("group '{name}' registers itself ({})", .chain.join(" -> "))]
    RecursiveRegistration { name: String, chain: Vec<String> },

    #[error("shared group not defined: {0}")]
    UnknownShared(String),

    #[error("shared group already defined: {0}")]
    DuplicateShared(String),

    #[error("{kind} name is empty (under '{parent}')")]
    EmptyName { kind: &'static str, parent: String },
}

/// A one-shot assertion that did not hold.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AssertionError {
    pub message: String,
}

impl AssertionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A polled assertion that never held within its timeout.
#[derive(Debug, Clone)]
pub struct TimeoutError<T> {
    /// Configured timeout
    pub timeout: Duration,

    /// Time actually spent polling
    pub elapsed: Duration,

    /// Number of retrieve/predicate iterations
    pub attempts: u32,

    /// Most recent successfully retrieved value
    pub last_value: Option<T>,

    /// Why the most recent iteration did not match
    pub last_reason: String,
}

impl<T: fmt::Debug> fmt::Display for TimeoutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "timed out after {} ms ({} attempts): {}",
            self.timeout.as_millis(),
            self.attempts,
            self.last_reason
        )?;
        if let Some(value) = &self.last_value {
            write!(f, " (last value: {:?})", value)?;
        }
        Ok(())
    }
}

impl<T: fmt::Debug> std::error::Error for TimeoutError<T> {}

/// Failure of [`crate::poll::poll`]
#[derive(Debug)]
pub enum PollError<T> {
    Timeout(TimeoutError<T>),
    InvalidInterval,
}

impl<T> PollError<T> {
    /// The timeout details, if this is a timeout
    pub fn as_timeout(&self) -> Option<&TimeoutError<T>> {
        match self {
            PollError::Timeout(e) => Some(e),
            PollError::InvalidInterval => None,
        }
    }
}

impl<T: fmt::Debug> fmt::Display for PollError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollError::Timeout(e) => e.fmt(f),
            PollError::InvalidInterval => f.write_str("poll interval must be positive"),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for PollError<T> {}

/// Failure of a test body or hook.
///
/// The scheduler converts these into [`crate::outcome::FailureDetail`]s; they
/// never escape a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(#[from] AssertionError),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    Failed(String),
}

impl StepError {
    pub fn failed(message: impl Into<String>) -> Self {
        StepError::Failed(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StepError::Timeout(_))
    }

    /// Prefix the message with `context`, keeping the variant
    pub fn with_context(self, context: impl fmt::Display) -> Self {
        match self {
            StepError::Assertion(e) => {
                StepError::Assertion(AssertionError::new(format!("{}: {}", context, e.message)))
            }
            StepError::Timeout(m) => StepError::Timeout(format!("{}: {}", context, m)),
            StepError::Failed(m) => StepError::Failed(format!("{}: {}", context, m)),
        }
    }
}

impl<T: fmt::Debug> From<TimeoutError<T>> for StepError {
    fn from(e: TimeoutError<T>) -> Self {
        StepError::Timeout(e.to_string())
    }
}

impl<T: fmt::Debug> From<PollError<T>> for StepError {
    fn from(e: PollError<T>) -> Self {
        match e {
            PollError::Timeout(timeout) => timeout.into(),
            other => StepError::Failed(other.to_string()),
        }
    }
}

impl From<std::io::Error> for StepError {
    fn from(e: std::io::Error) -> Self {
        StepError::Failed(format!("IO error: {}", e))
    }
}

/// Result of a single step invocation
pub type StepResult = Result<(), StepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_includes_last_value() {
        let err = TimeoutError {
            timeout: Duration::from_millis(50),
            elapsed: Duration::from_millis(50),
            attempts: 6,
            last_value: Some(3),
            last_reason: "expected 5".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "timed out after 50 ms (6 attempts): expected 5 (last value: 3)"
        );
    }

    #[test]
    fn test_timeout_converts_to_step_error() {
        let err: TimeoutError<String> = TimeoutError {
            timeout: Duration::from_millis(10),
            elapsed: Duration::from_millis(10),
            attempts: 1,
            last_value: None,
            last_reason: "file not found".to_string(),
        };
        let step: StepError = err.into();
        assert!(step.is_timeout());
        assert!(step.to_string().contains("file not found"));
    }

    #[test]
    fn test_recursive_registration_message() {
        let err = StructureError::RecursiveRegistration {
            name: "login".to_string(),
            chain: vec!["login".to_string(), "session".to_string(), "login".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "group 'login' registers itself (login -> session -> login)"
        );
    }

    #[test]
    fn test_with_context_keeps_variant() {
        let err = StepError::Timeout("timed out".to_string()).with_context("wait_for_file:/tmp/x");
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "wait_for_file:/tmp/x: timed out");

        let err = StepError::Assertion(AssertionError::new("expected 1, got 2")).with_context("exec:ls");
        assert_eq!(err.to_string(), "assertion failed: exec:ls: expected 1, got 2");
    }
}
