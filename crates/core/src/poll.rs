//! Retrying assertions
//!
//! [`poll`] re-runs a retrieval and a predicate until the predicate holds on a
//! freshly retrieved value or the timeout elapses. [`check`] is the
//! non-retrying path: one retrieval, one predicate, no waiting.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::error::{AssertionError, PollError, TimeoutError};
use crate::expect::Verdict;

/// Default time a poll keeps retrying (4 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 4000;

/// Default pause between poll attempts (50ms)
pub const DEFAULT_INTERVAL_MS: u64 = 50;

/// Timing for a polled assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Give up once this much time has passed since the first attempt
    pub timeout: Duration,

    /// Pause between attempts
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
        }
    }
}

impl PollOptions {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn from_millis(timeout_ms: u64, interval_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(interval_ms),
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Poll `retrieve` until `predicate` holds on the value it returns.
///
/// A failed retrieval counts as a non-matching attempt. The first attempt
/// always happens; when the timeout is shorter than the interval it is the
/// only one. Between attempts the loop sleeps on `clock` for the interval, or
/// for whatever is left of the timeout if that is shorter, so the last
/// attempt lands on the deadline.
pub async fn poll<T, R, Fut, E, P>(
    clock: &dyn Clock,
    mut retrieve: R,
    mut predicate: P,
    options: PollOptions,
) -> Result<T, PollError<T>>
where
    R: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
    P: FnMut(&T) -> Verdict,
{
    if options.interval.is_zero() {
        return Err(PollError::InvalidInterval);
    }

    let start = clock.now();
    let mut attempts: u32 = 0;
    let mut last_value: Option<T> = None;
    let mut last_reason = String::new();

    loop {
        attempts += 1;

        match retrieve().await {
            Ok(value) => match predicate(&value) {
                Ok(()) => {
                    if attempts > 1 {
                        debug!("Assertion passed after {} attempts", attempts);
                    }
                    return Ok(value);
                }
                Err(reason) => {
                    last_reason = reason;
                    last_value = Some(value);
                }
            },
            Err(e) => {
                last_reason = e.to_string();
            }
        }

        let elapsed = clock.now().saturating_duration_since(start);
        if elapsed >= options.timeout || options.timeout < options.interval {
            debug!(
                "Assertion timed out after {} attempts ({} ms): {}",
                attempts,
                elapsed.as_millis(),
                last_reason
            );
            return Err(PollError::Timeout(TimeoutError {
                timeout: options.timeout,
                elapsed,
                attempts,
                last_value,
                last_reason,
            }));
        }

        trace!("Attempt {} did not match: {}", attempts, last_reason);
        let remaining = options.timeout - elapsed;
        clock.sleep(options.interval.min(remaining)).await;
    }
}

/// Evaluate `predicate` against a single retrieval, without retrying
pub async fn check<T, R, Fut, E, P>(retrieve: R, predicate: P) -> Result<T, AssertionError>
where
    R: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
    P: FnOnce(&T) -> Verdict,
{
    let value = retrieve()
        .await
        .map_err(|e| AssertionError::new(e.to_string()))?;
    predicate(&value).map_err(AssertionError::new)?;
    Ok(value)
}
