//! Bounded retry with exponential backoff around a single analysis call.

use std::time::Duration;

use tracing::warn;

use super::outcome::AnalysisOutcome;
use crate::llm::AnalysisClient;
use crate::records::CaseRecord;

/// Default retry ceiling (calls, not retries).
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for exponential backoff.
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Default upper bound on a single backoff delay.
const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(60);

/// State of one record's retry loop.
///
/// Transitions: a transient failure below the attempt ceiling moves to
/// `Retrying(n)`; a transient failure at the ceiling or any permanent
/// failure moves to `Failed`; a successful call moves to `Succeeded`.
/// Terminal states never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// No call made yet.
    Pending,
    /// The given attempt failed transiently; another call follows.
    Retrying(u32),
    /// Terminal: the analysis produced output.
    Succeeded,
    /// Terminal: the retry budget is exhausted or the failure was permanent.
    Failed,
}

impl AttemptState {
    /// Next state after a failed call, given the 1-based attempt just made.
    pub fn on_failure(self, attempt: u32, max_attempts: u32, transient: bool) -> AttemptState {
        match self {
            AttemptState::Pending | AttemptState::Retrying(_) => {
                if transient && attempt < max_attempts {
                    AttemptState::Retrying(attempt)
                } else {
                    AttemptState::Failed
                }
            }
            terminal => terminal,
        }
    }

    /// Next state after a successful call.
    pub fn on_success(self) -> AttemptState {
        match self {
            AttemptState::Pending | AttemptState::Retrying(_) => AttemptState::Succeeded,
            terminal => terminal,
        }
    }

    /// Whether the loop stops in this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptState::Succeeded | AttemptState::Failed)
    }
}

/// Retry policy wrapping a single analysis call.
///
/// Holds no shared mutable state; any number of clones can run in parallel
/// workers safely.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum analysis calls per record (1 + retries).
    pub max_attempts: u32,
    /// Base delay; doubles after each transient failure.
    pub backoff_base: Duration,
    /// Upper bound on a single delay.
    pub backoff_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_cap: DEFAULT_BACKOFF_CAP,
        }
    }
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` is clamped to at least one call.
    pub fn new(max_attempts: u32, backoff_base: Duration, backoff_cap: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            backoff_cap,
        }
    }

    /// Delay before the retry that follows the given 1-based attempt.
    ///
    /// Exponential: base, 2x base, 4x base, ... capped at `backoff_cap`.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = (attempt - 1).min(16);
        self.backoff_base
            .saturating_mul(1 << exponent)
            .min(self.backoff_cap)
    }

    /// Run the full retry loop for one record, producing its terminal outcome.
    ///
    /// Every terminal condition is an outcome, never an error: transient
    /// failures are retried with backoff until `max_attempts` is exhausted;
    /// a permanent failure stops immediately.
    pub async fn execute(&self, client: &dyn AnalysisClient, record: &CaseRecord) -> AnalysisOutcome {
        let mut state = AttemptState::Pending;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match client.analyze(record).await {
                Ok(output) => {
                    state = state.on_success();
                    debug_assert!(state.is_terminal());
                    return AnalysisOutcome::success(record, output, attempt);
                }
                Err(err) => {
                    let transient = err.is_transient();
                    warn!(
                        index = record.index,
                        attempt,
                        max_attempts = self.max_attempts,
                        transient,
                        error = %err,
                        "Analysis attempt failed"
                    );

                    state = state.on_failure(attempt, self.max_attempts, transient);
                    match state {
                        AttemptState::Retrying(_) => {
                            tokio::time::sleep(self.backoff_delay(attempt)).await;
                        }
                        _ => return AnalysisOutcome::failure(record, attempt, &err),
                    }
                }
            }
        }
    }
}
