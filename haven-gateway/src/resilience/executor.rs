//! Deadline-bounded execution of provider calls with policy-driven retries.
//!
//! A timed-out attempt is dropped, which drops the in-flight `reqwest`
//! future and releases its connection. Timeouts end the call; they are
//! reported once and never retried.

use std::future::Future;
use std::time::Duration;

use haven_core::{DeadlineMode, ResilienceSettings};
use tokio::time::{Instant, sleep, timeout};
use tracing::warn;

use crate::providers::{CompletionProvider, CompletionRequest, ProviderError};
use crate::resilience::error::CompletionError;
use crate::resilience::retry::RetryPolicy;

/// Runs a call under a deadline, retrying transient failures.
#[derive(Debug, Clone, Copy)]
pub struct BoundedExecutor {
    policy: RetryPolicy,
    deadline: Duration,
    mode: DeadlineMode,
}

impl Default for BoundedExecutor {
    fn default() -> Self {
        Self::new(
            RetryPolicy::default(),
            Duration::from_secs(60),
            DeadlineMode::PerAttempt,
        )
    }
}

impl BoundedExecutor {
    pub fn new(policy: RetryPolicy, deadline: Duration, mode: DeadlineMode) -> Self {
        Self {
            policy,
            deadline,
            mode,
        }
    }

    pub fn from_settings(settings: &ResilienceSettings) -> Self {
        Self::new(
            RetryPolicy::from_settings(settings),
            Duration::from_millis(settings.deadline_ms),
            settings.deadline_mode,
        )
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Validate `request` and send it to `provider` under this executor's policy.
    pub async fn complete(
        &self,
        provider: &dyn CompletionProvider,
        request: &CompletionRequest,
    ) -> Result<String, CompletionError> {
        request.validate().map_err(CompletionError::InvalidRequest)?;
        self.execute(|_| provider.complete(request)).await
    }

    /// Run `call` until it succeeds, fails terminally, or the deadline fires.
    ///
    /// `call` receives the 1-based attempt number. In `PerAttempt` mode each
    /// attempt gets the full deadline; in `Total` mode attempts and backoff
    /// waits share one budget.
    pub async fn execute<T, F, Fut>(&self, mut call: F) -> Result<T, CompletionError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let started = Instant::now();
        let mut attempt = 1;

        loop {
            let budget = self.attempt_budget(started);
            if budget.is_zero() {
                return Err(CompletionError::Timeout {
                    after: self.deadline,
                });
            }

            let err = match timeout(budget, call(attempt)).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => err,
                Err(_) => {
                    warn!(
                        attempt,
                        deadline_ms = self.deadline.as_millis() as u64,
                        "provider call timed out"
                    );
                    return Err(CompletionError::Timeout {
                        after: self.deadline,
                    });
                }
            };

            let decision = self.policy.decide(&err, attempt);
            if !decision.should_retry || !self.fits_budget(started, decision.delay) {
                return Err(CompletionError::from_provider(err, attempt));
            }

            warn!(
                attempt,
                max_attempts = self.policy.max_attempts(),
                delay_ms = decision.delay.as_millis() as u64,
                error = %err,
                "retrying provider call"
            );
            sleep(decision.delay).await;
            attempt += 1;
        }
    }

    fn attempt_budget(&self, started: Instant) -> Duration {
        match self.mode {
            DeadlineMode::PerAttempt => self.deadline,
            DeadlineMode::Total => self.deadline.saturating_sub(started.elapsed()),
        }
    }

    /// Whether a backoff of `delay` still leaves time for another attempt.
    fn fits_budget(&self, started: Instant, delay: Duration) -> bool {
        match self.mode {
            DeadlineMode::PerAttempt => true,
            DeadlineMode::Total => started.elapsed().saturating_add(delay) < self.deadline,
        }
    }
}
