//! Retry policy: classify a provider failure and decide whether to try again.
//!
//! Rules, in order:
//! 1. a client error (4xx other than 429) or a missing credential is never retried;
//! 2. once the attempt budget is spent nothing is retried;
//! 3. transport failures, 429 and 5xx are retried after `base * 2^(attempt-1)`;
//! 4. anything else surfaces immediately.

use std::time::Duration;

use haven_core::ResilienceSettings;

use crate::providers::ProviderError;

/// Message fragments that mark an opaque error as rate limiting.
const RATE_LIMIT_MARKERS: &[&str] = &["429"];
/// Message fragments that mark an opaque error as a server failure.
const SERVER_MARKERS: &[&str] = &["500", "503"];
/// Message fragments that mark an opaque error as a network failure.
const TRANSPORT_MARKERS: &[&str] = &["fetch", "network", "failed to execute"];

/// What kind of failure a provider error represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Connection, DNS or I/O failure before a response arrived
    Transport,
    /// HTTP 429
    RateLimited,
    /// HTTP 5xx
    Server,
    /// HTTP 4xx other than 429
    Client(u16),
    /// A credential is missing somewhere along the path
    MissingCredential,
    /// No status and nothing recognizable in the message
    Unclassified,
}

impl ErrorClass {
    /// Whether this class is worth another attempt.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Transport | Self::RateLimited | Self::Server)
    }
}

/// Classify a provider error.
///
/// Typed variants are classified by status or kind. Only `Opaque` errors fall
/// back to matching their lower-cased message text.
pub fn classify(err: &ProviderError) -> ErrorClass {
    match err {
        ProviderError::Transport(_) => ErrorClass::Transport,
        ProviderError::ApiError { status, .. } => classify_status(*status),
        ProviderError::Opaque(message) => classify_message(message),
        ProviderError::MissingCredential(_) => ErrorClass::MissingCredential,
        ProviderError::NoContent
        | ProviderError::Serialization(_)
        | ProviderError::InvalidFormat(_) => ErrorClass::Unclassified,
    }
}

fn classify_status(status: u16) -> ErrorClass {
    match status {
        429 => ErrorClass::RateLimited,
        400..=499 => ErrorClass::Client(status),
        500..=599 => ErrorClass::Server,
        _ => ErrorClass::Unclassified,
    }
}

fn classify_message(message: &str) -> ErrorClass {
    let lowered = message.to_lowercase();
    let contains_any = |markers: &[&str]| markers.iter().any(|m| lowered.contains(m));

    if contains_any(RATE_LIMIT_MARKERS) {
        ErrorClass::RateLimited
    } else if contains_any(SERVER_MARKERS) {
        ErrorClass::Server
    } else if contains_any(TRANSPORT_MARKERS) {
        ErrorClass::Transport
    } else {
        ErrorClass::Unclassified
    }
}

/// Outcome of [`RetryPolicy::decide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub should_retry: bool,
    pub delay: Duration,
}

impl RetryDecision {
    pub fn stop() -> Self {
        Self {
            should_retry: false,
            delay: Duration::ZERO,
        }
    }

    pub fn retry_after(delay: Duration) -> Self {
        Self {
            should_retry: true,
            delay,
        }
    }
}

/// Attempt budget and backoff base. Pure: holds no per-call state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first call; it is clamped to at least 1.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_settings(settings: &ResilienceSettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_millis(settings.base_delay_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Decide what to do after attempt number `attempt` (1-based) failed with `err`.
    pub fn decide(&self, err: &ProviderError, attempt: u32) -> RetryDecision {
        let class = classify(err);

        if matches!(class, ErrorClass::Client(_) | ErrorClass::MissingCredential) {
            return RetryDecision::stop();
        }
        if attempt >= self.max_attempts {
            return RetryDecision::stop();
        }
        if class.is_transient() {
            return RetryDecision::retry_after(self.backoff(attempt));
        }

        RetryDecision::stop()
    }

    /// Delay before the attempt following `attempt`. Saturates at `Duration::MAX`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        2u32.checked_pow(exponent)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}
