//! Retry policies for outbound requests.

use std::time::Duration;

use crate::error::AttemptFailure;

/// Conditions that trigger a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCondition {
    /// Retry on any 5xx status.
    ServerError,
    /// Retry on timeout.
    Timeout,
    /// Retry on connection error.
    ConnectionError,
}

impl RetryCondition {
    /// Every condition the client retries on.
    pub const ALL: [RetryCondition; 3] = [Self::ServerError, Self::Timeout, Self::ConnectionError];

    /// Check if a failed attempt matches this condition.
    pub fn matches(&self, failure: &AttemptFailure) -> bool {
        match (self, failure) {
            (Self::ServerError, AttemptFailure::Status { status, .. }) => {
                (500..600).contains(status)
            }
            (Self::Timeout, AttemptFailure::Timeout(_)) => true,
            (Self::ConnectionError, AttemptFailure::Network(_)) => true,
            _ => false,
        }
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub max_retries: u32,
    /// Base delay; the n-th retry waits `delay * n`.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Linear backoff: wait `delay * n` before the n-th retry.
    pub fn linear(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Check whether to retry after `retries_done` retries ended in `failure`.
    pub fn should_retry(&self, failure: &AttemptFailure, retries_done: u32) -> bool {
        if retries_done >= self.max_retries {
            return false;
        }
        RetryCondition::ALL.iter().any(|c| c.matches(failure))
    }

    /// Delay before the next retry, given how many were already made.
    pub fn delay_before_retry(&self, retries_done: u32) -> Duration {
        self.delay.saturating_mul(retries_done.saturating_add(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::linear(3, Duration::from_millis(1000))
    }
}
