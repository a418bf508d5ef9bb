use serde::Deserialize;
use std::time::Duration;

/// How the wait before retrying a rate-limited request grows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Same wait every time
    Fixed,
    /// `base * attempt`
    Linear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub rate_limit_backoff: Duration,
    pub rate_limit_strategy: BackoffStrategy,
    pub server_error_backoff: Duration,
    /// `None` retries 5xx responses forever
    pub max_server_error_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            rate_limit_backoff: Duration::from_secs(5 * 60),
            rate_limit_strategy: BackoffStrategy::Fixed,
            server_error_backoff: Duration::from_secs(2 * 60),
            max_server_error_retries: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Per-line attempt counters, kept in memory for the lifetime of one line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    pub rate_limited: u32,
    pub server_errors: u32,
}

impl RetryState {
    pub fn retries(&self) -> u32 {
        self.rate_limited + self.server_errors
    }
}

impl RetryPolicy {
    /// Rate limiting never exhausts; `attempt` is the 1-based count of 429s
    /// seen so far for the line.
    pub fn rate_limit_wait(&self, attempt: u32) -> Duration {
        match self.rate_limit_strategy {
            BackoffStrategy::Fixed => self.rate_limit_backoff,
            BackoffStrategy::Linear => self.rate_limit_backoff.saturating_mul(attempt.max(1)),
        }
    }

    /// `attempt` is the 1-based count of 5xx responses seen so far for the
    /// line. With a cap of `n`, the line gets `n` retries (n + 1 requests).
    pub fn on_server_error(&self, attempt: u32) -> RetryDecision {
        match self.max_server_error_retries {
            Some(max) if attempt > max => RetryDecision::GiveUp,
            _ => RetryDecision::RetryAfter(self.server_error_backoff),
        }
    }
}
