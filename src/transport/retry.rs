//! Retry rules for outbound tool calls.
//!
//! Backoff before retry `n` is `backoff_factor * 2^(n-1)` seconds, capped at
//! [`MAX_BACKOFF`]. A `Retry-After` header on the failed response takes
//! precedence over the computed delay.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::config::TransportConfig;

use super::CallKind;

/// Longest delay slept between two attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(120);

const TOO_MANY_REQUESTS: u16 = 429;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: f64,
    pub retry_statuses: Vec<u16>,
    pub retry_mutating_calls: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TransportConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &TransportConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_factor: config.backoff_factor,
            retry_statuses: config.retry_statuses.clone(),
            retry_mutating_calls: config.retry_mutating_calls,
        }
    }

    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether attempt number `retries_done + 1` is still allowed
    pub fn has_budget(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }

    /// A 429 means the request was rejected before processing, so it is always
    /// safe to repeat. Other listed statuses repeat only for read-only calls
    /// unless mutating retries are enabled.
    pub fn should_retry_status(&self, status: u16, kind: CallKind) -> bool {
        if !self.retry_statuses.contains(&status) {
            return false;
        }
        status == TOO_MANY_REQUESTS || self.allows_ambiguous_retry(kind)
    }

    /// The request may have reached the upstream before the timer fired
    pub fn should_retry_timeout(&self, kind: CallKind) -> bool {
        self.allows_ambiguous_retry(kind)
    }

    /// Refused connections never reached the upstream
    pub fn should_retry_connect(&self) -> bool {
        true
    }

    fn allows_ambiguous_retry(&self, kind: CallKind) -> bool {
        kind == CallKind::ReadOnly || self.retry_mutating_calls
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 || self.backoff_factor.is_nan() || self.backoff_factor <= 0.0 {
            return Duration::ZERO;
        }
        let exponent = (retry - 1).min(30) as i32;
        let secs = self.backoff_factor * 2f64.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }

    /// Delay to honor from a `Retry-After: <seconds>` header, if any
    pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
        headers
            .get(RETRY_AFTER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(|secs| Duration::from_secs(secs).min(MAX_BACKOFF))
    }
}
