//! Bounded retry with exponential backoff for upstream calls.

use std::time::Duration;

use crate::config::HttpConfig;

/// Per-attempt timeout plus a bounded number of retries.
///
/// Retry `n` (0-based) waits `base_delay * 2^n` before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_http_config(&HttpConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_http_config(http: &HttpConfig) -> Self {
        Self {
            timeout: http.timeout(),
            max_retries: http.retry_max_attempts,
            base_delay: http.retry_backoff(),
        }
    }

    /// Attempts made before giving up, including the first.
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}
