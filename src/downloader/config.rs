//! Export configuration constants, retry policy, and rate limiter settings

use rand::Rng;
use std::time::Duration;

/// Maximum number of retries for a failed request.
/// 5 retries with a 30s cap bounds a single request to roughly one minute of backoff.
pub const MAX_RETRIES: u32 = 5;

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000; // 1 second

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30000; // 30 seconds

/// Upper bound of the random jitter added to exponential backoff.
pub const MAX_JITTER_MS: u64 = 100;

/// Slack added on top of a server-supplied `Retry-After` hint.
pub const RETRY_AFTER_SLACK_MS: u64 = 250;

/// Provider request quota per window.
pub const DEFAULT_QUOTA: usize = 60;

/// Length of the provider's rate window in seconds.
pub const DEFAULT_WINDOW_SECS: u64 = 60;

/// Requests held back from the quota as headroom.
pub const DEFAULT_SAFETY_MARGIN: usize = 2;

/// Slack added when sleeping until the oldest reservation leaves the window.
pub const LIMITER_SLACK_MS: u64 = 50;

/// Records requested per page of the access-log query.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Retry behaviour of the request executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = max_retries + 1)
    pub max_retries: u32,
    /// Delay of the first retry
    pub base_backoff: Duration,
    /// Cap applied to the exponential delay
    pub max_backoff: Duration,
    /// Upper bound of the uniform jitter added to exponential delays
    pub max_jitter: Duration,
    /// Extra wait added to a server-provided `Retry-After`
    pub retry_after_slack: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(MAX_BACKOFF_MS),
            max_jitter: Duration::from_millis(MAX_JITTER_MS),
            retry_after_slack: Duration::from_millis(RETRY_AFTER_SLACK_MS),
        }
    }
}

impl RetryPolicy {
    /// Policy with a custom retry count and default timings
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Total number of physical attempts allowed
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// `min(max_backoff, base_backoff * 2^(attempt-1))` for a 1-indexed retry
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_backoff
            .saturating_mul(2_u32.pow(exponent))
            .min(self.max_backoff)
    }

    /// Exponential backoff plus jitter drawn from `[0, max_jitter]`
    pub fn backoff_with_jitter(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
        };
        self.backoff(attempt) + jitter
    }

    /// Wait derived from a server `Retry-After` hint
    pub fn retry_after_delay(&self, hint: Duration) -> Duration {
        hint.saturating_add(self.retry_after_slack)
    }
}

/// Quota settings for the sliding-window limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Requests the provider allows per window
    pub quota: usize,
    /// Length of the rolling window
    pub window: Duration,
    /// Requests held back as headroom
    pub safety_margin: usize,
    /// Extra sleep past the moment the oldest reservation expires
    pub slack: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            quota: DEFAULT_QUOTA,
            window: Duration::from_secs(DEFAULT_WINDOW_SECS),
            safety_margin: DEFAULT_SAFETY_MARGIN,
            slack: Duration::from_millis(LIMITER_SLACK_MS),
        }
    }
}

impl RateLimiterConfig {
    /// Config for `quota` requests per `window` with the given margin
    pub fn new(quota: usize, window: Duration, safety_margin: usize) -> Self {
        Self {
            quota,
            window,
            safety_margin,
            ..Self::default()
        }
    }

    /// `max(1, quota - safety_margin)`
    pub fn effective_limit(&self) -> usize {
        effective_limit(self.quota, self.safety_margin)
    }
}

pub(crate) fn effective_limit(quota: usize, safety_margin: usize) -> usize {
    quota.saturating_sub(safety_margin).max(1)
}
