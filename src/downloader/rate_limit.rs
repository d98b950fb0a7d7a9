//! Sliding-window rate limiting
//!
//! Tracks the instants at which request slots were granted and holds the caller
//! back until the provider quota (minus a safety margin) has room again.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::downloader::config::{effective_limit, RateLimiterConfig};
use crate::metrics;

/// Request-count limiter over a rolling time window
#[derive(Debug)]
pub struct RateLimiter {
    quota: usize,
    window: Duration,
    slack: Duration,
    safety_margin: AtomicUsize,
    reservations: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter from its configuration
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            quota: config.quota,
            window: config.window,
            slack: config.slack,
            safety_margin: AtomicUsize::new(config.safety_margin),
            reservations: Mutex::new(VecDeque::with_capacity(config.effective_limit())),
        }
    }

    /// Create a limiter allowing `quota - safety_margin` requests per `window`
    pub fn request_based(quota: usize, window: Duration, safety_margin: usize) -> Self {
        Self::new(RateLimiterConfig::new(quota, window, safety_margin))
    }

    /// Length of the rolling window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Current `max(1, quota - safety_margin)`
    pub fn effective_limit(&self) -> usize {
        effective_limit(self.quota, self.safety_margin.load(Ordering::Relaxed))
    }

    /// Change the headroom kept below the quota. Takes effect on the next check.
    pub fn set_safety_margin(&self, safety_margin: usize) {
        self.safety_margin.store(safety_margin, Ordering::Relaxed);
    }

    /// Number of reservations still inside the window
    pub fn in_window(&self) -> usize {
        let mut reservations = self.lock();
        evict_expired(&mut reservations, Instant::now(), self.window);
        reservations.len()
    }

    /// Wait until a request may be sent, then record it.
    ///
    /// Polls: every wake-up re-reads the limit, so a margin change made while a
    /// caller sleeps is honoured before the slot is granted.
    pub async fn reserve_slot(&self) {
        let started = Instant::now();

        loop {
            let wait = {
                let now = Instant::now();
                let limit = self.effective_limit();
                let mut reservations = self.lock();
                evict_expired(&mut reservations, now, self.window);

                if reservations.len() < limit {
                    reservations.push_back(now);
                    None
                } else {
                    // Non-empty: limit >= 1 and len >= limit
                    let oldest = reservations.front().copied().unwrap_or(now);
                    let expires_at = oldest + self.window;
                    Some(expires_at.saturating_duration_since(now) + self.slack)
                }
            };

            match wait {
                None => break,
                Some(delay) => {
                    debug!(
                        wait_ms = delay.as_millis() as u64,
                        limit = self.effective_limit(),
                        "Rate limit window full, waiting"
                    );
                    sleep(delay).await;
                }
            }
        }

        metrics::record_rate_limit_wait(started.elapsed());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Instant>> {
        // The window is plain data; a panic elsewhere cannot leave it inconsistent
        self.reservations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}

fn evict_expired(reservations: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(front) = reservations.front() {
        if now.saturating_duration_since(*front) >= window {
            reservations.pop_front();
        } else {
            break;
        }
    }
}
