// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sliding-window admission control keyed by chat identity.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use civic_config::model::RateLimitConfig;
use tokio::time::Instant;
use tracing::debug;

/// Admission control for report starts.
pub trait RateLimiter: Send + Sync {
    /// Records an attempt for `identity` and returns whether it is admitted.
    fn allow(&self, identity: &str) -> bool;

    fn max_requests(&self) -> usize;

    fn window(&self) -> Duration;
}

/// Counts admitted requests per identity within a trailing window.
///
/// Rejected attempts are not recorded. Histories are pruned lazily on each
/// call, and once more than `sweep_threshold` identities are tracked every
/// history is pruned and empty ones are dropped.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max: usize,
    window: Duration,
    sweep_threshold: usize,
    history: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max: usize, window: Duration, sweep_threshold: usize) -> Self {
        Self {
            max,
            window,
            sweep_threshold,
            history: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_requests,
            Duration::from_secs(config.window_secs),
            config.sweep_threshold,
        )
    }

    /// Number of identities currently tracked.
    pub fn tracked(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

fn prune(times: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while times
        .front()
        .is_some_and(|&t| now.duration_since(t) >= window)
    {
        times.pop_front();
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn allow(&self, identity: &str) -> bool {
        let now = Instant::now();
        let mut history = self
            .history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let times = history.entry(identity.to_string()).or_default();
        prune(times, now, self.window);
        let admitted = times.len() < self.max;
        if admitted {
            times.push_back(now);
        }

        if history.len() > self.sweep_threshold {
            let before = history.len();
            history.retain(|_, times| {
                prune(times, now, self.window);
                !times.is_empty()
            });
            debug!(before, after = history.len(), "rate limiter swept");
        }

        admitted
    }

    fn max_requests(&self) -> usize {
        self.max
    }

    fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test(start_paused = true)]
    async fn admits_max_then_rejects_until_window_passes() {
        let limiter = SlidingWindowLimiter::new(5, HOUR, 100);
        for _ in 0..5 {
            assert!(limiter.allow("u1"));
        }
        assert!(!limiter.allow("u1"));

        tokio::time::advance(Duration::from_secs(3601)).await;
        assert!(limiter.allow("u1"));
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides_rather_than_resets() {
        let limiter = SlidingWindowLimiter::new(2, HOUR, 100);
        assert!(limiter.allow("u1"));
        tokio::time::advance(Duration::from_secs(1800)).await;
        assert!(limiter.allow("u1"));
        assert!(!limiter.allow("u1"));

        // The first request leaves the window; the second is still inside.
        tokio::time::advance(Duration::from_secs(1800)).await;
        assert!(limiter.allow("u1"));
        assert!(!limiter.allow("u1"));
    }

    #[tokio::test(start_paused = true)]
    async fn identities_are_independent() {
        let limiter = SlidingWindowLimiter::new(1, HOUR, 100);
        assert!(limiter.allow("u1"));
        assert!(!limiter.allow("u1"));
        assert!(limiter.allow("u2"));
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_attempts_do_not_extend_the_window() {
        let limiter = SlidingWindowLimiter::new(1, HOUR, 100);
        assert!(limiter.allow("u1"));
        tokio::time::advance(Duration::from_secs(3000)).await;
        assert!(!limiter.allow("u1"));
        tokio::time::advance(Duration::from_secs(600)).await;
        assert!(limiter.allow("u1"));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn sweep_drops_expired_identities() {
        let limiter = SlidingWindowLimiter::new(5, HOUR, 3);
        for id in ["a", "b", "c"] {
            limiter.allow(id);
        }
        tokio::time::advance(Duration::from_secs(3601)).await;

        // A fourth identity pushes the map over the threshold.
        limiter.allow("d");
        assert_eq!(limiter.tracked(), 1);
        assert!(logs_contain("rate limiter swept"));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_keeps_active_identities() {
        let limiter = SlidingWindowLimiter::new(5, HOUR, 2);
        for id in ["a", "b", "c"] {
            limiter.allow(id);
        }
        assert_eq!(limiter.tracked(), 3);
    }
}
