//! Sliding-window rate limiter
//!
//! Keys are arbitrary strings (`<conf_key>:<project_id>` for notifications,
//! `<conf_key>:<organization_id>` for data forwarding). Each key remembers
//! the instants of its accepted hits within the current window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct RateLimiter {
    hits: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hit for `key` and report whether it exceeds `limit` per `window`.
    ///
    /// A `limit` of zero or an empty window never limits. Limited hits are
    /// not recorded.
    pub fn is_limited(&self, key: &str, limit: u32, window: Duration) -> bool {
        self.is_limited_at(key, limit, window, Instant::now())
    }

    fn is_limited_at(&self, key: &str, limit: u32, window: Duration, now: Instant) -> bool {
        if limit == 0 || window.is_zero() {
            return false;
        }

        let mut hits = self.hits.entry(key.to_string()).or_default();

        // Remove hits that fell out of the window
        while let Some(&front) = hits.front() {
            if now.duration_since(front) >= window {
                hits.pop_front();
            } else {
                break;
            }
        }

        if hits.len() >= limit as usize {
            return true;
        }

        hits.push_back(now);
        false
    }

    /// Forget every recorded hit for `key`
    pub fn reset(&self, key: &str) {
        self.hits.remove(key);
    }
}
