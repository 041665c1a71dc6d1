//! Sliding-window rate limiter for enqueue requests
//!
//! Each actor gets a bucket of recent attempt timestamps. On every check the
//! bucket is trimmed from the front (timestamps are recorded in
//! non-decreasing order), then the attempt is either denied or recorded.
//! State is in-memory only; an empty limiter after restart is correct.

use crate::config::RateLimitConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Per-actor sliding time-window counter
pub struct RateLimiter {
    max_count: usize,
    window: Duration,
    buckets: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            max_count: config.max_count,
            window: Duration::from_secs(config.window_seconds),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether `actor` may enqueue at `now`, recording the attempt if so.
    ///
    /// Denied attempts are not recorded, so a spamming actor does not extend
    /// its own lockout. A timestamp leaves the window once `now - t >= window`.
    pub fn allow(&self, actor: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().unwrap();
        let bucket = buckets.entry(actor.to_string()).or_default();

        while let Some(&front) = bucket.front() {
            if now.duration_since(front) >= self.window {
                bucket.pop_front();
            } else {
                break;
            }
        }

        if bucket.len() >= self.max_count {
            return false;
        }

        bucket.push_back(now);
        true
    }

    /// Number of actors with a live bucket (trimmed lazily, so this can
    /// include actors whose attempts have all expired)
    pub fn actor_count(&self) -> usize {
        self.buckets.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_count: usize, window_seconds: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_count,
            window_seconds,
        })
    }

    #[test]
    fn test_allows_up_to_max_count() {
        let rl = limiter(3, 10);
        let base = Instant::now();

        assert!(rl.allow("a", base));
        assert!(rl.allow("a", base + Duration::from_secs(1)));
        assert!(rl.allow("a", base + Duration::from_secs(2)));
        // 4th attempt inside the window is denied
        assert!(!rl.allow("a", base + Duration::from_secs(3)));
    }

    #[test]
    fn test_window_slides() {
        let rl = limiter(3, 10);
        let base = Instant::now();

        assert!(rl.allow("a", base));
        assert!(rl.allow("a", base + Duration::from_secs(1)));
        assert!(rl.allow("a", base + Duration::from_secs(2)));
        assert!(!rl.allow("a", base + Duration::from_secs(3)));
        // At t=11 the attempts at t=0 and t=1 have left the window
        assert!(rl.allow("a", base + Duration::from_secs(11)));
    }

    #[test]
    fn test_eviction_boundary_is_inclusive() {
        let rl = limiter(1, 10);
        let base = Instant::now();

        assert!(rl.allow("a", base));
        // Exactly window seconds later: the old attempt is evicted
        assert!(rl.allow("a", base + Duration::from_secs(10)));
    }

    #[test]
    fn test_denied_attempts_not_recorded() {
        let rl = limiter(1, 10);
        let base = Instant::now();

        assert!(rl.allow("a", base));
        assert!(!rl.allow("a", base + Duration::from_secs(5)));
        assert!(!rl.allow("a", base + Duration::from_secs(9)));
        // Denials above did not extend the window past base+10
        assert!(rl.allow("a", base + Duration::from_secs(10)));
    }

    #[test]
    fn test_actors_independent() {
        let rl = limiter(1, 10);
        let base = Instant::now();

        assert!(rl.allow("a", base));
        assert!(rl.allow("b", base));
        assert!(!rl.allow("a", base + Duration::from_secs(1)));
        assert_eq!(rl.actor_count(), 2);
    }
}
