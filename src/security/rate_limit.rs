//! Per-API-key rate limiting.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::observability::metrics;

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
    /// Limit the bucket was sized for; a different limit resets it.
    requests_per_minute: u32,
}

impl TokenBucket {
    fn new(requests_per_minute: u32, now: Instant) -> Self {
        Self {
            tokens: f64::from(requests_per_minute),
            last_update: now,
            requests_per_minute,
        }
    }

    fn capacity(&self) -> f64 {
        f64::from(self.requests_per_minute)
    }

    fn refill_per_sec(&self) -> f64 {
        self.capacity() / 60.0
    }

    fn try_acquire(&mut self, now: Instant) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * self.refill_per_sec()).min(self.capacity());
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let missing = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(missing / self.refill_per_sec()))
        }
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    /// Rejected; retry after this many whole seconds (at least 1).
    Limited { retry_after_secs: u64 },
}

/// Token buckets keyed by API key.
///
/// Buckets live in a sharded map, so concurrent requests only contend when
/// they hash to the same shard.
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one token for `key`. A zero limit always allows.
    pub fn check(&self, key: &str, requests_per_minute: u32) -> Decision {
        self.check_at(key, requests_per_minute, Instant::now())
    }

    fn check_at(&self, key: &str, requests_per_minute: u32, now: Instant) -> Decision {
        if requests_per_minute == 0 {
            return Decision::Allowed;
        }

        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(requests_per_minute, now));
        if bucket.requests_per_minute != requests_per_minute {
            *bucket = TokenBucket::new(requests_per_minute, now);
        }

        match bucket.try_acquire(now) {
            Ok(()) => Decision::Allowed,
            Err(wait) => {
                tracing::warn!(rpm = requests_per_minute, "Rate limit exceeded");
                metrics::record_rate_limited();
                Decision::Limited {
                    retry_after_secs: wait.as_secs_f64().ceil().max(1.0) as u64,
                }
            }
        }
    }

    /// Number of keys with a live bucket.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_limit_disables() {
        let limiter = RateLimiter::new();
        for _ in 0..1000 {
            assert_eq!(limiter.check("k", 0), Decision::Allowed);
        }
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_burst_then_limited() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        for _ in 0..3 {
            assert_eq!(limiter.check_at("k", 3, now), Decision::Allowed);
        }
        assert_eq!(
            limiter.check_at("k", 3, now),
            Decision::Limited { retry_after_secs: 20 }
        );

        // Other keys have their own bucket.
        assert_eq!(limiter.check_at("other", 3, now), Decision::Allowed);
    }

    #[test]
    fn test_refill_over_time() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        assert_eq!(limiter.check_at("k", 60, start), Decision::Allowed);
        for _ in 0..59 {
            limiter.check_at("k", 60, start);
        }
        assert!(matches!(limiter.check_at("k", 60, start), Decision::Limited { .. }));

        let later = start + Duration::from_secs(2);
        assert_eq!(limiter.check_at("k", 60, later), Decision::Allowed);
    }

    #[test]
    fn test_limit_change_resets_bucket() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        assert_eq!(limiter.check_at("k", 1, now), Decision::Allowed);
        assert!(matches!(limiter.check_at("k", 1, now), Decision::Limited { .. }));
        assert_eq!(limiter.check_at("k", 5, now), Decision::Allowed);
    }

    #[test]
    fn test_concurrent_checks_share_budget() {
        let limiter = std::sync::Arc::new(RateLimiter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|_| limiter.check("shared", 100) == Decision::Allowed)
                        .count()
                })
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // 100 burst plus whatever trickles in while the threads run.
        assert!((100..=110).contains(&allowed), "allowed {allowed}");
    }
}
