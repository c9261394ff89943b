use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::LoginLimits;

/// Map size at which recording a failure first sweeps out expired windows.
const SWEEP_THRESHOLD: usize = 1024;

/// Failed-login counter keyed by lowercased identity, fixed window.
pub struct LoginRateLimiter {
    /// identity -> (failures, window_start)
    entries: DashMap<String, (u32, Instant)>,
    max_failures: u32,
    window: Duration,
    sweep_threshold: usize,
}

impl LoginRateLimiter {
    pub fn new(limits: &LoginLimits) -> Self {
        Self {
            entries: DashMap::new(),
            max_failures: limits.max_failures,
            window: Duration::from_secs(limits.window_secs),
            sweep_threshold: SWEEP_THRESHOLD,
        }
    }

    /// Err carries the seconds until the window resets.
    /// Only `record_failure` moves the counter.
    pub fn check(&self, identity: &str) -> Result<(), u64> {
        self.check_at(identity, Instant::now())
    }

    pub fn record_failure(&self, identity: &str) {
        self.record_failure_at(identity, Instant::now());
    }

    pub fn clear(&self, identity: &str) {
        self.entries.remove(&identity.to_lowercase());
    }

    /// Drop every entry whose window started more than `max_age` before `now`.
    fn cleanup_at(&self, max_age: Duration, now: Instant) {
        self.entries
            .retain(|_, (_, start)| now.duration_since(*start) <= max_age);
    }

    fn check_at(&self, identity: &str, now: Instant) -> Result<(), u64> {
        let Some(entry) = self.entries.get(&identity.to_lowercase()) else {
            return Ok(());
        };
        let (failures, start) = *entry.value();

        let elapsed = now.duration_since(start);
        if elapsed > self.window || failures < self.max_failures {
            return Ok(());
        }

        Err(self.window.saturating_sub(elapsed).as_secs())
    }

    fn record_failure_at(&self, identity: &str, now: Instant) {
        // Must run before `entry` takes a shard lock.
        if self.entries.len() >= self.sweep_threshold {
            self.cleanup_at(self.window, now);
        }

        let mut entry = self
            .entries
            .entry(identity.to_lowercase())
            .or_insert((0, now));
        let (failures, start) = entry.value_mut();

        if now.duration_since(*start) > self.window {
            *failures = 1;
            *start = now;
        } else {
            *failures += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> LoginRateLimiter {
        LoginRateLimiter::new(&LoginLimits {
            max_failures: 3,
            window_secs: 60,
        })
    }

    #[test]
    fn blocks_after_max_failures() {
        let limiter = limiter();
        let now = Instant::now();
        for _ in 0..3 {
            assert!(limiter.check_at("a@x.com", now).is_ok());
            limiter.record_failure_at("a@x.com", now);
        }
        assert!(limiter.check_at("A@X.com", now).is_err());
        assert!(limiter.check_at("b@x.com", now).is_ok());
    }

    #[test]
    fn window_expiry_resets_budget() {
        let limiter = limiter();
        let start = Instant::now();
        for _ in 0..3 {
            limiter.record_failure_at("a@x.com", start);
        }
        let later = start + Duration::from_secs(61);
        assert!(limiter.check_at("a@x.com", later).is_ok());

        limiter.record_failure_at("a@x.com", later);
        assert!(limiter.check_at("a@x.com", later).is_ok());
    }

    #[test]
    fn cleanup_evicts_expired_windows() {
        let limiter = limiter();
        let start = Instant::now();
        limiter.record_failure_at("old@x.com", start);
        limiter.record_failure_at("fresh@x.com", start + Duration::from_secs(50));

        limiter.cleanup_at(Duration::from_secs(60), start + Duration::from_secs(70));

        assert_eq!(limiter.entries.len(), 1);
        assert!(limiter.entries.contains_key("fresh@x.com"));
    }

    #[test]
    fn unknown_identities_do_not_accumulate() {
        let mut limiter = limiter();
        limiter.sweep_threshold = 2;
        let start = Instant::now();
        limiter.record_failure_at("ghost1@x.com", start);
        limiter.record_failure_at("ghost2@x.com", start);

        let later = start + Duration::from_secs(61);
        limiter.record_failure_at("ghost3@x.com", later);

        assert_eq!(limiter.entries.len(), 1);
        assert!(limiter.entries.contains_key("ghost3@x.com"));
    }

    #[test]
    fn clear_forgets_failures() {
        let limiter = limiter();
        let now = Instant::now();
        for _ in 0..3 {
            limiter.record_failure_at("a@x.com", now);
        }
        limiter.clear("a@x.com");
        assert!(limiter.check_at("a@x.com", now).is_ok());
    }
}
