use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Fixed one-hour window counter per source.
///
/// A caller that spends its whole budget at the end of one window and again at
/// the start of the next can issue up to twice the limit within an hour.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    window: Duration,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window: Duration::hours(1),
        }
    }

    /// Counts one call against `source` and reports whether it fits the budget.
    pub fn allow(&self, source: &str, limit_per_hour: u32) -> bool {
        self.allow_at(source, limit_per_hour, Utc::now())
    }

    pub fn allow_at(&self, source: &str, limit_per_hour: u32, now: DateTime<Utc>) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(window) = windows.get_mut(source) {
            if now <= window.reset_at {
                window.count = window.count.saturating_add(1);
                let allowed = window.count <= limit_per_hour;
                if !allowed {
                    warn!(
                        "Rate limit hit for {}: {} calls this window (limit {})",
                        source, window.count, limit_per_hour
                    );
                }
                return allowed;
            }
        }

        debug!("Starting new rate limit window for {}", source);
        windows.insert(
            source.to_string(),
            Window {
                count: 1,
                reset_at: now + self.window,
            },
        );
        true
    }

    /// Calls left for `source` in its current window.
    pub fn remaining(&self, source: &str, limit_per_hour: u32) -> u32 {
        self.remaining_at(source, limit_per_hour, Utc::now())
    }

    pub fn remaining_at(&self, source: &str, limit_per_hour: u32, now: DateTime<Utc>) -> u32 {
        let windows = self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match windows.get(source) {
            Some(window) if now <= window.reset_at => limit_per_hour.saturating_sub(window.count),
            _ => limit_per_hour,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_the_call_after_the_limit() {
        let limiter = RateLimiter::new();
        let start = Utc::now();

        for i in 0..3 {
            assert!(limiter.allow_at("adzuna", 3, start + Duration::seconds(i)));
        }
        assert!(!limiter.allow_at("adzuna", 3, start + Duration::seconds(10)));
        assert_eq!(limiter.remaining_at("adzuna", 3, start + Duration::seconds(11)), 0);
    }

    #[test]
    fn window_reset_allows_calls_again() {
        let limiter = RateLimiter::new();
        let start = Utc::now();

        assert!(limiter.allow_at("usajobs", 1, start));
        assert!(!limiter.allow_at("usajobs", 1, start + Duration::minutes(30)));
        assert!(limiter.allow_at("usajobs", 1, start + Duration::minutes(61)));
    }

    #[test]
    fn window_is_still_open_at_its_reset_instant() {
        let limiter = RateLimiter::new();
        let start = Utc::now();

        assert!(limiter.allow_at("usajobs", 1, start));
        assert!(!limiter.allow_at("usajobs", 1, start + Duration::hours(1)));
        assert_eq!(limiter.remaining_at("usajobs", 1, start + Duration::hours(1)), 0);
        assert!(limiter.allow_at("usajobs", 1, start + Duration::hours(1) + Duration::milliseconds(1)));
    }

    #[test]
    fn sources_are_counted_independently() {
        let limiter = RateLimiter::new();
        let now = Utc::now();

        assert!(limiter.allow_at("a", 1, now));
        assert!(!limiter.allow_at("a", 1, now));
        assert!(limiter.allow_at("b", 1, now));
        assert_eq!(limiter.remaining_at("c", 5, now), 5);
    }

    #[test]
    fn boundary_burst_is_allowed() {
        let limiter = RateLimiter::new();
        let start = Utc::now();
        let mut allowed = 0;

        for _ in 0..2 {
            if limiter.allow_at("github", 2, start + Duration::minutes(59)) {
                allowed += 1;
            }
        }
        // the first call at 59m opened a window that ends at 119m
        for _ in 0..2 {
            if limiter.allow_at("github", 2, start + Duration::minutes(120)) {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 4);
    }
}
