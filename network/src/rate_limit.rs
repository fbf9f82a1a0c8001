//! Per-source request limiter using a sliding window.
//!
//! Each source identifier (usually the client IP) keeps the instants of its
//! recent requests. A request is admitted while fewer than `max_requests`
//! fall inside the trailing `window`.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Default window length: 60 seconds.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
/// Default request budget per window.
pub const DEFAULT_MAX_REQUESTS: usize = 100;

pub struct SlidingWindowLimiter {
    window: Duration,
    max_requests: usize,
    hits: HashMap<String, VecDeque<Instant>>,
    last_prune: Option<Instant>,
}

impl SlidingWindowLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            window,
            max_requests,
            hits: HashMap::new(),
            last_prune: None,
        }
    }

    /// Record a request from `source` now. Returns `false` when the source
    /// is over budget; a rejected request is not recorded.
    pub fn check(&mut self, source: &str) -> bool {
        self.check_at(source, Instant::now())
    }

    pub fn check_at(&mut self, source: &str, now: Instant) -> bool {
        let window = self.window;
        let hits = self.hits.entry(source.to_string()).or_default();
        Self::expire(hits, window, now);
        if hits.len() >= self.max_requests {
            return false;
        }
        hits.push_back(now);
        true
    }

    /// Time until the oldest request in the window leaves it, if `source`
    /// is currently over budget.
    pub fn retry_after(&self, source: &str, now: Instant) -> Option<Duration> {
        let hits = self.hits.get(source)?;
        if hits.len() < self.max_requests {
            return None;
        }
        hits.front()
            .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
    }

    /// Drop sources with no request inside the window.
    pub fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.hits.retain(|_, hits| {
            Self::expire(hits, window, now);
            !hits.is_empty()
        });
    }

    /// Prune at most once per window. Returns how many sources were dropped.
    pub fn prune_if_due(&mut self, now: Instant) -> usize {
        let due = self
            .last_prune
            .map_or(true, |at| now.saturating_duration_since(at) >= self.window);
        if !due {
            return 0;
        }
        let before = self.hits.len();
        self.prune(now);
        self.last_prune = Some(now);
        before - self.hits.len()
    }

    fn expire(hits: &mut VecDeque<Instant>, window: Duration, now: Instant) {
        while let Some(oldest) = hits.front() {
            if now.saturating_duration_since(*oldest) < window {
                break;
            }
            hits.pop_front();
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Number of sources currently tracked.
    pub fn tracked_sources(&self) -> usize {
        self.hits.len()
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_REQUESTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_budget() {
        let mut limiter = SlidingWindowLimiter::new(Duration::from_secs(60), 3);
        let now = Instant::now();
        assert!(limiter.check_at("1.2.3.4", now));
        assert!(limiter.check_at("1.2.3.4", now));
        assert!(limiter.check_at("1.2.3.4", now));
        assert!(!limiter.check_at("1.2.3.4", now));
    }

    #[test]
    fn sources_are_independent() {
        let mut limiter = SlidingWindowLimiter::new(Duration::from_secs(60), 1);
        let now = Instant::now();
        assert!(limiter.check_at("a", now));
        assert!(!limiter.check_at("a", now));
        assert!(limiter.check_at("b", now));
    }

    #[test]
    fn window_slides() {
        let mut limiter = SlidingWindowLimiter::new(Duration::from_secs(60), 2);
        let start = Instant::now();
        assert!(limiter.check_at("a", start));
        assert!(limiter.check_at("a", start + Duration::from_secs(30)));
        assert!(!limiter.check_at("a", start + Duration::from_secs(59)));
        // The first request leaves the window at exactly 60s.
        assert!(limiter.check_at("a", start + Duration::from_secs(60)));
        assert!(!limiter.check_at("a", start + Duration::from_secs(61)));
    }

    #[test]
    fn rejected_requests_do_not_extend_the_ban() {
        let mut limiter = SlidingWindowLimiter::new(Duration::from_secs(10), 1);
        let start = Instant::now();
        assert!(limiter.check_at("a", start));
        for s in 1..10 {
            assert!(!limiter.check_at("a", start + Duration::from_secs(s)));
        }
        assert!(limiter.check_at("a", start + Duration::from_secs(10)));
    }

    #[test]
    fn retry_after_counts_down() {
        let mut limiter = SlidingWindowLimiter::new(Duration::from_secs(60), 1);
        let start = Instant::now();
        assert!(limiter.retry_after("a", start).is_none());
        limiter.check_at("a", start);
        assert_eq!(
            limiter.retry_after("a", start + Duration::from_secs(20)),
            Some(Duration::from_secs(40))
        );
    }

    #[test]
    fn prune_forgets_idle_sources() {
        let mut limiter = SlidingWindowLimiter::new(Duration::from_secs(5), 10);
        let start = Instant::now();
        limiter.check_at("a", start);
        limiter.check_at("b", start + Duration::from_secs(4));
        limiter.prune(start + Duration::from_secs(6));
        assert_eq!(limiter.tracked_sources(), 1);
    }

    #[test]
    fn scheduled_prune_runs_once_per_window() {
        let mut limiter = SlidingWindowLimiter::new(Duration::from_secs(10), 10);
        let start = Instant::now();
        assert_eq!(limiter.prune_if_due(start), 0);
        limiter.check_at("a", start);
        limiter.check_at("b", start + Duration::from_secs(5));

        // Not due: the last prune was under a window ago.
        assert_eq!(limiter.prune_if_due(start + Duration::from_secs(9)), 0);
        assert_eq!(limiter.tracked_sources(), 2);

        assert_eq!(limiter.prune_if_due(start + Duration::from_secs(11)), 1);
        assert_eq!(limiter.tracked_sources(), 1);
        assert_eq!(limiter.prune_if_due(start + Duration::from_secs(30)), 1);
        assert_eq!(limiter.tracked_sources(), 0);
    }

    #[test]
    fn default_is_100_per_minute() {
        let limiter = SlidingWindowLimiter::default();
        assert_eq!(limiter.window(), Duration::from_secs(60));
        assert_eq!(limiter.max_requests(), 100);
    }
}
