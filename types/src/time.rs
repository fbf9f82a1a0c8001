//! Wall-clock timestamps and the clock abstraction.
//!
//! Timestamps are fractional Unix epoch seconds (UTC). Expiry and inactivity
//! are judged against a [`Clock`], so tests can drive time explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::amount::canonical_float;

/// A Unix timestamp in (fractional) seconds since epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(f64);

impl Timestamp {
    pub const EPOCH: Self = Self(0.0);

    pub fn new(secs: f64) -> Self {
        Self(secs)
    }

    /// Current system time. A clock set before the epoch reads as the epoch.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self(secs)
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0
    }

    /// Seconds from this timestamp to `now`. Negative if this is in the future.
    pub fn elapsed_since(&self, now: Timestamp) -> f64 {
        now.0 - self.0
    }

    /// Whether more than `max_age_secs` have passed between this timestamp and `now`.
    pub fn is_older_than(&self, max_age_secs: u64, now: Timestamp) -> bool {
        self.elapsed_since(now) > max_age_secs as f64
    }

    pub fn plus_secs(&self, secs: f64) -> Self {
        Self(self.0 + secs)
    }

    /// Canonical textual form used in hash preimages.
    pub fn canonical(&self) -> String {
        canonical_float(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// [`Clock`] backed by the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_comparison_is_strict() {
        let t = Timestamp::new(1_000.0);
        assert!(!t.is_older_than(3600, Timestamp::new(4_600.0)));
        assert!(t.is_older_than(3600, Timestamp::new(4_600.5)));
    }

    #[test]
    fn future_timestamps_are_not_old() {
        let t = Timestamp::new(10_000.0);
        assert!(t.elapsed_since(Timestamp::new(5_000.0)) < 0.0);
        assert!(!t.is_older_than(0, Timestamp::new(5_000.0)));
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now().as_secs_f64() > 1_577_836_800.0);
    }
}
