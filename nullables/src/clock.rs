//! Nullable clock: deterministic time for testing.

use qnode_types::{Clock, Timestamp};
use std::sync::Mutex;

/// A deterministic clock. Time only advances when you tell it to.
pub struct NullClock {
    current: Mutex<f64>,
}

impl NullClock {
    pub fn new(initial_secs: f64) -> Self {
        Self {
            current: Mutex::new(initial_secs),
        }
    }

    /// Advance time by `secs` seconds.
    pub fn advance(&self, secs: f64) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += secs;
    }

    pub fn set(&self, secs: f64) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = secs;
    }
}

impl Clock for NullClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(*self.current.lock().unwrap_or_else(|e| e.into_inner()))
    }
}
