//! Timestamp utilities
//!
//! Exclusion list expiry is computed in unix seconds. The [`Clock`] trait lets
//! callers substitute a controllable time source.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as unix seconds
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Source of "now" in unix seconds
pub trait Clock: Send + Sync {
    fn unix_now(&self) -> i64;
}

/// Wall clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_now(&self) -> i64 {
        unix_now()
    }
}

/// Manually driven clock, starts at a fixed instant and only moves when told
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn set(&self, unix_secs: i64) {
        self.now.store(unix_secs, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn unix_now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
