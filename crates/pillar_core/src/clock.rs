//! Wall-clock source for tombstones and the undo window.

use chrono::{NaiveDate, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Epoch-millisecond time source.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;

    /// Calendar date in UTC for "today" defaults.
    fn today(&self) -> NaiveDate {
        chrono::DateTime::from_timestamp_millis(self.now_ms())
            .map(|moment| moment.date_naive())
            .unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// System time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock for tests and replay tooling.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now_ms.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
