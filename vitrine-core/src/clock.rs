//! Wall-clock seam used for cache timestamps.

use crate::Timestamp;
use chrono::Utc;
use std::fmt;

/// Source of the current time.
///
/// Cache freshness is computed against this clock so TTL boundaries can be
/// exercised without sleeping.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current wall-clock time.
    fn now(&self) -> Timestamp;

    /// Returns the current time in milliseconds since the UNIX epoch.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}
