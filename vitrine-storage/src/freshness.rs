//! Freshness metadata for cache reads.

use std::time::Duration;
use vitrine_core::Timestamp;

/// Result of a fresh cache read, carrying its age.
///
/// Callers that only want the tenant call [`CacheRead::into_value`]; the
/// orchestrator logs the age so operators can see how warm the cache ran.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    cached_at: Timestamp,
    age: Duration,
}

impl<T> CacheRead<T> {
    pub fn new(value: T, cached_at: Timestamp, age: Duration) -> Self {
        Self {
            value,
            cached_at,
            age,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// When the entry was written.
    pub fn cached_at(&self) -> Timestamp {
        self.cached_at
    }

    /// How old the entry was at read time.
    pub fn age(&self) -> Duration {
        self.age
    }
}

/// How far ahead of the reader's clock a writer's stamp may be.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);

/// Age of an entry written at `cached_at`, observed at `now`.
///
/// Stamps up to [`MAX_CLOCK_SKEW`] in the future read as age zero. Stamps
/// further ahead return `None`: such an entry would otherwise never expire.
pub(crate) fn age_between(cached_at: Timestamp, now: Timestamp) -> Option<Duration> {
    match (now - cached_at).to_std() {
        Ok(age) => Some(age),
        Err(_) => {
            let ahead = (cached_at - now).to_std().unwrap_or(Duration::MAX);
            (ahead <= MAX_CLOCK_SKEW).then_some(Duration::ZERO)
        }
    }
}
