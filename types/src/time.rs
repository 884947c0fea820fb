//! Timestamp type used throughout the protocol.
//!
//! Timestamps are Unix epoch seconds (UTC). Redemption windows and
//! membership expiries are all compared at second granularity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub const fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Build a timestamp from Unix milliseconds, truncating to whole seconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis / 1000)
    }

    /// Get the current system time as a `Timestamp`.
    ///
    /// A clock set before the Unix epoch reads as [`Timestamp::EPOCH`].
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn as_millis(&self) -> u64 {
        self.0.saturating_mul(1000)
    }

    /// Seconds elapsed since this timestamp (relative to `now`).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Whether this timestamp + duration has passed relative to `now`.
    pub fn has_expired(&self, duration_secs: u64, now: Timestamp) -> bool {
        now.0 >= self.0.saturating_add(duration_secs)
    }

    pub fn plus_secs(&self, secs: u64) -> Timestamp {
        Self(self.0.saturating_add(secs))
    }

    pub fn minus_secs(&self, secs: u64) -> Timestamp {
        Self(self.0.saturating_sub(secs))
    }

    /// Time remaining until `self + duration_secs`, or zero once it has passed.
    pub fn remaining(&self, duration_secs: u64, now: Timestamp) -> Duration {
        let deadline = self.0.saturating_add(duration_secs);
        Duration::from_secs(deadline.saturating_sub(now.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Source of the current time.
///
/// Protocol components read time only through this trait so tests can
/// substitute a deterministic clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The system wall clock.
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
    fn remaining_counts_down_to_zero() {
        let used = Timestamp::new(1_000);
        assert_eq!(used.remaining(100, Timestamp::new(1_040)), Duration::from_secs(60));
        assert_eq!(used.remaining(100, Timestamp::new(1_100)), Duration::ZERO);
        assert_eq!(used.remaining(100, Timestamp::new(5_000)), Duration::ZERO);
    }

    #[test]
    fn millis_truncate_to_seconds() {
        assert_eq!(Timestamp::from_millis(1_700_000_000_999), Timestamp::new(1_700_000_000));
        assert_eq!(Timestamp::new(5).as_millis(), 5_000);
    }
}
