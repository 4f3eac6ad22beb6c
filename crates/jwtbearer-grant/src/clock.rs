//! Time source for claim validation and token expiry.
//!
//! Validation reads the current time on every call. Handlers take a
//! [`Clock`] so that tests can pin the time exactly at an expiry or
//! not-before boundary.

use std::sync::RwLock;

use time::{Duration, OffsetDateTime};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time in UTC.
    fn now(&self) -> OffsetDateTime;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

impl<F> Clock for F
where
    F: Fn() -> OffsetDateTime + Send + Sync,
{
    fn now(&self) -> OffsetDateTime {
        self()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<OffsetDateTime>,
}

impl FixedClock {
    /// Creates a clock stopped at `now`.
    #[must_use]
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Creates a clock stopped at the given Unix timestamp.
    ///
    /// Out-of-range timestamps fall back to the Unix epoch.
    #[must_use]
    pub fn at_unix(timestamp: i64) -> Self {
        Self::new(OffsetDateTime::from_unix_timestamp(timestamp).unwrap_or(OffsetDateTime::UNIX_EPOCH))
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: OffsetDateTime) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    /// Moves the clock forward (or backward, for negative spans).
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Rounds a timestamp to the nearest whole second, halves rounding up.
#[must_use]
pub fn round_to_second(at: OffsetDateTime) -> OffsetDateTime {
    let truncated = at.replace_nanosecond(0).unwrap_or(at);
    if at.nanosecond() >= 500_000_000 {
        truncated.checked_add(Duration::SECOND).unwrap_or(truncated)
    } else {
        truncated
    }
}

/// Returns `now + lifespan` rounded to the second, or `None` if the result
/// is not a representable date.
#[must_use]
pub fn expiry_after(now: OffsetDateTime, lifespan: Duration) -> Option<OffsetDateTime> {
    now.checked_add(lifespan).map(round_to_second)
}
