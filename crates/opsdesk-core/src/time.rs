//! Wall-clock abstraction for testability.
//!
//! Cache entries and token records persist epoch-millisecond timestamps, so
//! the clock yields wall time rather than monotonic instants. Tests use
//! [`MockClock`] to cross TTL boundaries without sleeping.
//!
//! # Example
//!
//! ```
//! use opsdesk_core::time::{Clock, MockClock};
//! use std::time::Duration;
//!
//! let clock = MockClock::new();
//! let start = clock.now_millis();
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.now_millis() - start, 5_000);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

/// Abstraction over wall time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current time as epoch milliseconds.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Returns today's date on the local calendar.
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    /// Returns a shared system clock.
    #[must_use]
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock.
///
/// Holds epoch milliseconds in an atomic so it can be shared across tasks.
#[derive(Debug)]
pub struct MockClock {
    millis: AtomicI64,
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClock {
    /// Creates a mock clock starting at the current system time.
    #[must_use]
    pub fn new() -> Self {
        Self::at_millis(Utc::now().timestamp_millis())
    }

    /// Creates a mock clock starting at `millis` since the epoch.
    #[must_use]
    pub const fn at_millis(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Creates a mock clock starting at `time`.
    #[must_use]
    pub fn at(time: DateTime<Utc>) -> Self {
        Self::at_millis(time.timestamp_millis())
    }

    /// Creates a mock clock that can be shared across threads.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advances the clock by the given duration.
    #[allow(clippy::cast_possible_truncation)]
    pub fn advance(&self, duration: Duration) {
        self.millis
            .fetch_add(duration.as_millis() as i64, Ordering::SeqCst);
    }

    /// Advances the clock by `millis` milliseconds.
    pub fn advance_millis(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Sets the clock to `time`.
    pub fn set(&self, time: DateTime<Utc>) {
        self.millis.store(time.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::unreadable_literal,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock() {
        let before = Utc::now();
        let from_clock = SystemClock.now();
        let after = Utc::now();

        assert!(from_clock >= before);
        assert!(from_clock <= after);
    }

    #[test]
    fn test_mock_clock_advance() {
        let clock = MockClock::at_millis(1_000);
        clock.advance(Duration::from_secs(10));
        assert_eq!(clock.now_millis(), 11_000);

        clock.advance_millis(-1_000);
        assert_eq!(clock.now_millis(), 10_000);
    }

    #[test]
    fn test_mock_clock_set() {
        let clock = MockClock::new();
        let target = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();
        clock.set(target);
        assert_eq!(clock.now(), target);
        assert_eq!(clock.now_millis(), target.timestamp_millis());
    }

    #[test]
    fn test_shared_clock_is_object_safe() {
        let mock = MockClock::shared();
        let shared: SharedClock = mock.clone();
        mock.advance(Duration::from_millis(250));
        assert_eq!(shared.now_millis(), mock.now_millis());
    }
}
