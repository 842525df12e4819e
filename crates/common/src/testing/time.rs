//! Controllable wall clock
//!
//! # Examples
//!
//! ```
//! use portcullis_common::testing::MockClock;
//! use portcullis_common::time::Clock;
//!
//! let clock = MockClock::at_unix(1_800_000_000);
//! clock.advance_secs(90);
//! assert_eq!(clock.unix_timestamp(), 1_800_000_090);
//! ```

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::time::Clock;

/// Mock clock for deterministic expiry tests
///
/// Time only moves when [`MockClock::advance`] or [`MockClock::set`] is
/// called.
#[derive(Debug)]
pub struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl MockClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    /// Start at `secs` since the UNIX epoch; out-of-range values start at the
    /// epoch.
    #[must_use]
    pub fn at_unix(secs: i64) -> Self {
        Self::new(DateTime::from_timestamp(secs, 0).unwrap_or_default())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_only_on_request() {
        let clock = MockClock::at_unix(1_000);
        assert_eq!(clock.unix_timestamp(), 1_000);

        clock.advance(Duration::minutes(5));
        assert_eq!(clock.unix_timestamp(), 1_300);

        clock.set(DateTime::from_timestamp(50, 0).unwrap());
        assert_eq!(clock.unix_timestamp(), 50);
    }
}
