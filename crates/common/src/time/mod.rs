//! Wall-clock abstraction
//!
//! Token expiry is expressed in UNIX seconds, so the session manager reads
//! wall-clock time through [`Clock`] rather than `Instant`. Tests substitute
//! `testing::MockClock`.

use chrono::{DateTime, Utc};

/// Source of the current wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Seconds since the UNIX epoch
    fn unix_timestamp(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Real system clock for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
