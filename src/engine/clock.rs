//! engine::clock
//!
//! Time source for commit timestamps.

use crate::core::types::UtcTimestamp;

/// Supplies the timestamp stamped on new commits.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> UtcTimestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UtcTimestamp {
        UtcTimestamp::now()
    }
}

/// The same instant every time, for reproducible hashes.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub UtcTimestamp);

impl Clock for FixedClock {
    fn now(&self) -> UtcTimestamp {
        self.0
    }
}
