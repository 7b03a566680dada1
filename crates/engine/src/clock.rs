//! The monotonic logical clock hosted by [`crate::VersionDb`].
//!
//! Stands in for a global timestamp service: seeds a transaction's
//! snapshot-read timestamp at `begin()` and contributes a floor candidate to
//! the commit-time proposal during validation, without any wall-clock or
//! distributed-coordination dependency.

use std::sync::atomic::{AtomicI64, Ordering};

use mvcc_core::Timestamp;

/// A process-local, strictly-increasing counter.
#[derive(Debug, Default)]
pub struct LogicalClock {
    counter: AtomicI64,
}

impl LogicalClock {
    /// A clock seeded at `0`.
    pub fn new() -> Self {
        LogicalClock { counter: AtomicI64::new(0) }
    }

    /// The current value, without advancing it. Used to seed a new
    /// transaction's snapshot-read timestamp.
    pub fn now(&self) -> Timestamp {
        self.counter.load(Ordering::Acquire)
    }

    /// Advance the clock and return the new value. Every call returns a
    /// value strictly greater than any previously returned by `tick` or
    /// observed by `now`.
    pub fn tick(&self) -> Timestamp {
        self.counter.fetch_add(1, Ordering::AcqRel) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_does_not_advance() {
        let clock = LogicalClock::new();
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.now(), 0);
    }

    #[test]
    fn tick_is_strictly_increasing() {
        let clock = LogicalClock::new();
        let a = clock.tick();
        let b = clock.tick();
        assert!(b > a);
        assert!(clock.now() >= b);
    }
}
