//! Time sources for the rate limiter.
//!
//! Production code uses [`SystemClock`]. Tests drive time by hand with
//! `MockClock` (unit tests, or the `test-helpers` feature) so refill and
//! idle-eviction behaviour is deterministic.

use std::fmt::Debug;
use std::time::Instant;
#[cfg(any(test, feature = "test-helpers"))]
use {
    parking_lot::Mutex,
    std::sync::Arc,
    std::time::Duration,
};

/// A source of monotonic time.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> Instant;
}

/// System clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests.
///
/// Clones share the same underlying instant, so advancing one clone is
/// visible through every other clone (and through any limiter holding it).
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<Instant>>,
}

#[cfg(any(test, feature = "test-helpers"))]
impl MockClock {
    pub fn new(start: Instant) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.current.lock() += by;
    }

    pub fn set(&self, instant: Instant) {
        *self.current.lock() = instant;
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Default for MockClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }
}
