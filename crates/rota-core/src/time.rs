//! Clock abstraction for testable timestamp generation.
//!
//! The acceptance timestamp and the time-derived entry id both come from a
//! clock reading, so tests inject a controllable clock instead of mocking
//! the storage layer.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Clock abstraction for time operations.
///
/// Production code uses [`RealClock`]; tests inject [`TestClock`] for
/// deterministic timestamps.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current system time for timestamps.
    fn now_system(&self) -> SystemTime;
}

/// Production clock backed by actual system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl RealClock {
    /// Creates a new real clock instance.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now_system(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Test clock with controllable system time.
#[derive(Debug, Clone)]
pub struct TestClock {
    /// System time as nanoseconds since `UNIX_EPOCH`.
    system_ns: Arc<AtomicU64>,
}

impl TestClock {
    /// Creates a test clock starting at the current time.
    pub fn new() -> Self {
        Self::with_start_time(SystemTime::now())
    }

    /// Creates a test clock starting at a specific time.
    pub fn with_start_time(start: SystemTime) -> Self {
        let since_epoch = start.duration_since(UNIX_EPOCH).unwrap_or_default();

        Self {
            system_ns: Arc::new(AtomicU64::new(
                u64::try_from(since_epoch.as_nanos().min(u128::from(u64::MAX))).unwrap_or(0),
            )),
        }
    }

    /// Advances the clock by the specified duration.
    pub fn advance(&self, duration: Duration) {
        let duration_ns = u64::try_from(duration.as_nanos().min(u128::from(u64::MAX))).unwrap_or(0);
        self.system_ns.fetch_add(duration_ns, Ordering::AcqRel);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now_system(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_nanos(self.system_ns.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_starts_at_given_time() {
        let start = UNIX_EPOCH + Duration::from_secs(1000);
        let clock = TestClock::with_start_time(start);

        assert_eq!(clock.now_system(), start);
    }

    #[test]
    fn test_clock_advances() {
        let start = UNIX_EPOCH + Duration::from_secs(1000);
        let clock = TestClock::with_start_time(start);

        clock.advance(Duration::from_secs(60));
        assert_eq!(clock.now_system(), start + Duration::from_secs(60));
    }
}
