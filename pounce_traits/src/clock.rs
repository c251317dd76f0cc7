use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock abstraction so the control loop can be driven by fake
/// time in tests.
///
/// - now(): returns a monotonic Instant
/// - sleep(): sleeps for the provided duration (implementations may simulate)
/// - secs_since(): elapsed seconds since an epoch Instant, as f64
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Seconds elapsed since `epoch`, saturating at 0.0 on underflow.
    fn secs_since(&self, epoch: Instant) -> f64 {
        self.now().saturating_duration_since(epoch).as_secs_f64()
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Deterministic clocks for tests. Exported unconditionally so downstream
/// crates can drive loop time from their own test suites.
pub mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Manually-advanced clock: now() = origin + offset, sleep(d) advances
    /// the offset by d without blocking. Clones share the same offset.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Current offset relative to origin.
        pub fn offset(&self) -> Duration {
            self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.offset()
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::TestClock;
    use super::*;

    #[test]
    fn test_clock_advances_without_blocking() {
        let clock = TestClock::new();
        let epoch = clock.now();
        clock.advance(Duration::from_millis(250));
        assert!((clock.secs_since(epoch) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_clock_clones_share_time() {
        let a = TestClock::new();
        let b = a.clone();
        b.sleep(Duration::from_secs(1));
        assert_eq!(a.offset(), Duration::from_secs(1));
    }

    #[test]
    fn secs_since_saturates_for_future_epochs() {
        let clock = MonotonicClock::new();
        let future = clock.now() + Duration::from_secs(60);
        assert_eq!(clock.secs_since(future), 0.0);
    }
}
