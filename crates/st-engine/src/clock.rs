//! Monotonic nanosecond clocks.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// A resettable time source measuring nanoseconds since its origin.
///
/// Implementations must be safe to read from the audio thread: no locks,
/// no allocation.
pub trait Clock: Send + Sync {
    /// Nanoseconds elapsed since construction or the last [`reset`](Clock::reset).
    fn get_time_ns(&self) -> i64;

    /// Move the origin to "now".
    fn reset(&self);

    /// The origin, in nanoseconds on the clock's own reference scale.
    fn t0_ns(&self) -> i64;

    fn get_time_us(&self) -> f64 {
        self.get_time_ns() as f64 / 1e3
    }

    fn get_time_ms(&self) -> f64 {
        self.get_time_ns() as f64 / 1e6
    }

    /// Seconds since the origin.
    fn get_time(&self) -> f64 {
        self.get_time_ns() as f64 / 1e9
    }

    /// The origin in seconds.
    fn t0(&self) -> f64 {
        self.t0_ns() as f64 / 1e9
    }
}

/// Process-wide reference point shared by every [`MonotonicClock`], so
/// their origins are comparable.
fn epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

fn since_epoch_ns() -> i64 {
    i64::try_from(epoch().elapsed().as_nanos()).unwrap_or(i64::MAX)
}

/// Clock backed by the platform's monotonic counter (`Instant`).
#[derive(Debug)]
pub struct MonotonicClock {
    origin: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: AtomicI64::new(since_epoch_ns()),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn get_time_ns(&self) -> i64 {
        since_epoch_ns() - self.origin.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.origin.store(since_epoch_ns(), Ordering::Relaxed);
    }

    fn t0_ns(&self) -> i64 {
        self.origin.load(Ordering::Relaxed)
    }
}

/// A clock that only moves when told to.
///
/// Used as an injected time authority for deterministic tests and for
/// driving an offline stream.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
    origin: AtomicI64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the absolute reading of the underlying counter.
    pub fn set_ns(&self, ns: i64) {
        self.now.store(ns, Ordering::Release);
    }

    pub fn advance_ns(&self, ns: i64) {
        self.now.fetch_add(ns, Ordering::AcqRel);
    }

    pub fn advance(&self, seconds: f64) {
        self.advance_ns((seconds * 1e9) as i64);
    }
}

impl Clock for ManualClock {
    fn get_time_ns(&self) -> i64 {
        self.now.load(Ordering::Acquire) - self.origin.load(Ordering::Acquire)
    }

    fn reset(&self) {
        self.origin
            .store(self.now.load(Ordering::Acquire), Ordering::Release);
    }

    fn t0_ns(&self) -> i64 {
        self.origin.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn monotonic_is_non_decreasing() {
        let clock = MonotonicClock::new();
        let mut last = clock.get_time_ns();
        for _ in 0..1000 {
            let now = clock.get_time_ns();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn monotonic_tracks_sleep() {
        let clock = MonotonicClock::new();
        thread::sleep(Duration::from_millis(20));
        let ms = clock.get_time_ms();
        assert!(ms >= 20.0, "{} ms", ms);
        assert!(ms < 1000.0, "{} ms", ms);
    }

    #[test]
    fn reset_rezeroes() {
        let clock = MonotonicClock::new();
        let t0 = clock.t0_ns();
        thread::sleep(Duration::from_millis(5));
        clock.reset();
        assert!(clock.t0_ns() > t0);
        assert!(clock.get_time_ns() < 5_000_000);
    }

    #[test]
    fn unit_accessors_agree() {
        let clock = ManualClock::new();
        clock.set_ns(1_500_000_000);
        assert_eq!(clock.get_time_ns(), 1_500_000_000);
        assert_eq!(clock.get_time_us(), 1_500_000.0);
        assert_eq!(clock.get_time_ms(), 1_500.0);
        assert_eq!(clock.get_time(), 1.5);
    }

    #[test]
    fn manual_clock_reset_and_advance() {
        let clock = ManualClock::new();
        clock.advance(2.0);
        clock.reset();
        assert_eq!(clock.get_time_ns(), 0);
        assert_eq!(clock.t0(), 2.0);
        clock.advance_ns(250);
        assert_eq!(clock.get_time_ns(), 250);
    }

    #[test]
    fn clocks_are_object_safe() {
        let clocks: Vec<Box<dyn Clock>> = vec![Box::new(MonotonicClock::new()), Box::new(ManualClock::new())];
        for clock in &clocks {
            assert!(clock.get_time_ns() >= 0);
        }
    }
}
