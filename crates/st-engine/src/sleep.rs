//! High precision sleep.
//!
//! The OS sleeps for half of the remaining time while at least
//! [`SPIN_THRESHOLD_NS`] remain, then the calling thread spins. The
//! result overshoots the deadline by a few microseconds at most, at the
//! cost of one busy core for the final stretch.

use std::hint;
use std::thread;
use std::time::Duration;

use crate::clock::{Clock, MonotonicClock};

/// Below this many nanoseconds the sleep stops yielding to the OS.
pub const SPIN_THRESHOLD_NS: i64 = 200_000;

/// Sleep for `seconds`. Non-positive durations return immediately.
pub fn sleep(seconds: f64) {
    sleep_with(&MonotonicClock::new(), seconds);
}

/// Sleep for `seconds` as measured by `clock`.
///
/// The clock must advance on its own (a [`ManualClock`](crate::ManualClock)
/// that nobody advances never wakes the caller).
pub fn sleep_with(clock: &dyn Clock, seconds: f64) {
    if !(seconds > 0.0) {
        return;
    }
    let deadline = clock
        .get_time_ns()
        .saturating_add((seconds * 1e9) as i64);
    loop {
        let remaining = deadline - clock.get_time_ns();
        if remaining <= 0 {
            break;
        }
        if remaining >= SPIN_THRESHOLD_NS {
            thread::sleep(Duration::from_nanos(remaining as u64 / 2));
        } else {
            hint::spin_loop();
        }
    }
}
