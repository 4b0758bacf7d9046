//! Monotonic time source for the scan loop

use std::time::{Duration, Instant};

/// Millisecond tick counter plus a blocking wait.
///
/// The protocol driver only compares timestamps; `delay_ms` is reserved
/// for keystroke pacing and the idle wait between scheduler ticks.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin, never decreasing
    fn now_ms(&self) -> u64;

    /// Wait for `ms` milliseconds
    fn delay_ms(&self, ms: u64);
}

/// Clock backed by `std::time::Instant`, usable on desktop and on ESP-IDF
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn delay_ms(&self, ms: u64) {
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms));
        }
    }
}
