//! Wall-clock-aligned monotonic time.
//!
//! Records from every worker must share one epoch so their intervals are
//! comparable, while timestamps within a worker must never go backwards.
//! A `ClockReference` captures the wall clock and a monotonic origin once,
//! at construction, and derives every later timestamp from the monotonic
//! side. Construct it once at process start and share it via `Arc`.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Shared time reference for a single run.
#[derive(Debug)]
pub struct ClockReference {
    wall_epoch: f64,
    origin: Instant,
}

impl ClockReference {
    /// Captures the current wall clock and monotonic origin.
    #[must_use]
    pub fn new() -> Self {
        let wall_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self {
            wall_epoch,
            origin: Instant::now(),
        }
    }

    /// Current time in seconds since the Unix epoch, monotonic within
    /// this reference.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.wall_epoch + self.origin.elapsed().as_secs_f64()
    }
}

impl Default for ClockReference {
    fn default() -> Self {
        Self::new()
    }
}
