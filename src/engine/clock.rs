//! Time sources for event timestamps and frame boundaries.
//!
//! Every timestamp in a session comes from one injected [`Clock`]. Spans,
//! values and both frame-boundary sequences therefore share a single time
//! base, which is the only thing that lets events from different threads be
//! correlated against the frame timelines.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::engine::types::Timestamp;


/// A monotonic tick source.
///
/// Implementations must be cheap to call from any thread and must never go
/// backwards as observed from a single thread.
pub trait Clock: Send + Sync {
    /// Current tick count.
    fn now(&self) -> Timestamp;

    /// Milliseconds represented by one tick.
    fn ms_per_tick(&self) -> f64;
}

/// Nanosecond clock anchored at its own creation instant.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose tick zero is "now".
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Timestamp {
        // u64 nanoseconds covers ~584 years of uptime.
        self.epoch.elapsed().as_nanos() as Timestamp
    }

    #[inline]
    fn ms_per_tick(&self) -> f64 {
        1.0e-6
    }
}

/// Externally driven clock.
///
/// Useful for hosts that already own a deterministic time base and for
/// tests that need exact frame windows.
#[derive(Debug)]
pub struct ManualClock {
    ticks: AtomicU64,
    ms_per_tick: f64,
}

impl ManualClock {
    /// Creates a clock at tick `start` where one tick is one millisecond.
    pub fn new(start: Timestamp) -> Self {
        Self::with_scale(start, 1.0)
    }

    /// Creates a clock at tick `start` with a custom tick length.
    pub fn with_scale(start: Timestamp, ms_per_tick: f64) -> Self {
        Self { ticks: AtomicU64::new(start), ms_per_tick }
    }

    /// Moves the clock to `ticks`. Moving backwards is ignored.
    pub fn set(&self, ticks: Timestamp) {
        self.ticks.fetch_max(ticks, Ordering::AcqRel);
    }

    /// Advances the clock by `delta` ticks and returns the new time.
    pub fn advance(&self, delta: Timestamp) -> Timestamp {
        self.ticks.fetch_add(delta, Ordering::AcqRel) + delta
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Timestamp {
        self.ticks.load(Ordering::Acquire)
    }

    #[inline]
    fn ms_per_tick(&self) -> f64 {
        self.ms_per_tick
    }
}
