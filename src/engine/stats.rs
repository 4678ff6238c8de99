//! Built-in custom stats emitted at frame boundaries.
//!
//! While a capture is running, the controller can add a few ordinary
//! [`Value`](crate::engine::types::EventKind::Value) records at every frame
//! boundary: the wall time of the frame that just ended on that timeline and,
//! on the primary timeline, the free memory reported by an optional
//! [`MemoryProbe`]. They flow through the signalling thread's log like any
//! other value and are not special-cased by the table builder.

use crate::engine::types::{NameRef, Timeline};


/// Column name of the primary frame duration in milliseconds.
pub const FRAME_TIME_STAT: NameRef = "FrameTime";

/// Column name of the secondary frame duration in milliseconds.
pub const SECONDARY_FRAME_TIME_STAT: NameRef = "SecondaryFrameTime";

/// Column name of the free memory figure in megabytes.
pub const MEMORY_FREE_STAT: NameRef = "MemoryFreeMB";

/// Source of the memory headroom figure.
///
/// Concrete platform telemetry lives outside this crate. Any
/// `Fn() -> Option<f64>` closure is a probe.
pub trait MemoryProbe: Send + Sync {
    /// Free memory in megabytes, or `None` if it cannot be determined now.
    fn free_memory_mb(&self) -> Option<f64>;
}

impl<F> MemoryProbe for F
where
    F: Fn() -> Option<f64> + Send + Sync,
{
    fn free_memory_mb(&self) -> Option<f64> {
        self()
    }
}

/// Frame-time column name for `timeline`.
#[inline]
pub fn frame_time_stat(timeline: Timeline) -> NameRef {
    match timeline {
        Timeline::Primary => FRAME_TIME_STAT,
        Timeline::Secondary => SECONDARY_FRAME_TIME_STAT,
    }
}
