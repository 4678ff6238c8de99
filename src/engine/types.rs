//! Core tracer types, identifiers and the event record layout.
//!
//! This module defines the **fundamental vocabulary** shared by every other
//! part of the tracer: the shape of one recorded observation, the time base
//! it is stamped with, and the identifiers used to address frames and
//! timelines in the reconstructed table.
//!
//! ## Event records
//!
//! An [`EventRecord`] is a small `Copy` value:
//!
//! ```text
//! | kind | name (&'static str) | value (f64) | timestamp (u64) |
//! ```
//!
//! - **kind** distinguishes span begin/end markers from custom values.
//! - **name** is a reference to string data owned by the call site for the
//!   whole process lifetime. The log never owns or copies names.
//! - **value** is only meaningful for [`EventKind::Value`].
//! - **timestamp** is a tick count from the session clock.
//!
//! Records are `Copy` and contain no heap data, so the log can store them in
//! uninitialized block memory and hand them out by bitwise copy.
//!
//! ## Timelines
//!
//! The host advances two frame sequences independently: the primary
//! (simulation) timeline and the secondary (submission/rendering) timeline.
//! Each thread is classified against exactly one of them.

use std::fmt;


/// Tick count produced by a [`Clock`](crate::engine::clock::Clock).
pub type Timestamp = u64;

/// Row index in the reconstructed table (one row per frame).
pub type FrameIndex = usize;

/// Registration index of a thread within one profiler session.
pub type ThreadSlot = usize;

/// Stable name reference for spans and custom stats.
///
/// Names are owned by the instrumented call site and must live for the whole
/// process, which is what lets the hot path avoid any allocation.
pub type NameRef = &'static str;

/// Default number of records per log block.
pub const DEFAULT_BLOCK_CAPACITY: usize = 1024;

/// Separator between thread name and span name in span column names.
pub const THREAD_COLUMN_SEPARATOR: char = '/';

/// Kind of a recorded observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Start of a named span of work.
    SpanBegin,

    /// End of a named span of work.
    SpanEnd,

    /// A single named numeric sample.
    Value,
}

/// One recorded observation.
///
/// ## Invariants
/// - `name` outlives every log and table that references it.
/// - `value` is `0.0` for span markers.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRecord {
    /// What was observed.
    pub kind: EventKind,

    /// Span or stat name.
    pub name: NameRef,

    /// Numeric payload of a [`EventKind::Value`] record.
    pub value: f64,

    /// Tick at which the observation was made.
    pub timestamp: Timestamp,
}

impl EventRecord {
    /// Creates a span-begin marker.
    #[inline]
    pub const fn span_begin(name: NameRef, timestamp: Timestamp) -> Self {
        Self { kind: EventKind::SpanBegin, name, value: 0.0, timestamp }
    }

    /// Creates a span-end marker.
    #[inline]
    pub const fn span_end(name: NameRef, timestamp: Timestamp) -> Self {
        Self { kind: EventKind::SpanEnd, name, value: 0.0, timestamp }
    }

    /// Creates a custom value sample.
    #[inline]
    pub const fn value(name: NameRef, value: f64, timestamp: Timestamp) -> Self {
        Self { kind: EventKind::Value, name, value, timestamp }
    }
}

/// One of the two independently progressing frame sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Timeline {
    /// Simulation (game) thread frames.
    #[default]
    Primary,

    /// Submission / rendering thread frames.
    Secondary,
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeline::Primary => f.write_str("primary"),
            Timeline::Secondary => f.write_str("secondary"),
        }
    }
}
