//! # Frame Tracer
//!
//! Low-overhead, frame-oriented execution tracer for real-time applications
//! whose work is split across concurrently running threads (typically a
//! simulation thread and a submission/rendering thread).
//!
//! ## Design Goals
//! - Recording cheap enough to leave enabled in release builds
//! - Lock-free per-thread event logs (one producer, one consumer)
//! - Two independent frame timelines for cross-thread correlation
//! - A per-frame table of span durations and custom values per capture
//!
//! ## Usage
//!
//! ```no_run
//! use frame_tracer::prelude::*;
//!
//! let session = ProfilerSession::new(ProfilerConfig::default());
//! session.begin_capture(Some(3)).unwrap();
//!
//! for _ in 0..3 {
//!     {
//!         let _tick = session.scope("Tick");
//!         session.set_value("Agents", 1024.0);
//!     }
//!     session.on_frame_boundary(Timeline::Primary);
//! }
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![deny(dead_code)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::types::{
    EventKind,
    EventRecord,
    FrameIndex,
    NameRef,
    ThreadSlot,
    Timeline,
    Timestamp,
};

pub use engine::log::{
    event_log,
    event_log_with_limit,
    LogConsumer,
    LogProducer,
    Reservation,
};

pub use engine::recorder::{
    RecorderEntry,
    SessionContext,
    SpanGuard,
    ThreadRecorder,
    ThreadRegistry,
};

pub use engine::session::{
    CaptureReport,
    CaptureStart,
    CaptureState,
    ProfilerSession,
};

pub use engine::table::{
    build_table,
    Column,
    FrameBoundaries,
    ResultsTable,
    TableBuilder,
    ThreadStream,
};

pub use engine::sink::{
    CaptureInfo,
    CapturedTable,
    CsvFileSink,
    MemorySink,
    SinkReceipt,
    TableSink,
};

pub use engine::clock::{Clock, ManualClock, MonotonicClock};
pub use engine::config::ProfilerConfig;
pub use engine::command::ProfileCommand;
pub use engine::stats::MemoryProbe;

pub use engine::error::{
    CaptureError,
    CommandError,
    LogError,
    SinkError,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used tracer types.
///
/// Import with:
/// ```rust
/// use frame_tracer::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ProfilerSession,
        ProfilerConfig,
        ProfileCommand,
        CaptureState,
        CaptureStart,
        Timeline,
        ThreadRecorder,
        SpanGuard,
        MemorySink,
        CsvFileSink,
        TableSink,
    };
}
