//! Error types for event logging, capture control, sinks and operator commands.
//!
//! Each error type models one failure domain and carries enough context to be
//! logged without reproducing the issue.
//!
//! ## What is *not* an error
//! Truncation anomalies at capture boundaries (an unmatched span end, a
//! non-positive span duration, a span still open when the capture stops) are
//! the normal outcome of starting or stopping mid-span. They are dropped by
//! the table builder and never surface here.
//!
//! ## Failure isolation
//! * [`LogError`] only ever affects the thread that owns the log.
//! * [`SinkError`] is reported, after which the controller returns to idle so
//!   another capture can be attempted.
//! * [`CaptureError`] and [`CommandError`] are returned to the operator-facing
//!   caller.
//!
//! ## Display vs. Debug
//! * `Display` is phrased for operator logs (short, lowercase).
//! * `Debug` (derived) retains full structure for diagnostics.

use std::io;
use std::path::PathBuf;

use thiserror::Error;


/// Failure of a producer-side log operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LogError {
    /// A new block could not be allocated; the log accepts no further records.
    #[error("event log exhausted (failed to allocate a block of {block_capacity} records)")]
    Exhausted {
        /// Capacity of the block that could not be allocated.
        block_capacity: usize,
    },

    /// The log reached its live-block cap; the log accepts no further records.
    #[error("event log exhausted (limit of {max_blocks} live blocks reached)")]
    BlockLimit {
        /// Configured live-block cap.
        max_blocks: usize,
    },
}

/// Rejection of a capture lifecycle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// A previous capture is still being drained.
    #[error("capture busy: previous capture is still being finalized")]
    Busy,

    /// A frame limit of zero can never be satisfied.
    #[error("invalid frame limit {0}: must be at least 1")]
    InvalidFrameLimit(u32),
}

/// Failure to persist a finished results table.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The output artifact could not be written.
    #[error("failed to write capture table to {}: {source}", path.display())]
    Io {
        /// Target artifact path.
        path: PathBuf,

        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A custom sink declined the table.
    #[error("sink rejected capture table: {0}")]
    Rejected(String),
}

/// Failure to parse an operator command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Nothing was supplied after the command keyword.
    #[error("empty profile command (expected `start`, `stop` or `frames=N`)")]
    Empty,

    /// The command keyword or verb is not recognized.
    #[error("unknown profile command `{0}`")]
    UnknownVerb(String),

    /// `frames=` was followed by something other than a positive integer.
    #[error("invalid frame count `{0}`")]
    InvalidFrameCount(String),
}
