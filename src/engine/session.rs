//! # Capture Controller
//!
//! [`ProfilerSession`] is the process-facing entry point of the tracer. It
//! owns everything one profiler instance needs:
//!
//! * the shared [`SessionContext`] (capture flag, clock),
//! * the [`ThreadRegistry`] of per-thread recorders,
//! * the two frame-boundary sequences and the capture lifecycle state,
//! * the [`TableSink`] that receives finished tables.
//!
//! Nothing is process-global, so independent sessions can coexist (and tests
//! can create one per case).
//!
//! ## Lifecycle
//!
//! ```text
//!            begin_capture                 end_capture / frame limit
//!   Idle ───────────────────▶ Capturing ──────────────────────────▶ StoppingRequested
//!    ▲                                                                      │
//!    └──────────── finalize (flush, build table, write sink) ◀──────────────┘
//!                  at the next primary frame boundary or finish_pending()
//! ```
//!
//! * A second `begin_capture` while capturing is a logged no-op.
//! * `begin_capture` while stopping is rejected with [`CaptureError::Busy`].
//! * Starting a capture seeds both timelines with the start timestamp, so
//!   frame 0 begins when the capture does.
//! * With a frame limit of `N`, the `N`-th primary boundary after the start
//!   closes frame `N - 1` and finalizes the capture in the same call.
//!
//! ## Capture-boundary race
//!
//! `end_capture` clears the capture flag and stamps the stop time. Records
//! committed after that stamp are discarded at flush even when the drain can
//! see them. Records stamped before it are kept if they are committed by the
//! time the drain runs.
//!
//! ## Threads
//!
//! Any thread may record, and any thread may call `end_capture`. Frame
//! boundaries and finalization are expected on the driving (primary) thread;
//! the controller state sits behind a mutex so misuse cannot corrupt it.

use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::engine::clock::{Clock, MonotonicClock};
use crate::engine::command::ProfileCommand;
use crate::engine::config::ProfilerConfig;
use crate::engine::error::{CaptureError, SinkError};
use crate::engine::recorder::{SessionContext, SpanGuard, ThreadRecorder, ThreadRegistry};
use crate::engine::sink::{CaptureInfo, CsvFileSink, SinkReceipt, TableSink};
use crate::engine::stats::{frame_time_stat, MEMORY_FREE_STAT};
use crate::engine::table::{FrameBoundaries, TableBuilder};
use crate::engine::types::{NameRef, ThreadSlot, Timeline, Timestamp};


/// Capture lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    /// No capture running.
    #[default]
    Idle,

    /// Events and frame boundaries are being recorded.
    Capturing,

    /// A stop was requested; the capture is finalized at the next safe point.
    StoppingRequested,
}

/// Outcome of an accepted [`ProfilerSession::begin_capture`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStart {
    /// A new capture started.
    Started,

    /// A capture was already running and was left untouched.
    AlreadyCapturing,
}

/// Summary of one finalized capture.
#[derive(Debug)]
pub struct CaptureReport {
    /// Primary frames captured.
    pub frames: usize,

    /// Rows in the produced table.
    pub rows: usize,

    /// Columns in the produced table.
    pub columns: usize,

    /// Threads flushed.
    pub threads: usize,

    /// Sink result.
    pub artifact: Result<SinkReceipt, SinkError>,
}

/// Mutable controller state, guarded by the session mutex.
#[derive(Debug, Default)]
struct Controller {
    state: CaptureState,
    draining: bool,
    frame_limit: Option<u32>,
    primary_frames: u32,
    boundaries: FrameBoundaries,
    stop_at: Timestamp,
    started_at: Option<DateTime<Local>>,
}

impl Controller {
    fn start(&mut self, now: Timestamp, frame_limit: Option<u32>) {
        self.state = CaptureState::Capturing;
        self.draining = false;
        self.frame_limit = frame_limit;
        self.boundaries.clear();
        self.boundaries.push(Timeline::Primary, now);
        self.boundaries.push(Timeline::Secondary, now);
        self.primary_frames = 1;
        self.stop_at = Timestamp::MAX;
        self.started_at = Some(Local::now());
    }

    fn request_stop(&mut self, now: Timestamp) {
        self.state = CaptureState::StoppingRequested;
        self.stop_at = now;
    }

    fn frame_limit_reached(&self) -> bool {
        self.frame_limit.is_some_and(|limit| self.primary_frames >= limit)
    }

    fn reset(&mut self) {
        self.state = CaptureState::Idle;
        self.draining = false;
        self.frame_limit = None;
        self.primary_frames = 0;
        self.boundaries.clear();
        self.started_at = None;
    }
}

/// One independent profiler instance.
///
/// ## Example
/// ```ignore
/// let session = ProfilerSession::new(ProfilerConfig::default());
/// session.begin_capture(Some(120))?;
///
/// loop {
///     {
///         let _tick = session.scope("Tick");
///         simulate();
///     }
///     if let Some(report) = session.on_frame_boundary(Timeline::Primary) {
///         println!("capture written: {:?}", report.artifact);
///         break;
///     }
/// }
/// ```

pub struct ProfilerSession {
    config: ProfilerConfig,
    context: Arc<SessionContext>,
    registry: ThreadRegistry,
    controller: Mutex<Controller>,
    sink: Mutex<Box<dyn TableSink>>,
}

impl ProfilerSession {
    /// Creates a session writing CSV artifacts to `config.output_dir`.
    pub fn new(config: ProfilerConfig) -> Self {
        let sink = CsvFileSink::new(config.output_dir.clone());
        Self::with_parts(config, Arc::new(MonotonicClock::new()), Box::new(sink))
    }

    /// Creates a session with a custom sink.
    pub fn with_sink(config: ProfilerConfig, sink: impl TableSink + 'static) -> Self {
        Self::with_parts(config, Arc::new(MonotonicClock::new()), Box::new(sink))
    }

    /// Creates a session from explicit parts.
    pub fn with_parts(config: ProfilerConfig, clock: Arc<dyn Clock>, sink: Box<dyn TableSink>) -> Self {
        let context = Arc::new(SessionContext::new(clock));
        let registry = ThreadRegistry::new(
            Arc::clone(&context),
            config.block_capacity,
            config.max_blocks_per_thread,
        );
        Self {
            config,
            context,
            registry,
            controller: Mutex::new(Controller::default()),
            sink: Mutex::new(sink),
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CaptureState {
        self.controller.lock().state
    }

    /// Returns `true` while events are being recorded.
    #[inline]
    pub fn is_capturing(&self) -> bool {
        self.context.is_capturing()
    }

    /// Primary frames begun in the running capture (zero when idle).
    pub fn frames_captured(&self) -> u32 {
        self.controller.lock().primary_frames
    }

    /// Thread registry of this session.
    pub fn threads(&self) -> &ThreadRegistry {
        &self.registry
    }

    // ── Capture lifecycle ─────────────────────────────────────────────────

    /// Starts a capture, optionally limited to `frame_limit` primary frames.
    ///
    /// A request while already capturing is ignored whatever its limit.
    ///
    /// ## Errors
    /// * [`CaptureError::Busy`] while a previous capture is being finalized.
    /// * [`CaptureError::InvalidFrameLimit`] for a limit of zero.

    pub fn begin_capture(&self, frame_limit: Option<u32>) -> Result<CaptureStart, CaptureError> {
        let mut controller = self.controller.lock();
        match controller.state {
            CaptureState::Capturing => {
                warn!("capture already in progress; start request ignored");
                return Ok(CaptureStart::AlreadyCapturing);
            }
            CaptureState::StoppingRequested => {
                warn!("previous capture still finalizing; start request rejected");
                return Err(CaptureError::Busy);
            }
            CaptureState::Idle => {}
        }

        if frame_limit == Some(0) {
            return Err(CaptureError::InvalidFrameLimit(0));
        }

        let now = self.context.now();
        controller.start(now, frame_limit);
        self.registry.reset_capture_start(now);
        self.context.open(now);

        info!(frame_limit = ?frame_limit, "capture started");
        Ok(CaptureStart::Started)
    }

    /// Requests the running capture to stop.
    ///
    /// Returns `false` if no capture was running. The table is produced at
    /// the next primary frame boundary or [`finish_pending`](Self::finish_pending).

    pub fn end_capture(&self) -> bool {
        let mut controller = self.controller.lock();
        if controller.state != CaptureState::Capturing {
            return false;
        }
        controller.request_stop(self.context.now());
        self.context.close();
        info!(frames = controller.primary_frames, "capture stop requested");
        true
    }

    /// Signals that a frame of `timeline` just began.
    ///
    /// Returns the report of a capture finalized by this call (frame limit
    /// reached, or a pending stop on the primary timeline).

    pub fn on_frame_boundary(&self, timeline: Timeline) -> Option<CaptureReport> {
        let now = self.context.now();
        let mut controller = self.controller.lock();

        match controller.state {
            CaptureState::Idle => None,
            CaptureState::StoppingRequested => {
                drop(controller);
                if timeline == Timeline::Primary {
                    self.finalize()
                } else {
                    None
                }
            }
            CaptureState::Capturing => {
                if self.config.builtin_stats {
                    if let Some(previous) = controller.boundaries.last(timeline) {
                        self.emit_builtin_stats(timeline, previous, now);
                    }
                }

                if timeline == Timeline::Primary && controller.frame_limit_reached() {
                    controller.request_stop(now);
                    self.context.close();
                    drop(controller);
                    return self.finalize();
                }

                controller.boundaries.push(timeline, now);
                if timeline == Timeline::Primary {
                    controller.primary_frames += 1;
                }
                None
            }
        }
    }

    /// Finalizes a capture whose stop was requested, if any.
    ///
    /// Hosts call this at shutdown so a stop requested after the last frame
    /// still produces its table.
    pub fn finish_pending(&self) -> Option<CaptureReport> {
        self.finalize()
    }

    /// Executes a parsed operator command.
    ///
    /// ## Errors
    /// Propagates [`begin_capture`](Self::begin_capture) rejections.

    pub fn execute(&self, command: ProfileCommand) -> Result<(), CaptureError> {
        match command {
            ProfileCommand::Start => self.begin_capture(None).map(|_| ()),
            ProfileCommand::Frames(frames) => self.begin_capture(Some(frames)).map(|_| ()),
            ProfileCommand::Stop => {
                if !self.end_capture() {
                    warn!("no capture in progress; stop request ignored");
                }
                Ok(())
            }
        }
    }

    // ── Recording ─────────────────────────────────────────────────────────

    /// Recorder of the calling thread (registering it on first use).
    ///
    /// Callers on hot paths can keep the returned reference to skip the
    /// thread-local lookup.
    #[inline]
    pub fn recorder(&self) -> Option<&ThreadRecorder> {
        self.registry.current()
    }

    /// Names the calling thread and classifies it against `timeline`.
    pub fn register_current_thread(&self, name: impl Into<String>, timeline: Timeline) -> Option<ThreadSlot> {
        self.registry.configure_current(name, timeline)
    }

    /// Records the start of span `name` on the calling thread.
    #[inline]
    pub fn begin_span(&self, name: NameRef) {
        if self.is_capturing() {
            if let Some(recorder) = self.recorder() {
                recorder.begin_span(name);
            }
        }
    }

    /// Records the end of span `name` on the calling thread.
    #[inline]
    pub fn end_span(&self, name: NameRef) {
        if self.is_capturing() {
            if let Some(recorder) = self.recorder() {
                recorder.end_span(name);
            }
        }
    }

    /// Records a custom value on the calling thread.
    #[inline]
    pub fn set_value(&self, name: NameRef, value: f64) {
        if self.is_capturing() {
            if let Some(recorder) = self.recorder() {
                recorder.set_value(name, value);
            }
        }
    }

    /// Records span `name` until the returned guard is dropped.
    #[inline]
    pub fn scope(&self, name: NameRef) -> Option<SpanGuard<'_>> {
        if !self.is_capturing() {
            return None;
        }
        self.recorder().map(|recorder| recorder.scope(name))
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Frame time (and memory headroom on primary) for the frame that began
    /// at `previous`, back-dated so they land in that frame.
    fn emit_builtin_stats(&self, timeline: Timeline, previous: Timestamp, now: Timestamp) {
        let Some(recorder) = self.recorder() else {
            return;
        };

        let elapsed_ms = now.saturating_sub(previous) as f64 * self.context.clock().ms_per_tick();
        recorder.set_value_at(frame_time_stat(timeline), elapsed_ms, previous);

        if timeline == Timeline::Primary {
            let free_mb = self.config.memory_probe.as_ref().and_then(|probe| probe.free_memory_mb());
            if let Some(free_mb) = free_mb {
                recorder.set_value_at(MEMORY_FREE_STAT, free_mb, previous);
            }
        }
    }

    fn finalize(&self) -> Option<CaptureReport> {
        let (boundaries, stop_at, started_at) = {
            let mut controller = self.controller.lock();
            if controller.state != CaptureState::StoppingRequested || controller.draining {
                return None;
            }
            controller.draining = true;
            (
                std::mem::take(&mut controller.boundaries),
                controller.stop_at,
                controller.started_at.unwrap_or_else(Local::now),
            )
        };

        let streams = self.registry.flush_all(stop_at);
        let table = TableBuilder::new(&boundaries)
            .tick_scale(self.context.clock().ms_per_tick())
            .build(&streams);

        let info = CaptureInfo {
            started_at,
            primary_frames: boundaries.primary.len(),
            secondary_frames: boundaries.secondary.len(),
            threads: streams.len(),
        };

        let artifact = self.sink.lock().write(&table, &info);
        match &artifact {
            Ok(receipt) => info!(
                frames = info.primary_frames,
                rows = table.row_count(),
                columns = table.column_count(),
                location = %receipt.location,
                "capture written"
            ),
            Err(error) => error!(%error, "failed to write capture table"),
        }

        self.controller.lock().reset();

        Some(CaptureReport {
            frames: info.primary_frames,
            rows: table.row_count(),
            columns: table.column_count(),
            threads: info.threads,
            artifact,
        })
    }
}
