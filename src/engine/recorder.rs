//! # Thread Recorders
//!
//! One [`ThreadRecorder`] per participating thread, created lazily on first
//! use and kept for the lifetime of its session. A recorder owns the
//! producer half of its thread's event log and is the only thing that ever
//! appends to it.
//!
//! ## Split ownership
//!
//! Each registered thread is represented twice:
//!
//! | Side | Type | Lives in | Used by |
//! |------|------|----------|---------|
//! | producer | [`ThreadRecorder`] | per-session thread-local slot | the recording thread |
//! | consumer | [`RecorderEntry`] | the registry list | the draining thread |
//!
//! The thread-local slot is keyed by OS thread identity. After the first
//! lookup the hot path reads it without locking; the registry mutex is taken
//! only when a thread registers, is renamed, or when a capture starts or is
//! drained.
//!
//! ## Recycled slots
//!
//! `ThreadLocal` hands the slot of an exited thread to the next new thread.
//! Each recorder remembers the [`ThreadId`] it was bound to; when a different
//! thread picks it up, the registry appends a fresh entry with a fresh log and
//! rebinds the recorder to it. The exited thread's entry keeps its consumer,
//! so whatever it recorded is still flushed under its own name.
//!
//! ## Thread names
//!
//! Entry names are unique within a registry. A name already held by another
//! entry (two pool workers sharing an OS name, or a new thread reusing the
//! name of an exited one) gets a `#<slot>` suffix, so every thread keeps its
//! own span columns.
//!
//! ## Hot path
//!
//! `begin_span`, `end_span` and `set_value` first do one relaxed load of the
//! session's capture flag. When no capture is active they return right away.

use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use thread_local::ThreadLocal;
use tracing::{debug, warn};

use crate::engine::clock::Clock;
use crate::engine::log::{event_log_with_limit, LogConsumer, LogProducer};
use crate::engine::table::ThreadStream;
use crate::engine::types::{EventRecord, NameRef, ThreadSlot, Timeline, Timestamp};


/// State shared between a session and every recorder it creates.
///
/// This is the explicit replacement for process-wide "capture active"
/// statics: each session owns one, so independent sessions never interfere.

pub struct SessionContext {
    capturing: AtomicBool,
    capture_start: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl SessionContext {
    /// Creates an idle context stamped by `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            capturing: AtomicBool::new(false),
            capture_start: AtomicU64::new(0),
            clock,
        }
    }

    /// Returns `true` while events are being recorded.
    #[inline]
    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Relaxed)
    }

    /// Current tick of the session clock.
    #[inline]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// The session clock.
    #[inline]
    pub fn clock(&self) -> &dyn Clock {
        &*self.clock
    }

    /// Timestamp at which the current (or last) capture started.
    #[inline]
    pub fn capture_start(&self) -> Timestamp {
        self.capture_start.load(Ordering::Acquire)
    }

    pub(crate) fn open(&self, start: Timestamp) {
        self.capture_start.store(start, Ordering::Release);
        self.capturing.store(true, Ordering::Release);
    }

    pub(crate) fn close(&self) {
        self.capturing.store(false, Ordering::Release);
    }
}

/// Producer side of one thread's log.
///
/// Obtained through [`ProfilerSession::recorder`](crate::engine::session::ProfilerSession::recorder)
/// and bound to the calling thread: it is neither `Sync` nor reachable from
/// other threads, so the log always has exactly one producer.

pub struct ThreadRecorder {
    producer: RefCell<LogProducer>,
    context: Arc<SessionContext>,
    slot: Cell<ThreadSlot>,
    owner: Cell<ThreadId>,
}

impl ThreadRecorder {
    /// Registration index of the owning thread.
    #[inline]
    pub fn slot(&self) -> ThreadSlot {
        self.slot.get()
    }

    /// Returns `true` while the session is capturing.
    #[inline]
    pub fn is_capturing(&self) -> bool {
        self.context.is_capturing()
    }

    /// Records the start of span `name`.
    #[inline]
    pub fn begin_span(&self, name: NameRef) {
        if self.is_capturing() {
            self.record(EventRecord::span_begin(name, self.context.now()));
        }
    }

    /// Records the end of span `name`.
    #[inline]
    pub fn end_span(&self, name: NameRef) {
        if self.is_capturing() {
            self.record(EventRecord::span_end(name, self.context.now()));
        }
    }

    /// Records a custom value sample.
    #[inline]
    pub fn set_value(&self, name: NameRef, value: f64) {
        if self.is_capturing() {
            self.record(EventRecord::value(name, value, self.context.now()));
        }
    }

    /// Records a value with an explicit timestamp.
    pub(crate) fn set_value_at(&self, name: NameRef, value: f64, timestamp: Timestamp) {
        if self.is_capturing() {
            self.record(EventRecord::value(name, value, timestamp));
        }
    }

    /// Records a span that ends when the returned guard is dropped.
    #[inline]
    pub fn scope(&self, name: NameRef) -> SpanGuard<'_> {
        if !self.is_capturing() {
            return SpanGuard { recorder: None, name };
        }
        self.begin_span(name);
        SpanGuard { recorder: Some(self), name }
    }

    fn record(&self, record: EventRecord) {
        // Only fails on re-entrant recording from the same thread.
        let Ok(mut producer) = self.producer.try_borrow_mut() else {
            return;
        };
        if producer.is_exhausted() {
            return;
        }
        if let Err(error) = producer.push(record) {
            warn!(thread = self.slot.get(), %error, "thread recorder stopped recording");
        }
    }
}

/// RAII span: records `SpanEnd` for its name when dropped.
///
/// Created inactive when no capture is running, in which case neither marker
/// is recorded.

#[must_use = "the span ends as soon as the guard is dropped"]
pub struct SpanGuard<'a> {
    recorder: Option<&'a ThreadRecorder>,
    name: NameRef,
}

impl Drop for SpanGuard<'_> {
    fn drop(&mut self) {
        if let Some(recorder) = self.recorder {
            recorder.end_span(self.name);
        }
    }
}

/// Consumer side of one registered thread.
///
/// ## Fields
/// * `name` qualifies the thread's span columns.
/// * `timeline` selects the frame sequence its records are matched against.
/// * `capture_start` is the capture-local start marker; older records are
///   leftovers from before the capture and are discarded on flush.

pub struct RecorderEntry {
    slot: ThreadSlot,
    name: String,
    timeline: Timeline,
    consumer: LogConsumer,
    capture_start: Timestamp,
}

impl RecorderEntry {
    /// Registration index.
    #[inline]
    pub fn slot(&self) -> ThreadSlot {
        self.slot
    }

    /// Thread display name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Timeline classification.
    #[inline]
    pub fn timeline(&self) -> Timeline {
        self.timeline
    }

    /// Resets the capture-local start marker.
    pub fn reset_capture_start(&mut self, start: Timestamp) {
        self.capture_start = start;
    }

    /// Drains this thread's log and keeps the records stamped inside
    /// `[capture_start, stop]`.
    pub fn flush(&mut self, stop: Timestamp) -> ThreadStream {
        let start = self.capture_start;
        let mut records = self.consumer.drain_all();
        records.retain(|record| (start..=stop).contains(&record.timestamp));
        ThreadStream::new(self.name.clone(), self.timeline, records)
    }
}

/// Registry of every thread that has recorded into one session.
pub struct ThreadRegistry {
    context: Arc<SessionContext>,
    block_capacity: usize,
    max_blocks: Option<usize>,
    locals: ThreadLocal<Option<ThreadRecorder>>,
    entries: Mutex<Vec<RecorderEntry>>,
}

impl ThreadRegistry {
    /// Creates an empty registry whose logs use `block_capacity` records per
    /// block and hold at most `max_blocks` live blocks.
    pub fn new(context: Arc<SessionContext>, block_capacity: usize, max_blocks: Option<usize>) -> Self {
        Self {
            context,
            block_capacity,
            max_blocks,
            locals: ThreadLocal::new(),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Recorder of the calling thread, registering it on first use.
    ///
    /// Returns `None` if the thread's log could not be allocated; such a
    /// thread simply records nothing.
    #[inline]
    pub fn current(&self) -> Option<&ThreadRecorder> {
        let recorder = self.locals.get_or(|| self.register_current()).as_ref()?;
        if recorder.owner.get() != thread::current().id() && !self.rebind(recorder) {
            return None;
        }
        Some(recorder)
    }

    /// Renames and reclassifies the calling thread, registering it if needed.
    ///
    /// `name` gets a `#<slot>` suffix if another entry already holds it.
    pub fn configure_current(&self, name: impl Into<String>, timeline: Timeline) -> Option<ThreadSlot> {
        let slot = self.current()?.slot();
        let mut entries = self.entries.lock();
        let name = unique_name(&entries, slot, name.into());
        if let Some(entry) = entries.get_mut(slot) {
            entry.name = name;
            entry.timeline = timeline;
            debug!(slot, thread = %entry.name, %timeline, "configured thread recorder");
        }
        Some(slot)
    }

    /// Number of registered threads.
    pub fn thread_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// `(slot, name, timeline)` of every registered thread.
    pub fn threads(&self) -> Vec<(ThreadSlot, String, Timeline)> {
        self.entries
            .lock()
            .iter()
            .map(|entry| (entry.slot(), entry.name().to_owned(), entry.timeline()))
            .collect()
    }

    /// Resets every entry's capture-local start marker.
    pub fn reset_capture_start(&self, start: Timestamp) {
        for entry in self.entries.lock().iter_mut() {
            entry.reset_capture_start(start);
        }
    }

    /// Flushes every registered thread, in registration order.
    pub fn flush_all(&self, stop: Timestamp) -> Vec<ThreadStream> {
        self.entries.lock().iter_mut().map(|entry| entry.flush(stop)).collect()
    }

    fn register_current(&self) -> Option<ThreadRecorder> {
        let (slot, producer) = self.register_entry()?;
        Some(ThreadRecorder {
            producer: RefCell::new(producer),
            context: Arc::clone(&self.context),
            slot: Cell::new(slot),
            owner: Cell::new(thread::current().id()),
        })
    }

    /// Points a recorder inherited from an exited thread at a fresh entry.
    fn rebind(&self, recorder: &ThreadRecorder) -> bool {
        // The exited owner cannot still hold the borrow.
        let Ok(mut producer) = recorder.producer.try_borrow_mut() else {
            return false;
        };
        let Some((slot, fresh)) = self.register_entry() else {
            return false;
        };

        debug!(previous = recorder.slot.get(), slot, "rebound recycled thread recorder");
        *producer = fresh;
        recorder.slot.set(slot);
        recorder.owner.set(thread::current().id());
        true
    }

    /// Appends an entry for the calling thread and returns its slot and the
    /// producer half of its new log.
    fn register_entry(&self) -> Option<(ThreadSlot, LogProducer)> {
        let (producer, consumer) = match event_log_with_limit(self.block_capacity, self.max_blocks) {
            Ok(handles) => handles,
            Err(error) => {
                warn!(%error, "failed to register thread recorder");
                return None;
            }
        };

        let mut entries = self.entries.lock();
        let slot = entries.len();
        let name = thread::current()
            .name()
            .map_or_else(|| format!("Thread_{slot}"), str::to_owned);
        let name = unique_name(&entries, slot, name);

        debug!(slot, thread = %name, "registered thread recorder");

        entries.push(RecorderEntry {
            slot,
            name,
            timeline: Timeline::Primary,
            consumer,
            capture_start: self.context.capture_start(),
        });

        Some((slot, producer))
    }
}

/// `name`, suffixed with `#<slot>` if an entry other than `slot` holds it.
fn unique_name(entries: &[RecorderEntry], slot: ThreadSlot, name: String) -> String {
    let taken = |candidate: &str| entries.iter().any(|entry| entry.slot != slot && entry.name == candidate);
    if !taken(&name) {
        return name;
    }
    let suffixed = format!("{name}#{slot}");
    if !taken(&suffixed) {
        return suffixed;
    }
    (1..)
        .map(|n| format!("{name}#{slot}.{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or(suffixed)
}
