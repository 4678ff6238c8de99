//! Frame-indexed results table reconstruction.
//!
//! This module turns the raw per-thread event streams drained at capture end
//! into a [`ResultsTable`]: one row per frame, one column per distinct
//! `(thread, span)` pair or custom stat name.
//!
//! ## Frame assignment
//!
//! Every thread is classified against one timeline, and each of its records is
//! placed in the frame `f` such that
//!
//! ```text
//! boundary[f] <= timestamp < boundary[f + 1]
//! ```
//!
//! - Records before the first boundary land in frame 0.
//! - Records at or after the last boundary land in the final frame.
//! - A span whose begin and end fall in different frames is attributed to
//!   the frame of its **end** timestamp, on both timelines.
//!
//! Records of one thread arrive in commit order, so a per-thread cursor only
//! ever advances. A record stamped earlier than the cursor's frame (a built-in
//! stat back-dated to the frame it describes) is located by binary search
//! without moving the cursor.
//!
//! ## Span matching
//!
//! Each thread keeps a stack of open begin timestamps per span name:
//!
//! - `SpanBegin` pushes.
//! - `SpanEnd` pops. An empty stack means the begin happened before the
//!   capture started, so the end is dropped.
//! - A non-positive duration is dropped.
//! - Begins still open when the stream ends are dropped.
//!
//! ## Accumulation
//!
//! Cells are additive: repeated spans or values with the same name in one
//! frame sum. Span columns are thread-qualified (`thread/span`), value
//! columns are global. Columns appear in first-seen order.
//!
//! ## Parallelism
//!
//! Threads are independent until the final merge, so each stream is reduced
//! to a partial table on the Rayon pool. Partials are merged in stream order,
//! which keeps column order deterministic.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::engine::types::{
    EventKind,
    EventRecord,
    FrameIndex,
    NameRef,
    Timeline,
    Timestamp,
    THREAD_COLUMN_SEPARATOR,
};


/// The two frame-boundary timestamp sequences of one capture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameBoundaries {
    /// Start timestamp of every primary frame.
    pub primary: Vec<Timestamp>,

    /// Start timestamp of every secondary frame.
    pub secondary: Vec<Timestamp>,
}

impl FrameBoundaries {
    /// Creates boundaries from explicit sequences.
    pub fn new(primary: Vec<Timestamp>, secondary: Vec<Timestamp>) -> Self {
        Self { primary, secondary }
    }

    /// Boundaries of `timeline`.
    #[inline]
    pub fn for_timeline(&self, timeline: Timeline) -> &[Timestamp] {
        match timeline {
            Timeline::Primary => &self.primary,
            Timeline::Secondary => &self.secondary,
        }
    }

    /// Appends a boundary to `timeline`.
    #[inline]
    pub fn push(&mut self, timeline: Timeline, timestamp: Timestamp) {
        match timeline {
            Timeline::Primary => self.primary.push(timestamp),
            Timeline::Secondary => self.secondary.push(timestamp),
        }
    }

    /// Most recent boundary of `timeline`.
    #[inline]
    pub fn last(&self, timeline: Timeline) -> Option<Timestamp> {
        self.for_timeline(timeline).last().copied()
    }

    /// Number of frames spanned by the longer timeline.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.primary.len().max(self.secondary.len())
    }

    /// Removes every boundary from both timelines.
    pub fn clear(&mut self) {
        self.primary.clear();
        self.secondary.clear();
    }
}

/// The drained records of one thread, tagged with its timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadStream {
    /// Display name used to qualify span columns.
    pub thread_name: String,

    /// Timeline the thread's records are correlated against.
    pub timeline: Timeline,

    /// Records in commit order.
    pub records: Vec<EventRecord>,
}

impl ThreadStream {
    /// Creates a stream.
    pub fn new(thread_name: impl Into<String>, timeline: Timeline, records: Vec<EventRecord>) -> Self {
        Self { thread_name: thread_name.into(), timeline, records }
    }
}

/// One named series of accumulated values, indexed by frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: Vec<f64>,
}

impl Column {
    /// Column header.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value at `row`; unvisited cells are zero.
    #[inline]
    pub fn value(&self, row: FrameIndex) -> f64 {
        self.values.get(row).copied().unwrap_or(0.0)
    }

    fn accumulate(&mut self, row: FrameIndex, value: f64) {
        if self.values.len() <= row {
            self.values.resize(row + 1, 0.0);
        }
        self.values[row] += value;
    }
}

/// Frame-indexed table of named columns.
///
/// ## Invariants
/// * Column names are unique; `index` maps each name to its position.
/// * Every column has at most `row_count` stored values; missing cells read
///   as zero.

#[derive(Debug, Clone, Default)]
pub struct ResultsTable {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    row_count: usize,
}

impl ResultsTable {
    /// Creates an empty table with `rows` zero rows.
    pub fn with_rows(rows: usize) -> Self {
        Self { row_count: rows, ..Self::default() }
    }

    /// Number of frame rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Columns in first-seen order.
    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Looks up a column by header.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// Value at (`row`, `name`); zero if the column or cell does not exist.
    pub fn cell(&self, name: &str, row: FrameIndex) -> f64 {
        self.column(name).map_or(0.0, |column| column.value(row))
    }

    /// Column headers in order.
    pub fn header(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(Column::name)
    }

    /// Cell values of `row` in column order.
    pub fn row(&self, row: FrameIndex) -> impl Iterator<Item = f64> + '_ {
        self.columns.iter().map(move |column| column.value(row))
    }

    /// Grows the table to at least `rows` rows.
    pub fn ensure_rows(&mut self, rows: usize) {
        self.row_count = self.row_count.max(rows);
    }

    /// Adds `value` to the cell at (`row`, `name`), creating the column on
    /// first sight and growing the table as needed.
    pub fn accumulate(&mut self, name: &str, row: FrameIndex, value: f64) {
        let column = self.column_index_or_insert(name);
        self.accumulate_at(column, row, value);
    }

    /// Merges `other` into `self`, summing cells of same-named columns and
    /// appending unseen columns in `other`'s order.
    pub fn merge(&mut self, other: ResultsTable) {
        self.ensure_rows(other.row_count);
        for column in other.columns {
            let target = self.column_index_or_insert(&column.name);
            for (row, value) in column.values.into_iter().enumerate() {
                if value != 0.0 {
                    self.accumulate_at(target, row, value);
                }
            }
        }
    }

    fn column_index_or_insert(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.columns.len();
        self.columns.push(Column { name: name.to_owned(), values: Vec::new() });
        self.index.insert(name.to_owned(), i);
        i
    }

    fn accumulate_at(&mut self, column: usize, row: FrameIndex, value: f64) {
        self.columns[column].accumulate(row, value);
        self.ensure_rows(row + 1);
    }
}

/// Header of a span column for `thread`.
pub fn span_column_name(thread: &str, span: &str) -> String {
    format!("{thread}{THREAD_COLUMN_SEPARATOR}{span}")
}

/// Monotonic cursor into one timeline's boundaries.
struct FrameCursor<'a> {
    boundaries: &'a [Timestamp],
    current: FrameIndex,
}

impl<'a> FrameCursor<'a> {
    fn new(boundaries: &'a [Timestamp]) -> Self {
        Self { boundaries, current: 0 }
    }

    fn frame_of(&mut self, timestamp: Timestamp) -> FrameIndex {
        let Some(&current_start) = self.boundaries.get(self.current) else {
            return 0;
        };

        if timestamp < current_start {
            return self.boundaries
                .partition_point(|&boundary| boundary <= timestamp)
                .saturating_sub(1);
        }

        while self.boundaries.get(self.current + 1).is_some_and(|&next| next <= timestamp) {
            self.current += 1;
        }
        self.current
    }
}

/// Reconstructs a [`ResultsTable`] from drained thread streams.
///
/// ## Example
/// ```ignore
/// let boundaries = FrameBoundaries::new(vec![0, 10, 20], Vec::new());
/// let table = TableBuilder::new(&boundaries).build(&streams);
/// ```

pub struct TableBuilder<'a> {
    boundaries: &'a FrameBoundaries,
    tick_scale: f64,
}

impl<'a> TableBuilder<'a> {
    /// Creates a builder over `boundaries` with a tick scale of 1.
    pub fn new(boundaries: &'a FrameBoundaries) -> Self {
        Self { boundaries, tick_scale: 1.0 }
    }

    /// Multiplier applied to span durations (e.g. milliseconds per tick).
    pub fn tick_scale(mut self, scale: f64) -> Self {
        self.tick_scale = scale;
        self
    }

    /// Builds the table. Never fails; anomalous records are dropped.
    pub fn build(&self, streams: &[ThreadStream]) -> ResultsTable {
        let partials: Vec<ResultsTable> = streams
            .par_iter()
            .map(|stream| self.build_thread(stream))
            .collect();

        let mut table = ResultsTable::with_rows(self.boundaries.frame_count());
        for partial in partials {
            table.merge(partial);
        }
        table
    }

    fn build_thread(&self, stream: &ThreadStream) -> ResultsTable {
        let mut table = ResultsTable::default();
        let mut cursor = FrameCursor::new(self.boundaries.for_timeline(stream.timeline));
        let mut open_spans: HashMap<NameRef, Vec<Timestamp>> = HashMap::new();
        let mut span_columns: HashMap<NameRef, usize> = HashMap::new();

        for record in &stream.records {
            let frame = cursor.frame_of(record.timestamp);

            match record.kind {
                EventKind::SpanBegin => {
                    open_spans.entry(record.name).or_default().push(record.timestamp);
                }
                EventKind::SpanEnd => {
                    let Some(begin) = open_spans.get_mut(record.name).and_then(Vec::pop) else {
                        continue;
                    };
                    let Some(ticks) = record.timestamp.checked_sub(begin).filter(|&d| d > 0) else {
                        continue;
                    };

                    let column = *span_columns.entry(record.name).or_insert_with(|| {
                        table.column_index_or_insert(&span_column_name(&stream.thread_name, record.name))
                    });
                    table.accumulate_at(column, frame, ticks as f64 * self.tick_scale);
                }
                EventKind::Value => {
                    table.accumulate(record.name, frame, record.value);
                }
            }
        }

        table
    }
}

/// Builds a table with unit tick scale.
pub fn build_table(streams: &[ThreadStream], boundaries: &FrameBoundaries) -> ResultsTable {
    TableBuilder::new(boundaries).build(streams)
}
