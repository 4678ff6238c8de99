#![allow(dead_code)]

use std::sync::Arc;

use frame_tracer::engine::sink::CaptureInfo;
use frame_tracer::{
    ManualClock,
    MemorySink,
    ProfilerConfig,
    ProfilerSession,
    ResultsTable,
    SinkError,
    SinkReceipt,
    TableSink,
};

/// Session driven by a manual clock at tick zero, collecting into a memory sink.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub sink: MemorySink,
    pub session: ProfilerSession,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ProfilerConfig::default().with_builtin_stats(false))
    }

    pub fn with_config(config: ProfilerConfig) -> Self {
        let clock = Arc::new(ManualClock::new(0));
        let sink = MemorySink::new();
        let session = ProfilerSession::with_parts(config, clock.clone(), Box::new(sink.clone()));
        Self { clock, sink, session }
    }

    /// Takes the single table delivered since the last call.
    pub fn single_table(&self) -> ResultsTable {
        let mut tables = self.sink.take();
        assert_eq!(tables.len(), 1, "expected exactly one captured table");
        tables.remove(0).table
    }
}

/// Sink that refuses every table.
pub struct FailingSink;

impl TableSink for FailingSink {
    fn write(&mut self, _table: &ResultsTable, _info: &CaptureInfo) -> Result<SinkReceipt, SinkError> {
        Err(SinkError::Rejected("disk full".to_owned()))
    }
}

pub fn assert_close(got: f64, expected: f64) {
    assert!((got - expected).abs() < 1e-9, "got {got}, expected {expected}");
}
