#![allow(dead_code)]

use frame_tracer::{
    EventRecord,
    FrameBoundaries,
    MemorySink,
    ProfilerConfig,
    ProfilerSession,
    ThreadStream,
    Timeline,
};

pub const FRAMES: u64 = 600;
pub const FRAME_TICKS: u64 = 16_000;

pub const SPAN_NAMES: [&str; 8] = [
    "Input", "Physics", "AI", "Animation", "Audio", "Network", "Culling", "Submit",
];

pub fn make_session() -> ProfilerSession {
    ProfilerSession::with_sink(
        ProfilerConfig::default().with_builtin_stats(false),
        MemorySink::new(),
    )
}

pub fn boundaries() -> FrameBoundaries {
    let primary: Vec<u64> = (0..FRAMES).map(|f| f * FRAME_TICKS).collect();
    let secondary: Vec<u64> = (0..FRAMES).map(|f| f * FRAME_TICKS + FRAME_TICKS / 2).collect();
    FrameBoundaries::new(primary, secondary)
}

/// One stream per thread; every frame holds one span per name plus a value.
pub fn synthetic_streams(threads: usize) -> Vec<ThreadStream> {
    (0..threads)
        .map(|t| {
            let timeline = if t == 0 { Timeline::Primary } else { Timeline::Secondary };
            let mut records = Vec::with_capacity(FRAMES as usize * (SPAN_NAMES.len() * 2 + 1));
            for frame in 0..FRAMES {
                let mut ts = frame * FRAME_TICKS + 10;
                for name in SPAN_NAMES {
                    records.push(EventRecord::span_begin(name, ts));
                    ts += 500;
                    records.push(EventRecord::span_end(name, ts));
                    ts += 100;
                }
                records.push(EventRecord::value("DrawCalls", 1200.0, ts));
            }
            ThreadStream::new(format!("Thread_{t}"), timeline, records)
        })
        .collect()
}
