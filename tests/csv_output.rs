// Run:
//   cargo test --test csv_output -- --nocapture

use std::fs;
use std::sync::Arc;

use chrono::{Local, TimeZone};

use frame_tracer::engine::sink::{artifact_file_name, write_csv, CaptureInfo};
use frame_tracer::{
    CsvFileSink,
    ManualClock,
    ProfilerConfig,
    ProfilerSession,
    ResultsTable,
    SinkError,
    TableSink,
    Timeline,
};

fn info() -> CaptureInfo {
    CaptureInfo {
        started_at: Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
        primary_frames: 2,
        secondary_frames: 0,
        threads: 1,
    }
}

fn sample_table() -> ResultsTable {
    let mut table = ResultsTable::with_rows(2);
    table.accumulate("Main/Physics", 0, 2.5);
    table.accumulate("FrameTime", 0, 16.66666);
    table.accumulate("FrameTime", 1, 16.6);
    table
}

fn render(table: &ResultsTable) -> String {
    let mut out = Vec::new();
    write_csv(&mut out, table).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn header_then_one_row_per_frame() {
    assert_eq!(
        render(&sample_table()),
        "Main/Physics,FrameTime\n2.5000,16.6667\n0.0000,16.6000\n",
    );
}

#[test]
fn header_cells_with_delimiters_are_quoted() {
    let mut table = ResultsTable::with_rows(1);
    table.accumulate("Load, \"Cold\"", 0, 1.0);

    assert_eq!(render(&table), "\"Load, \"\"Cold\"\"\"\n1.0000\n");
}

#[test]
fn empty_table_writes_only_a_header_line() {
    assert_eq!(render(&ResultsTable::default()), "\n");
}

#[test]
fn artifact_name_uses_capture_start_time() {
    assert_eq!(artifact_file_name(&info().started_at), "Profile(20240309_140507).csv");
}

#[test]
fn file_sink_creates_directory_and_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("Profiling").join("CSV");
    let mut sink = CsvFileSink::new(&target);

    let receipt = sink.write(&sample_table(), &info()).unwrap();

    let path = target.join("Profile(20240309_140507).csv");
    assert_eq!(receipt.location, path.display().to_string());
    assert_eq!(sink.artifact_path(&info()), path);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "Main/Physics,FrameTime\n2.5000,16.6667\n0.0000,16.6000\n",
    );
}

#[test]
fn file_sink_reports_unwritable_directory() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    fs::write(&blocker, b"occupied").unwrap();

    let mut sink = CsvFileSink::new(&blocker);
    let error = sink.write(&sample_table(), &info()).unwrap_err();

    match error {
        SinkError::Io { path, .. } => assert_eq!(path, blocker),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn capture_writes_csv_into_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = ProfilerConfig::default()
        .with_output_dir(dir.path())
        .with_builtin_stats(false);
    let clock = Arc::new(ManualClock::new(0));
    let sink = CsvFileSink::new(config.output_dir.clone());
    let session = ProfilerSession::with_parts(config, clock.clone(), Box::new(sink));

    session.register_current_thread("Game", Timeline::Primary);
    session.begin_capture(Some(2)).unwrap();
    for _ in 0..2 {
        session.begin_span("Tick");
        clock.advance(3);
        session.end_span("Tick");
        session.set_value("Agents", 12.0);
        clock.advance(7);
        session.on_frame_boundary(Timeline::Primary);
    }

    let written: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(written.len(), 1);

    let name = written[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("Profile(") && name.ends_with(").csv"), "{name}");

    let contents = fs::read_to_string(&written[0]).unwrap();
    assert_eq!(contents, "Game/Tick,Agents\n3.0000,12.0000\n3.0000,12.0000\n");
}
