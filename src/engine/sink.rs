//! Output sinks for finished capture tables.
//!
//! A [`TableSink`] receives each finished [`ResultsTable`] exactly once, on the
//! thread that finalizes the capture. [`CsvFileSink`] writes the delimited text
//! artifact. [`MemorySink`] keeps tables in memory for embedding hosts and
//! tests.
//!
//! ## CSV format
//!
//! ```text
//! Main/Physics,Main/AI,FrameTime
//! 2.5000,0.7500,16.6667
//! 2.4000,0.0000,16.6000
//! ```
//!
//! * one header row of column names, then one row per frame;
//! * `,` delimiter, every cell with four decimals;
//! * file name `Profile(<YYYYMMDD_HHMMSS>).csv` from the capture start time.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::Mutex;

use crate::engine::error::SinkError;
use crate::engine::table::ResultsTable;


/// Cell delimiter of the CSV artifact.
pub const CSV_DELIMITER: char = ',';

/// Decimal places of every CSV cell.
pub const CSV_PRECISION: usize = 4;

/// Description of the capture a table was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureInfo {
    /// Wall-clock time the capture started.
    pub started_at: DateTime<Local>,

    /// Frames recorded on the primary timeline.
    pub primary_frames: usize,

    /// Frames recorded on the secondary timeline.
    pub secondary_frames: usize,

    /// Threads that contributed a stream.
    pub threads: usize,
}

/// Where a sink put a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReceipt {
    /// Human-readable artifact location.
    pub location: String,
}

/// Destination for finished capture tables.
pub trait TableSink: Send {
    /// Persists `table`.
    ///
    /// ## Errors
    /// Returns a [`SinkError`] if the table could not be written; the
    /// controller reports it and returns to idle.
    fn write(&mut self, table: &ResultsTable, info: &CaptureInfo) -> Result<SinkReceipt, SinkError>;
}

/// Writes one CSV file per capture into a directory.
#[derive(Debug, Clone)]
pub struct CsvFileSink {
    directory: PathBuf,
}

impl CsvFileSink {
    /// Creates a sink writing into `directory` (created on first write).
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }

    /// Output directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Full artifact path for a capture.
    pub fn artifact_path(&self, info: &CaptureInfo) -> PathBuf {
        self.directory.join(artifact_file_name(&info.started_at))
    }
}

impl TableSink for CsvFileSink {
    fn write(&mut self, table: &ResultsTable, info: &CaptureInfo) -> Result<SinkReceipt, SinkError> {
        fs::create_dir_all(&self.directory)
            .map_err(|source| SinkError::Io { path: self.directory.clone(), source })?;

        let path = self.artifact_path(info);
        let io_error = |source| SinkError::Io { path: path.clone(), source };

        let mut writer = BufWriter::new(File::create(&path).map_err(io_error)?);
        write_csv(&mut writer, table).map_err(io_error)?;
        writer.flush().map_err(io_error)?;

        Ok(SinkReceipt { location: path.display().to_string() })
    }
}

/// File name of the artifact for a capture started at `started_at`.
pub fn artifact_file_name(started_at: &DateTime<Local>) -> String {
    format!("Profile({}).csv", started_at.format("%Y%m%d_%H%M%S"))
}

/// Writes `table` as CSV: header row, then one row per frame.
pub fn write_csv<W: Write>(writer: &mut W, table: &ResultsTable) -> io::Result<()> {
    let mut first = true;
    for name in table.header() {
        if !first {
            write!(writer, "{}", CSV_DELIMITER)?;
        }
        first = false;
        write_header_cell(writer, name)?;
    }
    writeln!(writer)?;

    for row in 0..table.row_count() {
        let mut first = true;
        for value in table.row(row) {
            if !first {
                write!(writer, "{}", CSV_DELIMITER)?;
            }
            first = false;
            write!(writer, "{:.*}", CSV_PRECISION, value)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn write_header_cell<W: Write>(writer: &mut W, name: &str) -> io::Result<()> {
    if name.contains(CSV_DELIMITER) || name.contains('"') || name.contains('\n') {
        write!(writer, "\"{}\"", name.replace('"', "\"\""))
    } else {
        write!(writer, "{name}")
    }
}

/// A table delivered to a [`MemorySink`].
#[derive(Debug, Clone)]
pub struct CapturedTable {
    /// Capture description.
    pub info: CaptureInfo,

    /// Reconstructed table.
    pub table: ResultsTable,
}

/// Keeps finished tables in memory.
///
/// Clones share storage, so a host can keep one handle while the session
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    tables: Arc<Mutex<Vec<CapturedTable>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tables received.
    pub fn len(&self) -> usize {
        self.tables.lock().len()
    }

    /// Returns `true` if no table has been received.
    pub fn is_empty(&self) -> bool {
        self.tables.lock().is_empty()
    }

    /// Removes and returns every received table.
    pub fn take(&self) -> Vec<CapturedTable> {
        std::mem::take(&mut *self.tables.lock())
    }

    /// Most recently received table.
    pub fn last(&self) -> Option<CapturedTable> {
        self.tables.lock().last().cloned()
    }
}

impl TableSink for MemorySink {
    fn write(&mut self, table: &ResultsTable, info: &CaptureInfo) -> Result<SinkReceipt, SinkError> {
        let mut tables = self.tables.lock();
        tables.push(CapturedTable { info: info.clone(), table: table.clone() });
        Ok(SinkReceipt { location: format!("memory[{}]", tables.len() - 1) })
    }
}
