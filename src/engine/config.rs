//! Profiler session configuration.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::stats::MemoryProbe;
use crate::engine::types::DEFAULT_BLOCK_CAPACITY;


/// Default directory for CSV capture artifacts.
pub const DEFAULT_OUTPUT_DIR: &str = "Profiling/CSV";

/// Settings for a [`ProfilerSession`](crate::engine::session::ProfilerSession).
///
/// ## Example
/// ```ignore
/// let config = ProfilerConfig::default()
///     .with_output_dir("target/captures")
///     .with_block_capacity(4096)
///     .with_max_blocks_per_thread(256)
///     .with_builtin_stats(false);
/// ```

#[derive(Clone)]
pub struct ProfilerConfig {
    /// Directory the default CSV sink writes into.
    pub output_dir: PathBuf,

    /// Records per log block (clamped to at least one).
    pub block_capacity: usize,

    /// Live blocks a single thread's log may hold before that thread stops
    /// recording. `None` leaves the log unbounded.
    pub max_blocks_per_thread: Option<usize>,

    /// Emit `FrameTime`-style stats at every frame boundary.
    pub builtin_stats: bool,

    /// Optional free-memory source for the `MemoryFreeMB` stat.
    pub memory_probe: Option<Arc<dyn MemoryProbe>>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            block_capacity: DEFAULT_BLOCK_CAPACITY,
            max_blocks_per_thread: None,
            builtin_stats: true,
            memory_probe: None,
        }
    }
}

impl ProfilerConfig {
    /// Sets the CSV output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the number of records per log block.
    pub fn with_block_capacity(mut self, capacity: usize) -> Self {
        self.block_capacity = capacity.max(1);
        self
    }

    /// Caps the live blocks of each thread's log (clamped to at least one).
    pub fn with_max_blocks_per_thread(mut self, max_blocks: usize) -> Self {
        self.max_blocks_per_thread = Some(max_blocks.max(1));
        self
    }

    /// Enables or disables the built-in frame stats.
    pub fn with_builtin_stats(mut self, enabled: bool) -> Self {
        self.builtin_stats = enabled;
        self
    }

    /// Installs a free-memory probe.
    pub fn with_memory_probe(mut self, probe: impl MemoryProbe + 'static) -> Self {
        self.memory_probe = Some(Arc::new(probe));
        self
    }
}

impl fmt::Debug for ProfilerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfilerConfig")
            .field("output_dir", &self.output_dir)
            .field("block_capacity", &self.block_capacity)
            .field("max_blocks_per_thread", &self.max_blocks_per_thread)
            .field("builtin_stats", &self.builtin_stats)
            .field("memory_probe", &self.memory_probe.is_some())
            .finish()
    }
}
