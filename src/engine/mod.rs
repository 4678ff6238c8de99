//! # Engine Module
//!
//! Internal tracer implementation.
//!
//! This module contains all core building blocks, leaves first:
//! - Event records and identifiers
//! - The lock-free per-thread event log
//! - Thread recorders and their registry
//! - The capture controller (profiler session)
//! - Table reconstruction
//! - Output sinks
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod clock;
pub mod config;
pub mod stats;
pub mod log;
pub mod recorder;
pub mod table;
pub mod sink;
pub mod command;
pub mod session;
