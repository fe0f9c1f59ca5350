// src/core/state/stats.rs

//! Contains state definitions and logic for server statistics.
//!
//! Unlike the process-global prometheus metrics these counters belong to one
//! server instance, so callers and tests can read exact values.

use std::sync::atomic::{AtomicU64, Ordering};

/// Holds all state and logic related to per-server statistics.
#[derive(Debug, Default)]
pub struct StatsState {
    /// The total number of TCP connections accepted since startup.
    total_connections: AtomicU64,
    /// Writes that landed inside the grid.
    pixels_written: AtomicU64,
    /// Well-formed writes whose coordinates fell outside the grid.
    out_of_bounds_writes: AtomicU64,
    /// Text lines that failed to parse.
    malformed_commands: AtomicU64,
    /// UDP datagrams that failed to decode.
    malformed_frames: AtomicU64,
}

/// A point-in-time copy of `StatsState`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_connections: u64,
    pub pixels_written: u64,
    pub out_of_bounds_writes: u64,
    pub malformed_commands: u64,
    pub malformed_frames: u64,
}

impl StatsState {
    /// Creates a new `StatsState` with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_total_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_pixels_written(&self) {
        self.pixels_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_out_of_bounds(&self) {
        self.out_of_bounds_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_malformed_commands(&self) {
        self.malformed_commands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_malformed_frames(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads every counter. The values are individually exact but not
    /// captured atomically as a set.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            pixels_written: self.pixels_written.load(Ordering::Relaxed),
            out_of_bounds_writes: self.out_of_bounds_writes.load(Ordering::Relaxed),
            malformed_commands: self.malformed_commands.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
        }
    }
}
