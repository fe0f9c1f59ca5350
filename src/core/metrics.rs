// src/core/metrics.rs

//! Defines and registers Prometheus metrics for server monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, TextEncoder, register_counter, register_counter_vec,
    register_gauge,
};

lazy_static! {
    // --- Gauges ---
    /// The number of TCP sockets currently held by connection groups.
    pub static ref CONNECTED_CLIENTS: Gauge =
        register_gauge!("pixelflood_connected_clients", "Number of currently open client sockets.").unwrap();
    /// The number of distinct source addresses with a live connection group.
    pub static ref CONNECTION_GROUPS: Gauge =
        register_gauge!("pixelflood_connection_groups", "Number of active per-address connection groups.").unwrap();

    // --- Counters ---
    /// The total number of TCP connections accepted since startup.
    pub static ref CONNECTIONS_RECEIVED_TOTAL: Counter =
        register_counter!("pixelflood_connections_received_total", "Total number of connections received.").unwrap();
    /// Pixel writes that landed inside the grid.
    pub static ref PIXELS_WRITTEN_TOTAL: Counter =
        register_counter!("pixelflood_pixels_written_total", "Total number of pixels written to the grid.").unwrap();
    /// Well-formed writes whose coordinates fell outside the grid.
    pub static ref OUT_OF_BOUNDS_TOTAL: Counter =
        register_counter!("pixelflood_out_of_bounds_writes_total", "Total number of writes outside the grid.").unwrap();
    /// Frames that failed to decode, labeled by transport (`tcp` or `udp`).
    pub static ref MALFORMED_FRAMES_TOTAL: CounterVec =
        register_counter_vec!("pixelflood_malformed_frames_total", "Total number of malformed frames, labeled by transport.", &["transport"]).unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
