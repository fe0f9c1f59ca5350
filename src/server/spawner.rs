// src/server/spawner.rs

//! Spawns the server's long-running background tasks: the UDP loop, one
//! periodic task per render sink, and the metrics endpoint.

use super::{metrics_server, udp};
use crate::core::sink::{RenderSink, run_sink};
use crate::core::state::ServerState;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinSet;
use tracing::info;

/// Spawns all background tasks into the provided JoinSet.
pub fn spawn_all(
    tasks: &mut JoinSet<()>,
    state: &Arc<ServerState>,
    udp_socket: Option<UdpSocket>,
    sinks: &[Arc<dyn RenderSink>],
) {
    let shutdown = state.shutdown_token();

    // --- Binary UDP Listener ---
    if let Some(socket) = udp_socket {
        tasks.spawn(udp::run(socket, state.clone(), shutdown.clone()));
    }

    // --- Render Sinks ---
    for sink in sinks {
        tasks.spawn(run_sink(
            sink.clone(),
            state.grid.clone(),
            shutdown.clone(),
        ));
    }

    // --- Metrics Server ---
    if state.config.metrics.enabled {
        tasks.spawn(metrics_server::run_metrics_server(
            state.clone(),
            shutdown.clone(),
        ));
    } else {
        info!("Prometheus metrics server is disabled in the configuration.");
    }

    info!("All background tasks have been spawned ({}).", tasks.len());
}
