// src/server/connection_loop.rs

//! Contains the accept loop that routes new connections into groups.

use crate::connection::Joined;
use crate::core::metrics;
use crate::core::state::ServerState;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Pause after a failed accept so a persistent error (e.g. fd exhaustion)
/// does not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Accepts connections until `shutdown` is cancelled, then waits for every
/// group read loop it spawned to finish. The listener is closed on return.
pub async fn run(listener: TcpListener, state: Arc<ServerState>, shutdown: CancellationToken) {
    let mut group_tasks = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("Shutdown signalled, accept loop exiting.");
                break;
            }

            res = listener.accept() => {
                match res {
                    Ok((socket, addr)) => {
                        debug!("Accepted new connection from: {}", addr);
                        state.stats.increment_total_connections();
                        metrics::CONNECTIONS_RECEIVED_TOTAL.inc();

                        match state.groups.join(socket, addr, state.config.max_line_length) {
                            Joined::New(group) => {
                                info!("New connection group for {}", addr.ip());
                                group_tasks.spawn(group.run(state.clone(), shutdown.clone()));
                            }
                            Joined::Existing(group) => {
                                debug!(
                                    "Connection {} joined existing group ({} sockets)",
                                    addr,
                                    group.socket_count()
                                );
                            }
                        }
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                }
            },

            Some(res) = group_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("A connection group panicked: {e:?}");
                }
            },
        }
    }

    drop(listener);
    debug!("TCP listener closed.");

    while let Some(res) = group_tasks.join_next().await {
        if let Err(e) = res
            && e.is_panic()
        {
            error!("A connection group panicked during shutdown: {e:?}");
        }
    }
    info!("All connection groups stopped.");
}
