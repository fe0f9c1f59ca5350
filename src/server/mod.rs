// src/server/mod.rs

//! The `Server`: owns the grid, the bound sockets and the connection groups,
//! and exposes the `run`/`stop` lifecycle.

use crate::config::Config;
use crate::core::errors::PixelfloodError;
use crate::core::grid::PixelGrid;
use crate::core::sink::RenderSink;
use crate::core::state::{ServerState, StatsSnapshot};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

mod connection_loop;
mod context;
mod initialization;
mod lifecycle;
mod metrics_server;
mod spawner;
mod udp;

use context::BoundSockets;
use lifecycle::{Lifecycle, RunGuard};

pub use lifecycle::ListenerState;

/// How long `run` waits for background tasks after the accept loop exits.
const BACKGROUND_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Server {
    state: Arc<ServerState>,
    /// Taken by `run`, or dropped by a `stop` that arrives before `run`.
    sockets: parking_lot::Mutex<Option<BoundSockets>>,
    lifecycle: Lifecycle,
    local_addr: SocketAddr,
    udp_local_addr: Option<SocketAddr>,
    sinks: Vec<Arc<dyn RenderSink>>,
}

impl Server {
    /// Validates `config` and binds every socket it asks for. Bind failures
    /// are returned immediately.
    pub async fn new(config: Config) -> Result<Self, PixelfloodError> {
        let sockets = initialization::setup(&config).await?;
        let local_addr = sockets.listener.local_addr()?;
        let udp_local_addr = match &sockets.udp {
            Some(socket) => Some(socket.local_addr()?),
            None => None,
        };

        Ok(Self {
            state: ServerState::new(config),
            sockets: parking_lot::Mutex::new(Some(sockets)),
            lifecycle: Lifecycle::new(),
            local_addr,
            udp_local_addr,
            sinks: Vec::new(),
        })
    }

    /// Attaches a render sink. Sinks are started by `run`.
    pub fn with_sink(mut self, sink: Arc<dyn RenderSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn udp_local_addr(&self) -> Option<SocketAddr> {
        self.udp_local_addr
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    /// A shared handle to the canvas, for render sinks and tests.
    pub fn grid(&self) -> Arc<PixelGrid> {
        self.state.grid.clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.state.stats.snapshot()
    }

    pub fn state(&self) -> ListenerState {
        self.lifecycle.get()
    }

    /// Number of source addresses with a registered group.
    pub fn group_count(&self) -> usize {
        self.state.groups.len()
    }

    /// Sockets held by the group for `ip`, or `None` if no group is registered.
    pub fn group_socket_count(&self, ip: IpAddr) -> Option<usize> {
        self.state.groups.get(&ip).map(|group| group.socket_count())
    }

    /// Serves until `stop` is called. Returns an error if the server was
    /// already run or stopped.
    pub async fn run(&self) -> Result<(), PixelfloodError> {
        let sockets = {
            let mut slot = self.sockets.lock();
            let current = self.lifecycle.get();
            if current != ListenerState::Idle {
                return Err(PixelfloodError::InvalidState(format!(
                    "cannot run a server that is {current}"
                )));
            }
            let Some(sockets) = slot.take() else {
                return Err(PixelfloodError::InvalidState(
                    "server sockets were already released".to_string(),
                ));
            };
            self.lifecycle.set(ListenerState::Listening);
            sockets
        };
        let _guard = RunGuard(&self.lifecycle);
        let BoundSockets { listener, udp } = sockets;
        let shutdown = self.state.shutdown_token();

        let mut background = JoinSet::new();
        spawner::spawn_all(&mut background, &self.state, udp, &self.sinks);

        connection_loop::run(listener, self.state.clone(), shutdown).await;

        // Sockets queued on a group after its loop exited.
        let mut swept = 0;
        for group in self.state.groups.snapshot() {
            swept += group.close_all().await;
            self.state.groups.remove(&group);
        }
        if swept > 0 {
            warn!("Closed {} sockets left behind by stopped groups.", swept);
        }

        if tokio::time::timeout(BACKGROUND_SHUTDOWN_TIMEOUT, async {
            while background.join_next().await.is_some() {}
        })
        .await
        .is_err()
        {
            warn!("Timed out waiting for background tasks to finish cleanly.");
            background.shutdown().await;
        }

        info!("Server shutdown complete.");
        Ok(())
    }

    /// Stops the server and blocks until every socket is closed. Safe to call
    /// more than once and from several tasks; later calls just wait.
    pub async fn stop(&self) {
        let previous = {
            let mut slot = self.sockets.lock();
            let current = self.lifecycle.get();
            match current {
                ListenerState::Idle => {
                    // Never ran: release the bound sockets here.
                    slot.take();
                    self.lifecycle.set(ListenerState::Stopped);
                }
                ListenerState::Listening => self.lifecycle.set(ListenerState::Stopping),
                ListenerState::Stopping | ListenerState::Stopped => {}
            }
            current
        };

        if self.state.begin_closing() {
            info!("Stopping server ({}).", previous);
        }
        if previous == ListenerState::Idle {
            return;
        }

        // Taking each group's lock in turn guarantees no read is in flight
        // once its sockets are gone.
        for group in self.state.groups.snapshot() {
            group.close_all().await;
        }

        self.lifecycle.stopped().await;
    }
}
