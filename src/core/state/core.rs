// src/core/state/core.rs

//! Defines the central `ServerState` struct, holding all shared server-wide state.

use super::stats::StatsState;
use crate::config::Config;
use crate::connection::GroupRegistry;
use crate::core::grid::PixelGrid;
use crate::core::metrics;
use crate::core::protocol::{Decoded, PxCommand};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Which wire format a frame arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
}

impl Transport {
    pub fn label(self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Udp => "udp",
        }
    }
}

/// The state shared by the accept loop, every connection group, the UDP loop
/// and the render sinks. Wrapped in an `Arc` and handed to each task.
#[derive(Debug)]
pub struct ServerState {
    /// The configuration the server was started with. Immutable at runtime.
    pub config: Config,
    /// The canvas. Render sinks hold their own clone of this `Arc`.
    pub grid: Arc<PixelGrid>,
    /// Source address to connection group mapping.
    pub groups: GroupRegistry,
    pub stats: StatsState,
    /// Cancelled exactly once, when the server begins stopping.
    shutdown: CancellationToken,
}

impl ServerState {
    pub fn new(config: Config) -> Arc<Self> {
        let grid = Arc::new(PixelGrid::new(config.width, config.height));
        Arc::new(Self {
            config,
            grid,
            groups: GroupRegistry::new(),
            stats: StatsState::new(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Writes one decoded command into the grid. Out-of-range coordinates are
    /// counted and otherwise ignored.
    #[inline]
    pub fn apply(&self, cmd: PxCommand) -> bool {
        if self.grid.set(cmd.x, cmd.y, cmd.color) {
            self.stats.increment_pixels_written();
            metrics::PIXELS_WRITTEN_TOTAL.inc();
            true
        } else {
            self.stats.increment_out_of_bounds();
            metrics::OUT_OF_BOUNDS_TOTAL.inc();
            false
        }
    }

    /// Applies a parse outcome from the text codec, dropping malformed lines.
    #[inline]
    pub fn apply_decoded(&self, decoded: Decoded) {
        match decoded {
            Ok(cmd) => {
                self.apply(cmd);
            }
            Err(e) => {
                trace!("Dropping malformed command: {}", e);
                self.record_malformed(Transport::Tcp);
            }
        }
    }

    pub fn record_malformed(&self, transport: Transport) {
        match transport {
            Transport::Tcp => self.stats.increment_malformed_commands(),
            Transport::Udp => self.stats.increment_malformed_frames(),
        }
        metrics::MALFORMED_FRAMES_TOTAL
            .with_label_values(&[transport.label()])
            .inc();
    }

    /// A token every long-running task selects on to unwind.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_closing(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Signals shutdown. Returns true only for the call that flipped the flag.
    pub fn begin_closing(&self) -> bool {
        let first = !self.shutdown.is_cancelled();
        self.shutdown.cancel();
        first
    }
}
