// src/core/sink/mod.rs

//! Render sinks: agents that periodically read the whole grid and push it
//! somewhere else. They only ever call `PixelGrid::get`; there is no push
//! notification from the grid.

pub mod framebuffer;
pub mod proxy;

use crate::core::errors::PixelfloodError;
use crate::core::grid::PixelGrid;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use framebuffer::FramebufferSink;
pub use proxy::ProxySink;

#[async_trait]
pub trait RenderSink: Send + Sync {
    /// A short name used in logs.
    fn name(&self) -> &str;

    /// How often `render` is called.
    fn interval(&self) -> Duration;

    /// Reads the grid and forwards it. Errors are logged by the caller and the
    /// next tick tries again.
    async fn render(&self, grid: &PixelGrid) -> Result<(), PixelfloodError>;
}

/// Converts a refresh rate into a tick period, treating 0 as 1 Hz.
pub fn interval_from_hz(hz: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / hz.max(1) as u64)
}

/// Drives one sink until shutdown. Ticks that overrun are skipped, not queued.
pub async fn run_sink(
    sink: Arc<dyn RenderSink>,
    grid: Arc<PixelGrid>,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(sink.interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("Render sink '{}' started.", sink.name());

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    res = sink.render(&grid) => {
                        if let Err(e) = res {
                            warn!("Render sink '{}' failed: {}", sink.name(), e);
                        }
                    }
                }
            }
        }
    }
    info!("Render sink '{}' shutting down.", sink.name());
}
