// src/core/sink/proxy.rs

//! Forwards a rectangular region of the grid to another server that speaks
//! the same text protocol, by re-serializing every pixel as a `PX` command on
//! each tick.

use super::{RenderSink, interval_from_hz};
use crate::config::ProxyConfig;
use crate::core::errors::PixelfloodError;
use crate::core::grid::PixelGrid;
use crate::core::protocol::{PxCommand, PxLineCodec};
use async_trait::async_trait;
use futures::SinkExt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::FramedWrite;
use tracing::{info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A half-open rectangle `[x_begin, x_end) × [y_begin, y_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x_begin: u16,
    pub y_begin: u16,
    pub x_end: u16,
    pub y_end: u16,
}

impl Region {
    /// Clips the region to the grid so iteration never leaves it.
    fn clip(self, grid: &PixelGrid) -> Self {
        Self {
            x_begin: self.x_begin.min(grid.width()),
            y_begin: self.y_begin.min(grid.height()),
            x_end: self.x_end.min(grid.width()),
            y_end: self.y_end.min(grid.height()),
        }
    }
}

type Downstream = FramedWrite<TcpStream, PxLineCodec>;

pub struct ProxySink {
    name: String,
    address: String,
    region: Region,
    interval: Duration,
    conn: Mutex<Option<Downstream>>,
}

impl ProxySink {
    pub fn new(address: impl Into<String>, region: Region, interval: Duration) -> Self {
        let address = address.into();
        Self {
            name: format!("proxy:{address}"),
            address,
            region,
            interval,
            conn: Mutex::new(None),
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(
            config.address.clone(),
            Region {
                x_begin: config.x_begin,
                y_begin: config.y_begin,
                x_end: config.x_end,
                y_end: config.y_end,
            },
            interval_from_hz(config.refresh_hz),
        )
    }

    async fn connect(&self) -> Result<Downstream, PixelfloodError> {
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.address))
            .await
            .map_err(|_| {
                PixelfloodError::Sink(format!("connecting to {} timed out", self.address))
            })??;
        stream.set_nodelay(true)?;
        info!("Proxy connected to {}", self.address);
        Ok(FramedWrite::new(stream, PxLineCodec::default()))
    }

    async fn forward(
        downstream: &mut Downstream,
        grid: &PixelGrid,
        region: Region,
    ) -> Result<(), PixelfloodError> {
        for x in region.x_begin..region.x_end {
            for y in region.y_begin..region.y_end {
                downstream.feed(PxCommand::new(x, y, grid.get(x, y))).await?;
            }
        }
        downstream.flush().await
    }
}

#[async_trait]
impl RenderSink for ProxySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn render(&self, grid: &PixelGrid) -> Result<(), PixelfloodError> {
        let mut conn = self.conn.lock().await;
        let mut downstream = match conn.take() {
            Some(downstream) => downstream,
            None => self.connect().await?,
        };

        let region = self.region.clip(grid);
        match Self::forward(&mut downstream, grid, region).await {
            Ok(()) => {
                *conn = Some(downstream);
                Ok(())
            }
            Err(e) => {
                // Reconnect on the next tick.
                warn!("Dropping proxy connection to {}: {}", self.address, e);
                Err(e)
            }
        }
    }
}
