// src/core/sink/framebuffer.rs

//! Paints the grid into an fbdev-style device file. The device is assumed to
//! have the grid's geometry with 32 bits per pixel in BGRX order.

use super::{RenderSink, interval_from_hz};
use crate::config::FramebufferConfig;
use crate::core::errors::PixelfloodError;
use crate::core::grid::PixelGrid;
use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info};

const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Default)]
struct DeviceState {
    file: Option<File>,
    frame: Vec<u8>,
}

pub struct FramebufferSink {
    name: String,
    device: PathBuf,
    interval: Duration,
    state: Mutex<DeviceState>,
}

impl FramebufferSink {
    pub fn new(device: impl Into<PathBuf>, interval: Duration) -> Self {
        let device = device.into();
        Self {
            name: format!("framebuffer:{}", device.display()),
            device,
            interval,
            state: Mutex::new(DeviceState::default()),
        }
    }

    pub fn from_config(config: &FramebufferConfig) -> Self {
        Self::new(&config.device, interval_from_hz(config.refresh_hz))
    }

    /// Opens the device and blanks it.
    async fn open(&self, frame: &mut [u8]) -> Result<File, PixelfloodError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(false)
            .open(&self.device)
            .await
            .map_err(|e| {
                PixelfloodError::Sink(format!("cannot open {}: {}", self.device.display(), e))
            })?;

        frame.fill(0);
        write_frame(&mut file, frame).await?;
        info!("Framebuffer {} opened and cleared.", self.device.display());
        Ok(file)
    }
}

async fn write_frame(file: &mut File, frame: &[u8]) -> std::io::Result<()> {
    file.seek(SeekFrom::Start(0)).await?;
    file.write_all(frame).await?;
    file.flush().await
}

/// Serializes the grid row by row as BGRX.
fn fill_frame(grid: &PixelGrid, frame: &mut [u8]) {
    let width = grid.width() as usize;
    for (i, px) in frame.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
        let x = (i % width) as u16;
        let y = (i / width) as u16;
        let pixel = grid.get(x, y);
        px.copy_from_slice(&[pixel.b, pixel.g, pixel.r, 0]);
    }
}

#[async_trait]
impl RenderSink for FramebufferSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn render(&self, grid: &PixelGrid) -> Result<(), PixelfloodError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let frame_len = grid.width() as usize * grid.height() as usize * BYTES_PER_PIXEL;
        if state.frame.len() != frame_len {
            state.frame.resize(frame_len, 0);
        }

        let mut file = match state.file.take() {
            Some(file) => file,
            None => self.open(&mut state.frame).await?,
        };

        fill_frame(grid, &mut state.frame);
        match write_frame(&mut file, &state.frame).await {
            Ok(()) => {
                state.file = Some(file);
                Ok(())
            }
            Err(e) => {
                debug!("Framebuffer write failed, reopening next tick: {}", e);
                Err(e.into())
            }
        }
    }
}
