// tests/integration/sink_test.rs

//! Render sinks attached to a running server.

use super::test_helpers::{TestServer, send, wait_until};
use async_trait::async_trait;
use pixelflood::core::errors::PixelfloodError;
use pixelflood::core::grid::{Pixel, PixelGrid};
use pixelflood::core::sink::{FramebufferSink, ProxySink, RenderSink, proxy::Region};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Records the last value it saw at (0, 0).
struct ProbeSink {
    renders: AtomicUsize,
    last: parking_lot::Mutex<Pixel>,
}

#[async_trait]
impl RenderSink for ProbeSink {
    fn name(&self) -> &str {
        "probe"
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(5)
    }

    async fn render(&self, grid: &PixelGrid) -> Result<(), PixelfloodError> {
        *self.last.lock() = grid.get(0, 0);
        self.renders.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[tokio::test]
async fn test_sink_observes_grid_and_stops_with_server() {
    let probe = Arc::new(ProbeSink {
        renders: AtomicUsize::new(0),
        last: parking_lot::Mutex::new(Pixel::BLACK),
    });
    let ts = TestServer::with_sinks(TestServer::config(4, 4), vec![probe.clone() as Arc<dyn RenderSink>]).await;

    let mut client = ts.connect().await;
    send(&mut client, b"PX 0 0 123456\n").await;
    wait_until(|| *probe.last.lock() == Pixel::new(0x12, 0x34, 0x56)).await;

    ts.shutdown().await;
    let after_stop = probe.renders.load(Ordering::Relaxed);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(probe.renders.load(Ordering::Relaxed), after_stop);
}

#[tokio::test]
async fn test_proxy_forwards_region_to_downstream_server() {
    let downstream = TestServer::start(8, 8).await;
    let proxy = Arc::new(ProxySink::new(
        downstream.addr().to_string(),
        Region {
            x_begin: 0,
            y_begin: 0,
            x_end: 2,
            y_end: 2,
        },
        Duration::from_millis(10),
    ));
    let upstream = TestServer::with_sinks(TestServer::config(8, 8), vec![proxy as Arc<dyn RenderSink>]).await;

    let mut client = upstream.connect().await;
    send(&mut client, b"PX 1 1 ff8800\nPX 5 5 ffffff\n").await;

    let mirrored = downstream.server.grid();
    wait_until(|| mirrored.get(1, 1) == Pixel::new(0xff, 0x88, 0x00)).await;
    // Outside the forwarded region.
    assert_eq!(mirrored.get(5, 5), Pixel::BLACK);

    upstream.shutdown().await;
    downstream.shutdown().await;
}

#[tokio::test]
async fn test_framebuffer_sink_paints_device_file() {
    let device = tempfile::NamedTempFile::new().unwrap();
    let sink = Arc::new(FramebufferSink::new(device.path(), Duration::from_millis(5)));
    let ts = TestServer::with_sinks(TestServer::config(2, 2), vec![sink as Arc<dyn RenderSink>]).await;

    let mut client = ts.connect().await;
    send(&mut client, b"PX 1 1 010203\n").await;

    let path = device.path().to_path_buf();
    wait_until(|| {
        std::fs::read(&path)
            .map(|bytes| bytes.len() == 16 && bytes[12..16] == [3, 2, 1, 0])
            .unwrap_or(false)
    })
    .await;
    ts.shutdown().await;
}
