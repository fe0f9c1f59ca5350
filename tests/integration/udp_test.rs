// tests/integration/udp_test.rs

//! The binary UDP listener alongside the TCP one.

use super::test_helpers::{TestServer, wait_until};
use pixelflood::core::grid::Pixel;
use pixelflood::core::protocol::{PxCommand, encode_frame};
use tokio::net::UdpSocket;

async fn start_with_udp(width: u16, height: u16) -> TestServer {
    let mut config = TestServer::config(width, height);
    config.udp.enabled = true;
    config.udp.port = 0;
    TestServer::with_config(config).await
}

#[tokio::test]
async fn test_udp_frames_update_the_grid() {
    let ts = start_with_udp(16, 16).await;
    let target = ts.server.udp_local_addr().expect("udp not bound");
    let grid = ts.server.grid();

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let frame = encode_frame(&PxCommand::new(2, 7, Pixel::new(9, 8, 7)));
    client.send_to(&frame, target).await.unwrap();

    wait_until(|| grid.get(2, 7) == Pixel::new(9, 8, 7)).await;
    ts.shutdown().await;
}

#[tokio::test]
async fn test_short_and_out_of_bounds_frames_leave_grid_unchanged() {
    let ts = start_with_udp(4, 4).await;
    let target = ts.server.udp_local_addr().expect("udp not bound");
    let grid = ts.server.grid();
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    client.send_to(&[0, 1, 0, 1, 255], target).await.unwrap();
    client
        .send_to(&encode_frame(&PxCommand::new(300, 1, Pixel::new(1, 1, 1))), target)
        .await
        .unwrap();
    client
        .send_to(&encode_frame(&PxCommand::new(3, 3, Pixel::new(5, 5, 5))), target)
        .await
        .unwrap();

    wait_until(|| {
        let stats = ts.server.stats();
        stats.malformed_frames == 1 && stats.out_of_bounds_writes == 1 && stats.pixels_written == 1
    })
    .await;
    assert_eq!(grid.get(1, 1), Pixel::BLACK);
    assert_eq!(grid.get(3, 3), Pixel::new(5, 5, 5));
    ts.shutdown().await;
}

#[tokio::test]
async fn test_udp_disabled_by_default() {
    let ts = TestServer::start(4, 4).await;
    assert!(ts.server.udp_local_addr().is_none());
    ts.shutdown().await;
}
