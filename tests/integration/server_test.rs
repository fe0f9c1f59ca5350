// tests/integration/server_test.rs

//! End-to-end tests over the text protocol and the server lifecycle.

use super::test_helpers::{TestServer, send, wait_until};
use pixelflood::core::grid::Pixel;
use pixelflood::server::{ListenerState, Server};
use pixelflood::{Config, PixelfloodError};
use std::time::Duration;
use tokio::io::AsyncReadExt;

#[tokio::test]
async fn test_example_scenario() {
    let ts = TestServer::start(4, 4).await;
    let grid = ts.server.grid();
    let mut client = ts.connect().await;

    send(&mut client, b"PX 1 2 ff0000\n").await;
    wait_until(|| grid.get(1, 2) == Pixel::new(255, 0, 0)).await;

    send(&mut client, b"PX 1 2 00ff00\n").await;
    wait_until(|| grid.get(1, 2) == Pixel::new(0, 255, 0)).await;

    send(&mut client, b"PX 9 9 ffffff\nPX 1 2 zz0000\nPX 0 0 0000ff\n").await;
    // The last line is a marker: once it lands, the earlier ones were processed.
    wait_until(|| grid.get(0, 0) == Pixel::new(0, 0, 255)).await;

    assert_eq!(grid.get(1, 2), Pixel::new(0, 255, 0));
    for x in 0..4 {
        for y in 0..4 {
            if (x, y) != (1, 2) && (x, y) != (0, 0) {
                assert_eq!(grid.get(x, y), Pixel::BLACK, "cell ({x},{y}) changed");
            }
        }
    }

    let stats = ts.server.stats();
    assert_eq!(stats.pixels_written, 3);
    assert_eq!(stats.out_of_bounds_writes, 1);
    assert_eq!(stats.malformed_commands, 1);
    ts.shutdown().await;
}

#[tokio::test]
async fn test_malformed_lines_do_not_close_the_connection() {
    let ts = TestServer::start(8, 8).await;
    let grid = ts.server.grid();
    let mut client = ts.connect().await;

    send(
        &mut client,
        b"\nPX 1 1\nPX 1 1 12345\nPX a 1 ffffff\nPY 1 1 ffffff\nPX 1 1 ffffff extra\n",
    )
    .await;
    let long = format!("PX {} 1 ffffff\n", "1".repeat(200));
    send(&mut client, long.as_bytes()).await;
    send(&mut client, b"PX 3 3 abcdef\r\n").await;

    wait_until(|| grid.get(3, 3) == Pixel::new(0xab, 0xcd, 0xef)).await;
    assert_eq!(grid.get(1, 1), Pixel::BLACK);
    assert_eq!(ts.server.stats().malformed_commands, 7);
    ts.shutdown().await;
}

#[tokio::test]
async fn test_stop_closes_every_client_socket() {
    let ts = TestServer::start(4, 4).await;
    let mut a = ts.connect().await;
    let mut b = ts.connect().await;
    send(&mut a, b"PX 0 0 ffffff\n").await;
    let grid = ts.server.grid();
    wait_until(|| grid.get(0, 0) == Pixel::new(255, 255, 255)).await;

    let server = ts.server.clone();
    ts.shutdown().await;
    assert_eq!(server.state(), ListenerState::Stopped);
    assert_eq!(server.group_count(), 0);

    for client in [&mut a, &mut b] {
        let mut buf = [0u8; 16];
        let read = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("socket still open after stop");
        // Either an orderly EOF or a reset is fine.
        assert!(matches!(read, Ok(0) | Err(_)));
    }

    assert!(tokio::net::TcpStream::connect(server.local_addr()).await.is_err());
}

#[tokio::test]
async fn test_stop_twice_is_harmless() {
    let ts = TestServer::start(4, 4).await;
    let server = ts.server.clone();
    tokio::join!(server.stop(), server.stop());
    assert_eq!(server.state(), ListenerState::Stopped);
    server.stop().await;
    ts.runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let first = Server::new(Config::ephemeral(4, 4)).await.unwrap();
    let mut config = Config::ephemeral(4, 4);
    config.port = first.local_addr().port();

    let err = Server::new(config).await.err().expect("second bind succeeded");
    assert!(matches!(err, PixelfloodError::Bind { .. }));
}

#[tokio::test]
async fn test_writes_from_many_connections_all_land() {
    let ts = TestServer::start(32, 32).await;
    let grid = ts.server.grid();

    let mut clients = Vec::new();
    for row in 0..8u16 {
        let mut client = ts.connect().await;
        let mut batch = String::new();
        for x in 0..32u16 {
            batch.push_str(&format!("PX {x} {row} {:02x}{:02x}00\n", x, row));
        }
        send(&mut client, batch.as_bytes()).await;
        clients.push(client);
    }

    wait_until(|| ts.server.stats().pixels_written == 8 * 32).await;
    for row in 0..8u16 {
        for x in 0..32u16 {
            assert_eq!(grid.get(x, row), Pixel::new(x as u8, row as u8, 0));
        }
    }
    ts.shutdown().await;
}
