// tests/integration/group_test.rs

//! Connection grouping by source address, observed through a live server.

use super::test_helpers::{TestServer, send, wait_until};
use pixelflood::core::grid::Pixel;
use std::net::{IpAddr, Ipv4Addr};

const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

#[tokio::test]
async fn test_sockets_from_one_address_share_a_group() {
    let ts = TestServer::start(8, 8).await;
    let _a = ts.connect().await;
    let _b = ts.connect().await;
    let _c = ts.connect().await;

    wait_until(|| ts.server.group_socket_count(LOOPBACK) == Some(3)).await;
    assert_eq!(ts.server.group_count(), 1);
    ts.shutdown().await;
}

#[tokio::test]
async fn test_closing_one_socket_leaves_the_other_working() {
    let ts = TestServer::start(8, 8).await;
    let grid = ts.server.grid();
    let mut a = ts.connect().await;
    let mut b = ts.connect().await;
    wait_until(|| ts.server.group_socket_count(LOOPBACK) == Some(2)).await;

    send(&mut a, b"PX 1 1 111111\n").await;
    wait_until(|| grid.get(1, 1) == Pixel::new(0x11, 0x11, 0x11)).await;
    drop(a);
    wait_until(|| ts.server.group_socket_count(LOOPBACK) == Some(1)).await;

    send(&mut b, b"PX 2 2 222222\n").await;
    wait_until(|| grid.get(2, 2) == Pixel::new(0x22, 0x22, 0x22)).await;
    assert_eq!(ts.server.group_count(), 1);
    ts.shutdown().await;
}

#[tokio::test]
async fn test_last_socket_closing_removes_the_group() {
    let ts = TestServer::start(8, 8).await;
    let a = ts.connect().await;
    let b = ts.connect().await;
    wait_until(|| ts.server.group_socket_count(LOOPBACK) == Some(2)).await;

    drop(a);
    drop(b);
    wait_until(|| ts.server.group_count() == 0).await;
    assert_eq!(ts.server.group_socket_count(LOOPBACK), None);

    // A later connection from the same address starts a fresh group.
    let mut c = ts.connect().await;
    send(&mut c, b"PX 0 0 abcdef\n").await;
    let grid = ts.server.grid();
    wait_until(|| grid.get(0, 0) == Pixel::new(0xab, 0xcd, 0xef)).await;
    assert_eq!(ts.server.group_count(), 1);
    ts.shutdown().await;
}

#[tokio::test]
async fn test_idle_socket_does_not_starve_its_group() {
    let ts = TestServer::start(8, 8).await;
    let grid = ts.server.grid();
    // Never writes; each pass waits on it for the read deadline.
    let _idle = ts.connect().await;
    let mut busy = ts.connect().await;
    wait_until(|| ts.server.group_socket_count(LOOPBACK) == Some(2)).await;

    for i in 0..5u8 {
        send(&mut busy, format!("PX {i} 0 0000{i:02x}\n").as_bytes()).await;
    }
    wait_until(|| grid.get(4, 0) == Pixel::new(0, 0, 4)).await;
    for i in 0..5u8 {
        assert_eq!(grid.get(i as u16, 0), Pixel::new(0, 0, i));
    }
    ts.shutdown().await;
}

#[tokio::test]
async fn test_lines_split_across_writes_are_reassembled() {
    let ts = TestServer::start(8, 8).await;
    let grid = ts.server.grid();
    let mut client = ts.connect().await;

    send(&mut client, b"PX 5 ").await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    send(&mut client, b"6 0a0b").await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    send(&mut client, b"0c\n").await;

    wait_until(|| grid.get(5, 6) == Pixel::new(0x0a, 0x0b, 0x0c)).await;
    assert_eq!(ts.server.stats().malformed_commands, 0);
    ts.shutdown().await;
}
