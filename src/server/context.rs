// src/server/context.rs

use tokio::net::{TcpListener, UdpSocket};

/// The sockets bound by `Server::new`, held until `run` takes them.
#[derive(Debug)]
pub struct BoundSockets {
    pub listener: TcpListener,
    pub udp: Option<UdpSocket>,
}
