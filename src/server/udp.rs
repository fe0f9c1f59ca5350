// src/server/udp.rs

//! The binary UDP receive loop. Every datagram is one frame; there is no
//! grouping because UDP has no connections.

use crate::core::protocol::{FRAME_LEN, decode_frame};
use crate::core::state::{ServerState, Transport};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

/// One byte larger than a frame, so oversized datagrams are detectable.
const RECV_BUFFER_LEN: usize = FRAME_LEN + 1;

pub async fn run(socket: UdpSocket, state: Arc<ServerState>, shutdown: CancellationToken) {
    let mut buf = [0u8; RECV_BUFFER_LEN];
    info!("UDP receive loop started.");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            res = socket.recv_from(&mut buf) => match res {
                Ok((n, peer)) => match decode_frame(&buf[..n]) {
                    Ok(cmd) => {
                        state.apply(cmd);
                    }
                    Err(e) => {
                        trace!("Dropping datagram from {}: {}", peer, e);
                        state.record_malformed(Transport::Udp);
                    }
                },
                // Errors such as ICMP-induced resets are per-datagram.
                Err(e) => warn!("UDP receive error: {}", e),
            },
        }
    }

    info!("UDP receive loop shutting down.");
}
