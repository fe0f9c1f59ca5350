// src/server/initialization.rs

//! Binds the server's sockets. Bind failures are returned to the caller and
//! never retried.

use super::context::BoundSockets;
use crate::config::Config;
use crate::core::errors::PixelfloodError;
use std::net::SocketAddr;
use tokio::net::{TcpListener, UdpSocket};
use tracing::info;

/// Validates `config` and binds the TCP listener and, if enabled, the UDP socket.
pub async fn setup(config: &Config) -> Result<BoundSockets, PixelfloodError> {
    config
        .validate()
        .map_err(|e| PixelfloodError::Config(format!("{e:#}")))?;
    log_startup_info(config);

    let tcp_addr = resolve(config, config.tcp_addr())?;
    let listener = TcpListener::bind(tcp_addr)
        .await
        .map_err(|e| PixelfloodError::bind(tcp_addr, e))?;
    info!(
        "pixelflood listening on {} (tcp)",
        listener.local_addr().unwrap_or(tcp_addr)
    );

    let udp = if config.udp.enabled {
        let udp_addr = resolve(config, config.udp_addr())?;
        let socket = UdpSocket::bind(udp_addr)
            .await
            .map_err(|e| PixelfloodError::bind(udp_addr, e))?;
        info!(
            "pixelflood listening on {} (udp)",
            socket.local_addr().unwrap_or(udp_addr)
        );
        Some(socket)
    } else {
        None
    };

    Ok(BoundSockets { listener, udp })
}

fn resolve(
    config: &Config,
    addr: anyhow::Result<SocketAddr>,
) -> Result<SocketAddr, PixelfloodError> {
    addr.map_err(|e| PixelfloodError::InvalidAddress(format!("{}: {e:#}", config.host)))
}

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &Config) {
    info!("Grid size is {}x{}.", config.width, config.height);
    info!(
        "Group passes wait {} ms per idle socket and take at most {} lines per socket.",
        config.read_timeout_ms, config.max_lines_per_pass
    );
    if !config.udp.enabled {
        info!("Binary UDP listener is disabled in the configuration.");
    }
}
