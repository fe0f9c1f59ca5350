// src/config.rs

//! Manages server configuration: loading from TOML, defaults, and validation.

use crate::core::protocol::MIN_LINE_LENGTH;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Settings for the optional binary UDP listener.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UdpConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_port(),
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// If true, an HTTP server will be started to expose Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,
    /// The port for the Prometheus metrics server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

/// Paints the grid into a Linux framebuffer device.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FramebufferConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_fb_device")]
    pub device: String,
    #[serde(default = "default_fb_refresh_hz")]
    pub refresh_hz: u32,
}

impl Default for FramebufferConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            device: default_fb_device(),
            refresh_hz: default_fb_refresh_hz(),
        }
    }
}

/// Forwards a region of the grid to another server speaking the same protocol.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProxyConfig {
    /// `host:port` of the downstream server.
    pub address: String,
    #[serde(default)]
    pub x_begin: u16,
    #[serde(default)]
    pub y_begin: u16,
    pub x_end: u16,
    pub y_end: u16,
    #[serde(default = "default_proxy_refresh_hz")]
    pub refresh_hz: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    1234
}
fn default_width() -> u16 {
    320
}
fn default_height() -> u16 {
    400
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_read_timeout_ms() -> u64 {
    1000
}
fn default_max_lines_per_pass() -> usize {
    1024
}
fn default_max_line_length() -> usize {
    64
}
fn default_metrics_port() -> u16 {
    9878
}
fn default_fb_device() -> String {
    "/dev/fb0".to_string()
}
fn default_fb_refresh_hz() -> u32 {
    60
}
fn default_proxy_refresh_hz() -> u32 {
    100
}

/// The resolved server configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_width")]
    pub width: u16,
    #[serde(default = "default_height")]
    pub height: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// How long a group pass waits on one idle socket before moving on.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Upper bound on lines taken from one socket in a single pass.
    #[serde(default = "default_max_lines_per_pass")]
    pub max_lines_per_pass: usize,
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    #[serde(default)]
    pub udp: UdpConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub framebuffer: FramebufferConfig,
    #[serde(default)]
    pub proxy: Vec<ProxyConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            width: default_width(),
            height: default_height(),
            log_level: default_log_level(),
            read_timeout_ms: default_read_timeout_ms(),
            max_lines_per_pass: default_max_lines_per_pass(),
            max_line_length: default_max_line_length(),
            udp: UdpConfig::default(),
            metrics: MetricsConfig::default(),
            framebuffer: FramebufferConfig::default(),
            proxy: Vec::new(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{}'", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid configuration in '{}'", path.display()))
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// A config bound to an ephemeral loopback port, for tests and embedding.
    pub fn ephemeral(width: u16, height: u16) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            width,
            height,
            ..Self::default()
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Resolves `host:port` for the TCP listener.
    pub fn tcp_addr(&self) -> Result<SocketAddr> {
        resolve(&self.host, self.port)
    }

    /// Resolves `host:udp.port` for the UDP listener.
    pub fn udp_addr(&self) -> Result<SocketAddr> {
        resolve(&self.host, self.udp.port)
    }

    /// Validates the configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(anyhow!(
                "grid dimensions must be non-zero (got {}x{})",
                self.width,
                self.height
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(anyhow!("read_timeout_ms cannot be 0"));
        }
        if self.max_lines_per_pass == 0 {
            return Err(anyhow!("max_lines_per_pass cannot be 0"));
        }
        if self.max_line_length < MIN_LINE_LENGTH {
            return Err(anyhow!(
                "max_line_length must be at least {} to fit a full command (got {})",
                MIN_LINE_LENGTH,
                self.max_line_length
            ));
        }
        if self.read_timeout_ms > 10_000 {
            warn!(
                "read_timeout_ms is {} ms; one idle socket can hold its group for that long.",
                self.read_timeout_ms
            );
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(anyhow!("metrics.port cannot be 0"));
            }
            if self.metrics.port == self.port {
                return Err(anyhow!(
                    "metrics.port cannot be the same as the main server port"
                ));
            }
        }

        if self.framebuffer.enabled {
            if self.framebuffer.device.trim().is_empty() {
                return Err(anyhow!("framebuffer.device cannot be empty"));
            }
            if self.framebuffer.refresh_hz == 0 {
                return Err(anyhow!("framebuffer.refresh_hz cannot be 0"));
            }
        }

        for (i, proxy) in self.proxy.iter().enumerate() {
            let n = i + 1;
            if proxy.address.trim().is_empty() {
                return Err(anyhow!("proxy #{n}: address cannot be empty"));
            }
            if proxy.refresh_hz == 0 {
                return Err(anyhow!("proxy #{n}: refresh_hz cannot be 0"));
            }
            if proxy.x_begin >= proxy.x_end || proxy.y_begin >= proxy.y_end {
                return Err(anyhow!("proxy #{n}: region is empty"));
            }
            if proxy.x_end > self.width || proxy.y_end > self.height {
                return Err(anyhow!(
                    "proxy #{n}: region exceeds the {}x{} grid",
                    self.width,
                    self.height
                ));
            }
        }
        Ok(())
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("Failed to resolve '{host}:{port}'"))?
        .next()
        .ok_or_else(|| anyhow!("'{host}:{port}' did not resolve to any address"))
}
