// src/lib.rs

//! pixelflood is a shared-canvas server for the pixelflut protocol. Clients
//! paint a fixed-size grid with `PX x y rrggbb` lines over TCP, or with 7-byte
//! datagrams over UDP; sockets from one address are served as a group under a
//! single read lock, and optional render sinks periodically copy the grid to a
//! framebuffer device or forward it to another server.

pub mod config;
pub mod connection;
pub mod core;
pub mod server;

// Re-export
pub use crate::config::Config;
pub use crate::core::{Pixel, PixelGrid, PixelfloodError, PxCommand};
pub use crate::server::{ListenerState, Server};
