// src/core/mod.rs

//! The central module containing the canvas, the wire protocols, and the
//! shared server state of pixelflood.

pub mod errors;
pub mod grid;
pub mod metrics;
pub mod protocol;
pub mod sink;
pub mod state;

pub use errors::PixelfloodError;
pub use grid::{Pixel, PixelGrid};
pub use protocol::PxCommand;
