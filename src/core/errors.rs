// src/core/errors.rs

//! Defines the error types used across the server.
//!
//! `PixelfloodError` covers lifecycle and I/O failures. Wire decoding has its
//! own small enums (`CommandError`, `FrameError`) because a malformed frame is
//! routine input that is counted and dropped, never propagated.

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

/// The main error enum for server lifecycle, sockets and sinks.
#[derive(Error, Debug)]
pub enum PixelfloodError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    #[error("Operation not allowed in the current state: {0}")]
    InvalidState(String),

    #[error("Render sink error: {0}")]
    Sink(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// `std::io::Error` is not cloneable, so it is shared behind an Arc.
impl Clone for PixelfloodError {
    fn clone(&self) -> Self {
        match self {
            PixelfloodError::Io(e) => PixelfloodError::Io(Arc::clone(e)),
            PixelfloodError::Bind { addr, source } => PixelfloodError::Bind {
                addr: *addr,
                source: Arc::clone(source),
            },
            PixelfloodError::InvalidAddress(s) => PixelfloodError::InvalidAddress(s.clone()),
            PixelfloodError::InvalidState(s) => PixelfloodError::InvalidState(s.clone()),
            PixelfloodError::Sink(s) => PixelfloodError::Sink(s.clone()),
            PixelfloodError::Config(s) => PixelfloodError::Config(s.clone()),
        }
    }
}

impl PartialEq for PixelfloodError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PixelfloodError::Io(e1), PixelfloodError::Io(e2)) => e1.kind() == e2.kind(),
            (
                PixelfloodError::Bind { addr: a1, source: s1 },
                PixelfloodError::Bind { addr: a2, source: s2 },
            ) => a1 == a2 && s1.kind() == s2.kind(),
            (PixelfloodError::InvalidAddress(s1), PixelfloodError::InvalidAddress(s2)) => s1 == s2,
            (PixelfloodError::InvalidState(s1), PixelfloodError::InvalidState(s2)) => s1 == s2,
            (PixelfloodError::Sink(s1), PixelfloodError::Sink(s2)) => s1 == s2,
            (PixelfloodError::Config(s1), PixelfloodError::Config(s2)) => s1 == s2,
            _ => false,
        }
    }
}

impl From<std::io::Error> for PixelfloodError {
    fn from(e: std::io::Error) -> Self {
        PixelfloodError::Io(Arc::new(e))
    }
}

impl PixelfloodError {
    /// Wraps a bind failure together with the address that was requested.
    pub fn bind(addr: SocketAddr, e: std::io::Error) -> Self {
        PixelfloodError::Bind {
            addr,
            source: Arc::new(e),
        }
    }

    /// True for the I/O errors a peer causes by simply going away.
    pub fn is_normal_disconnect(&self) -> bool {
        matches!(self, PixelfloodError::Io(e) if matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof
                | std::io::ErrorKind::ConnectionAborted
        ))
    }
}

/// Why a text line was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty line")]
    Empty,

    #[error("expected 4 components, got {0}")]
    WrongComponentCount(usize),

    #[error("unknown command")]
    UnknownCommand,

    #[error("coordinate must have 1 to 5 decimal digits, got {0}")]
    CoordinateLength(usize),

    #[error("invalid decimal digit")]
    InvalidDigit,

    #[error("color must have 6 hex digits, got {0}")]
    ColorLength(usize),

    #[error("invalid hex digit")]
    InvalidHexDigit,

    #[error("line exceeds the maximum length")]
    LineTooLong,
}

/// Why a binary datagram was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("truncated frame: {0} bytes")]
    Truncated(usize),

    #[error("oversized frame: {0} bytes")]
    Oversized(usize),
}
