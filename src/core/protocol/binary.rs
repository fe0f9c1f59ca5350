// src/core/protocol/binary.rs

//! The fixed 7-byte UDP frame: `x_hi, x_lo, y_hi, y_lo, r, g, b`.
//!
//! One datagram carries exactly one frame. There is no reassembly.

use super::text::PxCommand;
use crate::core::errors::FrameError;
use crate::core::grid::Pixel;

pub const FRAME_LEN: usize = 7;

/// Decodes one datagram. Anything other than exactly `FRAME_LEN` bytes is rejected.
#[inline]
pub fn decode_frame(datagram: &[u8]) -> Result<PxCommand, FrameError> {
    let frame: &[u8; FRAME_LEN] = match datagram.len() {
        n if n < FRAME_LEN => return Err(FrameError::Truncated(n)),
        n if n > FRAME_LEN => return Err(FrameError::Oversized(n)),
        _ => datagram
            .try_into()
            .map_err(|_| FrameError::Truncated(datagram.len()))?,
    };
    Ok(PxCommand {
        x: u16::from_be_bytes([frame[0], frame[1]]),
        y: u16::from_be_bytes([frame[2], frame[3]]),
        color: Pixel::new(frame[4], frame[5], frame[6]),
    })
}

pub fn encode_frame(cmd: &PxCommand) -> [u8; FRAME_LEN] {
    let [x_hi, x_lo] = cmd.x.to_be_bytes();
    let [y_hi, y_lo] = cmd.y.to_be_bytes();
    [x_hi, x_lo, y_hi, y_lo, cmd.color.r, cmd.color.g, cmd.color.b]
}
