// src/core/protocol/text.rs

//! Parsing and serialization of the text command `PX <x> <y> <rrggbb>`.
//!
//! The parser works on raw bytes and never allocates. Decimal fields are
//! accumulated digit by digit with wrapping 16-bit arithmetic and are limited
//! to five digits, so `65536` wraps to `0` while `100000` is rejected. Hex
//! digits are validated first and then decoded by masking the low nibble and
//! adding 9 for letters.

use crate::core::errors::CommandError;
use crate::core::grid::Pixel;

/// The only command word the server understands.
pub const COMMAND_WORD: &[u8] = b"PX";

/// Maximum number of digits accepted in a coordinate field.
pub const MAX_COORDINATE_DIGITS: usize = 5;

/// Number of hex digits in a color field.
pub const COLOR_DIGITS: usize = 6;

/// Length of the longest valid command, `PX 65535 65535 ffffff`, without
/// any line terminator.
pub const MAX_COMMAND_LEN: usize =
    COMMAND_WORD.len() + 2 * MAX_COORDINATE_DIGITS + COLOR_DIGITS + 3;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// A decoded pixel write. Produced by either codec and applied immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PxCommand {
    pub x: u16,
    pub y: u16,
    pub color: Pixel,
}

impl PxCommand {
    pub const fn new(x: u16, y: u16, color: Pixel) -> Self {
        Self { x, y, color }
    }
}

/// Parses one line (without its terminating newline).
pub fn parse_line(line: &[u8]) -> Result<PxCommand, CommandError> {
    if line.is_empty() {
        return Err(CommandError::Empty);
    }

    let mut parts: [&[u8]; 4] = [&[]; 4];
    let mut count = 0;
    for part in line.split(|b| *b == b' ') {
        if count < parts.len() {
            parts[count] = part;
        }
        count += 1;
    }
    if count != 4 {
        return Err(CommandError::WrongComponentCount(count));
    }

    let [word, x, y, color] = parts;
    if word != COMMAND_WORD {
        return Err(CommandError::UnknownCommand);
    }

    Ok(PxCommand {
        x: parse_coordinate(x)?,
        y: parse_coordinate(y)?,
        color: parse_color(color)?,
    })
}

/// Accumulates ASCII decimal digits into a `u16`, wrapping on overflow.
#[inline]
pub fn parse_coordinate(field: &[u8]) -> Result<u16, CommandError> {
    if field.is_empty() || field.len() > MAX_COORDINATE_DIGITS {
        return Err(CommandError::CoordinateLength(field.len()));
    }
    let mut value: u16 = 0;
    for &b in field {
        let digit = b.wrapping_sub(b'0');
        if digit > 9 {
            return Err(CommandError::InvalidDigit);
        }
        value = value.wrapping_mul(10).wrapping_add(digit as u16);
    }
    Ok(value)
}

/// Decodes a single hex digit, upper or lower case.
#[inline]
pub fn hex_nibble(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F' => {
            // Letters have bit 0x40 set; their low nibble is 1..=6.
            Some((b & 0x0f) + if b & 0x40 != 0 { 9 } else { 0 })
        }
        _ => None,
    }
}

/// Parses exactly six hex digits into a pixel.
#[inline]
pub fn parse_color(field: &[u8]) -> Result<Pixel, CommandError> {
    if field.len() != COLOR_DIGITS {
        return Err(CommandError::ColorLength(field.len()));
    }
    let mut channels = [0u8; 3];
    for (channel, pair) in channels.iter_mut().zip(field.chunks_exact(2)) {
        let hi = hex_nibble(pair[0]).ok_or(CommandError::InvalidHexDigit)?;
        let lo = hex_nibble(pair[1]).ok_or(CommandError::InvalidHexDigit)?;
        *channel = (hi << 4) | lo;
    }
    let [r, g, b] = channels;
    Ok(Pixel { r, g, b })
}

/// Appends `PX x y rrggbb\n` (lowercase hex) to `dst`.
pub fn write_command(cmd: &PxCommand, dst: &mut Vec<u8>) {
    let mut num = itoa::Buffer::new();
    let mut hex_buf = [0u8; COLOR_DIGITS];
    for (pair, channel) in hex_buf
        .chunks_exact_mut(2)
        .zip([cmd.color.r, cmd.color.g, cmd.color.b])
    {
        pair[0] = HEX_DIGITS[usize::from(channel >> 4)];
        pair[1] = HEX_DIGITS[usize::from(channel & 0x0f)];
    }

    dst.extend_from_slice(COMMAND_WORD);
    dst.push(b' ');
    dst.extend_from_slice(num.format(cmd.x).as_bytes());
    dst.push(b' ');
    dst.extend_from_slice(num.format(cmd.y).as_bytes());
    dst.push(b' ');
    dst.extend_from_slice(&hex_buf);
    dst.push(b'\n');
}

/// Convenience wrapper around `write_command` returning an owned line.
pub fn encode_command(cmd: &PxCommand) -> Vec<u8> {
    let mut out = Vec::with_capacity(24);
    write_command(cmd, &mut out);
    out
}
