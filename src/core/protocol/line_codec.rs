// src/core/protocol/line_codec.rs

//! A `tokio_util::codec` for the newline-delimited text protocol.
//!
//! Decoding yields one parse outcome per line, so a malformed line surfaces as
//! `Ok(Some(Err(..)))` and the stream keeps going. Only socket errors end the
//! stream. Lines longer than `max_line_length` are skipped up to their newline
//! and reported once as `CommandError::LineTooLong`.

use super::text::{MAX_COMMAND_LEN, PxCommand, parse_line, write_command};
use crate::core::errors::{CommandError, PixelfloodError};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// `PX 65535 65535 ffffff` plus slack for a trailing `\r`.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64;

/// Smallest usable limit: the longest command plus a trailing `\r`.
pub const MIN_LINE_LENGTH: usize = MAX_COMMAND_LEN + 1;

/// The outcome of decoding one line.
pub type Decoded = Result<PxCommand, CommandError>;

#[derive(Debug, Clone)]
pub struct PxLineCodec {
    max_line_length: usize,
    /// Offset into the buffer already scanned for a newline.
    next_index: usize,
    /// True while skipping the remainder of an overlong line.
    discarding: bool,
}

impl Default for PxLineCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl PxLineCodec {
    pub fn new(max_line_length: usize) -> Self {
        Self {
            max_line_length,
            next_index: 0,
            discarding: false,
        }
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    match line {
        [rest @ .., b'\r'] => rest,
        _ => line,
    }
}

impl Decoder for PxLineCodec {
    type Item = Decoded;
    type Error = PixelfloodError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let read_to = src.len();
            let newline = src[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n');
            // A trailing `\r` is stripped once its `\n` arrives, so it does
            // not count against the limit yet.
            let partial_limit = self.max_line_length + usize::from(src.ends_with(b"\r"));

            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    src.advance(self.next_index + offset + 1);
                    self.discarding = false;
                    self.next_index = 0;
                    return Ok(Some(Err(CommandError::LineTooLong)));
                }
                (true, None) => {
                    src.advance(read_to);
                    self.next_index = 0;
                    return Ok(None);
                }
                (false, Some(offset)) => {
                    let end = self.next_index + offset;
                    self.next_index = 0;
                    let line = src.split_to(end + 1);
                    let line = strip_cr(&line[..end]);
                    if line.len() > self.max_line_length {
                        return Ok(Some(Err(CommandError::LineTooLong)));
                    }
                    return Ok(Some(parse_line(line)));
                }
                (false, None) if read_to > partial_limit => {
                    self.discarding = true;
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        if src.is_empty() {
            return Ok(None);
        }
        // A final line without a newline still counts.
        self.next_index = 0;
        let line = src.split();
        if self.discarding {
            self.discarding = false;
            return Ok(Some(Err(CommandError::LineTooLong)));
        }
        Ok(Some(parse_line(strip_cr(&line))))
    }
}

impl Encoder<PxCommand> for PxLineCodec {
    type Error = PixelfloodError;

    fn encode(&mut self, item: PxCommand, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut line = Vec::with_capacity(24);
        write_command(&item, &mut line);
        dst.put_slice(&line);
        Ok(())
    }
}
