// src/core/protocol/mod.rs

pub mod binary;
pub mod line_codec;
pub mod text;

pub use binary::{FRAME_LEN, decode_frame, encode_frame};
pub use line_codec::{Decoded, MIN_LINE_LENGTH, PxLineCodec};
pub use text::{PxCommand, encode_command, parse_line};
