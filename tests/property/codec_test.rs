// tests/property/codec_test.rs

//! Round-trip and rejection properties of the text and binary codecs.

use pixelflood::core::grid::Pixel;
use pixelflood::core::protocol::{
    FRAME_LEN, PxCommand, decode_frame, encode_command, encode_frame, parse_line,
};
use proptest::prelude::*;

fn any_command() -> impl Strategy<Value = PxCommand> {
    (any::<u16>(), any::<u16>(), any::<[u8; 3]>())
        .prop_map(|(x, y, [r, g, b])| PxCommand::new(x, y, Pixel::new(r, g, b)))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 512,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_text_roundtrip(cmd in any_command()) {
        let line = encode_command(&cmd);
        prop_assert_eq!(line.last(), Some(&b'\n'));
        prop_assert_eq!(parse_line(&line[..line.len() - 1]), Ok(cmd));
    }

    #[test]
    fn test_uppercase_hex_parses_like_lowercase(cmd in any_command()) {
        let line = String::from_utf8(encode_command(&cmd)).unwrap();
        let upper = format!("PX{}", line.trim_end()[2..].to_uppercase());
        prop_assert_eq!(parse_line(upper.as_bytes()), Ok(cmd));
    }

    #[test]
    fn test_binary_roundtrip(cmd in any_command()) {
        prop_assert_eq!(decode_frame(&encode_frame(&cmd)), Ok(cmd));
    }

    #[test]
    fn test_wrong_length_datagrams_rejected(bytes in prop::collection::vec(any::<u8>(), 0..32)) {
        prop_assume!(bytes.len() != FRAME_LEN);
        prop_assert!(decode_frame(&bytes).is_err());
    }

    #[test]
    fn test_parse_line_never_panics(line in prop::collection::vec(any::<u8>(), 0..80)) {
        let _ = parse_line(&line);
    }

    #[test]
    fn test_wrong_color_length_rejected(
        x in 0u16..1000,
        y in 0u16..1000,
        color in "[0-9a-f]{0,12}"
    ) {
        prop_assume!(color.len() != 6);
        let line = format!("PX {x} {y} {color}");
        prop_assert!(parse_line(line.as_bytes()).is_err());
    }
}
