// tests/property/grid_test.rs

//! Grid properties when fed through the same path the read loops use.

use pixelflood::config::Config;
use pixelflood::core::grid::Pixel;
use pixelflood::core::protocol::parse_line;
use pixelflood::core::state::ServerState;
use proptest::prelude::*;

const W: u16 = 16;
const H: u16 = 16;

fn snapshot(state: &ServerState) -> Vec<Pixel> {
    let mut cells = Vec::with_capacity(W as usize * H as usize);
    for y in 0..H {
        for x in 0..W {
            cells.push(state.grid.get(x, y));
        }
    }
    cells
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_valid_command_sets_exactly_its_cell(
        x in 0u16..64,
        y in 0u16..64,
        rgb in any::<[u8; 3]>()
    ) {
        let state = ServerState::new(Config::ephemeral(W, H));
        let before = snapshot(&state);
        let line = format!("PX {x} {y} {:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2]);
        state.apply_decoded(parse_line(line.as_bytes()));

        let after = snapshot(&state);
        let color = Pixel::new(rgb[0], rgb[1], rgb[2]);
        for cy in 0..H {
            for cx in 0..W {
                let i = cy as usize * W as usize + cx as usize;
                if x < W && y < H && (cx, cy) == (x, y) {
                    prop_assert_eq!(after[i], color);
                } else {
                    prop_assert_eq!(after[i], before[i]);
                }
            }
        }
    }

    #[test]
    fn test_garbage_never_changes_the_grid(
        line in prop::collection::vec(any::<u8>(), 0..64)
    ) {
        let parsed = parse_line(&line);
        prop_assume!(parsed.is_err());

        let state = ServerState::new(Config::ephemeral(W, H));
        state.grid.set(3, 3, Pixel::new(7, 7, 7));
        let before = snapshot(&state);
        state.apply_decoded(parsed);
        prop_assert_eq!(snapshot(&state), before);
        prop_assert_eq!(state.stats.snapshot().malformed_commands, 1);
    }
}
