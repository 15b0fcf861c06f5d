#![allow(missing_docs)]
//! Host-level tests for the bit-plane encoder.

use led_wall::bitplane::{
    BitPlaneEncoder, BitPlanes, FrameEncoder, PLANES_PER_LED, encode, encode_reference,
};
use led_wall::frame::Frame2d;
use led_wall::layout::{FirstRow, StripColors, StripTopology, WallLayout};
use smart_leds::RGB8;

/// Small deterministic generator so failures reproduce.
struct XorShift32(u32);

impl XorShift32 {
    fn next_u8(&mut self) -> u8 {
        let mut state = self.0;
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        self.0 = state;
        (state >> 24) as u8
    }

    fn color(&mut self) -> RGB8 {
        RGB8::new(self.next_u8(), self.next_u8(), self.next_u8())
    }
}

fn random_strips<const S: usize, const L: usize>(rng: &mut XorShift32) -> StripColors<S, L> {
    core::array::from_fn(|_| core::array::from_fn(|_| rng.color()))
}

fn assert_encoders_agree<const S: usize, const L: usize>(seed: u32, rounds: usize) {
    let mut rng = XorShift32(seed);
    for _ in 0..rounds {
        let strips = random_strips::<S, L>(&mut rng);
        let mut reference: BitPlanes<L> = [[0; PLANES_PER_LED]; L];
        // Leftovers from a previous frame must not leak into the fast path.
        let mut fast: BitPlanes<L> = [[0xFF; PLANES_PER_LED]; L];
        encode_reference(&strips, &mut reference);
        encode(&strips, &mut fast);
        assert_eq!(fast, reference);
    }
}

#[test]
fn fast_encoder_matches_reference_for_three_strips() {
    assert_encoders_agree::<3, 512>(0x1234_5678, 8);
}

#[test]
fn fast_encoder_matches_reference_for_eight_strips() {
    assert_encoders_agree::<8, 64>(0xDEAD_BEEF, 32);
}

#[test]
fn fast_encoder_matches_reference_for_one_strip() {
    assert_encoders_agree::<1, 16>(7, 64);
}

#[test]
fn single_red_pixel_on_two_strip_wall() {
    // 4x2 wall: two strips side by side, each one 2x2 matrix.
    const TOPOLOGY: StripTopology = StripTopology {
        matrix_width: 2,
        matrix_height: 2,
        matrices_per_strip: 1,
        strip_columns: 2,
        strip_rows: 1,
        first_row: FirstRow::Bottom,
    };
    static WALL: WallLayout<4, 2, 2, 4> = WallLayout::from_topology(TOPOLOGY);

    let mut frame = Frame2d::<4, 2>::new();
    frame[(0, 0)] = RGB8::new(255, 0, 0);

    let mut strips: StripColors<2, 4> = [[RGB8::default(); 4]; 2];
    WALL.remap(&frame, &mut strips);
    let (strip, led) = WALL.physical_index(0, 0);
    assert_eq!(strip, 0);

    let mut planes = <BitPlaneEncoder as FrameEncoder<2, 4>>::BLANK;
    <BitPlaneEncoder as FrameEncoder<2, 4>>::encode(&strips, &mut planes);

    for (led_index, led_planes) in planes.iter().enumerate() {
        for (plane_index, &plane) in led_planes.iter().enumerate() {
            // wire order is g, r, b: the r byte owns planes 8..16
            let expected = if led_index == led && (8..16).contains(&plane_index) {
                0b01
            } else {
                0
            };
            assert_eq!(plane, expected, "led {led_index} plane {plane_index}");
        }
    }
}
