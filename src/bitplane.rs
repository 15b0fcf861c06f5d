//! Transpose per-strip colors into WS2812 bit planes for a parallel PIO program.
//!
//! The parallel transmitter drives up to 8 strips from consecutive GPIOs. Each byte it
//! pulls from the FIFO is one bit time for every strip at once: bit `s` of the byte is
//! the level strip `s` needs for that bit. A frame is therefore laid out as
//! `[led][channel * 8 + bit]`, channels in wire order (G, R, B), bits MSB first.
//!
//! ```text
//! strip 0, led 0, r = 0b1000_0001
//!
//! planes[0][ 8] & 0b0000_0001 != 0   (r bit 7)
//! planes[0][ 9..15]                  (r bits 6..1) strip 0 clear
//! planes[0][15] & 0b0000_0001 != 0   (r bit 0)
//! ```

use smart_leds::RGB8;

pub use crate::layout::StripColors;

/// Bit-plane bytes for `L` LEDs on up to 8 strips.
pub type BitPlanes<const L: usize> = [[u8; PLANES_PER_LED]; L];

/// Bits per WS2812 LED (and so plane bytes per LED).
pub const PLANES_PER_LED: usize = 24;

/// The three color bytes of an LED in the order they are clocked out.
#[must_use]
pub const fn wire_bytes(color: RGB8) -> [u8; 3] {
    [color.g, color.r, color.b]
}

/// Straightforward transposition: one bit test per strip, LED, channel and bit.
///
/// Kept as the definition [`encode`] must match.
pub fn encode_reference<const S: usize, const L: usize>(
    strips: &StripColors<S, L>,
    planes: &mut BitPlanes<L>,
) {
    const { assert!(S <= 8, "at most 8 strips fit in a plane byte") };

    for (led_index, led_planes) in planes.iter_mut().enumerate() {
        for (plane_index, plane) in led_planes.iter_mut().enumerate() {
            let channel = plane_index / 8;
            let mask = 0x80u8 >> (plane_index % 8);
            let mut value = 0u8;
            for (strip_index, strip) in strips.iter().enumerate() {
                if wire_bytes(strip[led_index])[channel] & mask != 0 {
                    value |= 1 << strip_index;
                }
            }
            *plane = value;
        }
    }
}

/// Shift-and-accumulate transposition, identical in output to [`encode_reference`].
pub fn encode<const S: usize, const L: usize>(
    strips: &StripColors<S, L>,
    planes: &mut BitPlanes<L>,
) {
    const { assert!(S <= 8, "at most 8 strips fit in a plane byte") };

    planes.fill([0; PLANES_PER_LED]);
    for (strip_index, strip) in strips.iter().enumerate() {
        let strip_bit = 1u8 << strip_index;
        for (led_planes, color) in planes.iter_mut().zip(strip) {
            for (channel_planes, mut byte) in led_planes.chunks_exact_mut(8).zip(wire_bytes(*color)) {
                // LSB first from the end of the chunk, so plane 0 gets the MSB.
                for plane in channel_planes.iter_mut().rev() {
                    *plane |= (byte & 1) * strip_bit;
                    byte >>= 1;
                }
            }
        }
    }
}

/// Turns remapped strip colors into whatever a transmitter consumes.
pub trait FrameEncoder<const S: usize, const L: usize> {
    /// Transmit buffer type.
    type Buffer: 'static;

    /// An all-off buffer, for initializing statics.
    const BLANK: Self::Buffer;

    /// Fill `buffer` from `strips`.
    fn encode(strips: &StripColors<S, L>, buffer: &mut Self::Buffer);
}

/// Produces [`BitPlanes`] for the parallel transmitter.
#[derive(Clone, Copy, Debug, Default)]
pub struct BitPlaneEncoder;

impl<const S: usize, const L: usize> FrameEncoder<S, L> for BitPlaneEncoder {
    type Buffer = BitPlanes<L>;

    const BLANK: Self::Buffer = [[0; PLANES_PER_LED]; L];

    fn encode(strips: &StripColors<S, L>, buffer: &mut Self::Buffer) {
        encode(strips, buffer);
    }
}

/// Copies strip colors unchanged for drivers that pack GRB themselves.
#[derive(Clone, Copy, Debug, Default)]
pub struct StripEncoder;

impl<const S: usize, const L: usize> FrameEncoder<S, L> for StripEncoder {
    type Buffer = StripColors<S, L>;

    const BLANK: Self::Buffer = [[RGB8::new(0, 0, 0); L]; S];

    fn encode(strips: &StripColors<S, L>, buffer: &mut Self::Buffer) {
        *buffer = *strips;
    }
}
