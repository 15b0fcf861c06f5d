//! The pixel buffer the wall is drawn into, plus the drawing helpers that sit on top of it.
//!
//! [`Frame2d`] is a plain `W × H` grid of [`RGB8`] colors with `(0, 0)` at the top-left
//! corner, `x` increasing to the right and `y` increasing downward. It implements
//! [`DrawTarget`], so every `embedded-graphics` primitive (lines, rectangles, circles,
//! text) can draw into it. Pixels that fall outside the frame are dropped silently,
//! both by the `embedded-graphics` path and by the direct helpers below.
//!
//! ```rust
//! use embedded_graphics::{pixelcolor::Rgb888, prelude::*, primitives::{Line, PrimitiveStyle}};
//! use led_wall::frame::{Align, Frame2d};
//! use smart_leds::colors;
//!
//! let mut frame = Frame2d::<8, 6>::new();
//! Line::new(Point::new(0, 5), Point::new(7, 5))
//!     .into_styled(PrimitiveStyle::with_stroke(Rgb888::RED, 1))
//!     .draw(&mut frame)
//!     .expect("frame drawing is infallible");
//! frame.set_pixel(-1, 0, colors::WHITE); // clipped, no effect
//! frame.draw_3x5_number(7, 0, 0, colors::WHITE, Align::Left);
//! assert_eq!(frame[(0, 5)], colors::RED);
//! ```

use core::{
    convert::Infallible,
    ops::{Deref, DerefMut, Index, IndexMut},
};

use embedded_graphics::{
    mono_font::{MonoTextStyle, ascii::FONT_4X6},
    pixelcolor::Rgb888,
    prelude::*,
    text::{Baseline, Text},
};
use smart_leds::RGB8;

/// Convert RGB8 (smart-leds) to Rgb888 (embedded-graphics).
#[must_use]
pub const fn rgb8_to_rgb888(color: RGB8) -> Rgb888 {
    Rgb888::new(color.r, color.g, color.b)
}

/// Convert Rgb888 (embedded-graphics) to RGB8 (smart-leds).
#[must_use]
pub fn rgb888_to_rgb8(color: Rgb888) -> RGB8 {
    RGB8::new(color.r(), color.g(), color.b())
}

/// A `W × H` pixel buffer stored row-major: `frame.0[y][x]`.
///
/// `frame[(x, y)]` indexes by column then row and panics when out of range; use
/// [`Frame2d::set_pixel`] when clipping is wanted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame2d<const W: usize, const H: usize>(pub [[RGB8; W]; H]);

impl<const W: usize, const H: usize> Frame2d<W, H> {
    /// Frame width in pixels (columns).
    pub const WIDTH: usize = W;
    /// Frame height in pixels (rows).
    pub const HEIGHT: usize = H;
    /// Total number of pixels (WIDTH × HEIGHT).
    pub const LEN: usize = W * H;
    /// Frame dimensions as a [`Size`], for `embedded-graphics`.
    pub const SIZE: Size = Size::new(W as u32, H as u32);
    /// Top-left corner coordinate as a [`Point`].
    pub const TOP_LEFT: Point = Point::new(0, 0);
    /// Bottom-right corner coordinate as a [`Point`].
    pub const BOTTOM_RIGHT: Point = Point::new((W - 1) as i32, (H - 1) as i32);

    /// Create a new blank (all black) frame.
    #[must_use]
    pub const fn new() -> Self {
        Self([[RGB8::new(0, 0, 0); W]; H])
    }

    /// Create a frame filled with a single color.
    #[must_use]
    pub const fn filled(color: RGB8) -> Self {
        Self([[color; W]; H])
    }

    /// Set every pixel to black.
    pub fn clear(&mut self) {
        self.fill(RGB8::default());
    }

    /// Set every pixel to `color`.
    pub fn fill(&mut self, color: RGB8) {
        for row in &mut self.0 {
            row.fill(color);
        }
    }

    fn pixel_mut(&mut self, x: i32, y: i32) -> Option<&mut RGB8> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        self.0.get_mut(y)?.get_mut(x)
    }

    /// Write one pixel. Coordinates outside the frame are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: RGB8) {
        if let Some(pixel) = self.pixel_mut(x, y) {
            *pixel = color;
        }
    }

    /// Blend `color` over the existing pixel with coverage `alpha` (255 = opaque).
    ///
    /// Each channel becomes `(old * (255 - alpha) + new * alpha) >> 8`. Coordinates
    /// outside the frame are ignored.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: RGB8, alpha: u8) {
        if let Some(pixel) = self.pixel_mut(x, y) {
            *pixel = RGB8::new(
                blend_channel(pixel.r, color.r, alpha),
                blend_channel(pixel.g, color.g, alpha),
                blend_channel(pixel.b, color.b, alpha),
            );
        }
    }

    /// Draw a soft disc: full color at the centre, fading to nothing at `radius`.
    ///
    /// A non-positive radius plots the single pixel under the centre.
    pub fn draw_orb(&mut self, center_x: f32, center_y: f32, radius: f32, color: RGB8) {
        if radius <= 0.0 {
            self.set_pixel(center_x as i32, center_y as i32, color);
            return;
        }
        let radius_squared = radius * radius;
        // Only the part of the bounding box that lies on the frame is visited.
        let x_start = libm::floorf(center_x - radius).max(0.0);
        let x_end = libm::ceilf(center_x + radius).min(W as f32 - 1.0);
        let y_start = libm::floorf(center_y - radius).max(0.0);
        let y_end = libm::ceilf(center_y + radius).min(H as f32 - 1.0);
        if !(x_start <= x_end && y_start <= y_end) {
            return;
        }
        for y in y_start as i32..=y_end as i32 {
            for x in x_start as i32..=x_end as i32 {
                let dx = x as f32 - center_x;
                let dy = y as f32 - center_y;
                let distance = (dx * dx + dy * dy) / radius_squared;
                if distance <= 1.0 {
                    self.blend_pixel(x, y, color, ((1.0 - distance) * 255.0) as u8);
                }
            }
        }
    }

    /// Draw one 3×5 glyph with its top-left corner at `(x, y)`.
    ///
    /// Only digits have glyphs; anything else draws a checkerboard "missing" glyph.
    pub fn draw_3x5_char(&mut self, ch: char, x: i32, y: i32, color: RGB8) {
        let glyph = ch
            .to_digit(10)
            .and_then(|digit| FONT_3X5_DIGITS.get(digit as usize))
            .unwrap_or(&FONT_3X5_MISSING);
        for (row_offset, row_bits) in (0..).zip(glyph) {
            let Some(row_y) = y.checked_add(row_offset) else {
                break;
            };
            for (column_offset, mask) in (0..).zip([0b100, 0b010, 0b001]) {
                let Some(column_x) = x.checked_add(column_offset) else {
                    break;
                };
                if row_bits & mask != 0 {
                    self.set_pixel(column_x, row_y, color);
                }
            }
        }
    }

    /// Draw a string in the 3×5 font with a 4-pixel advance.
    ///
    /// `x` is the left edge, centre or right edge of the text depending on `align`.
    pub fn draw_3x5_str(&mut self, text: &str, x: i32, y: i32, color: RGB8, align: Align) {
        // Glyph positions are worked out in i64 so text hanging off either end of the
        // i32 range is clipped instead of overflowing.
        let width = i64::try_from(text.chars().count()).unwrap_or(i64::MAX / 8)
            * i64::from(FONT_3X5_ADVANCE);
        let x = i64::from(x);
        let left = match align {
            Align::Left => x,
            Align::Center => x - width / 2,
            Align::Right => x - width + 1,
        };
        for (index, ch) in (0i64..).zip(text.chars()) {
            let Ok(glyph_x) = i32::try_from(left + index * i64::from(FONT_3X5_ADVANCE)) else {
                continue;
            };
            self.draw_3x5_char(ch, glyph_x, y, color);
        }
    }

    /// Draw an unsigned number in the 3×5 font.
    pub fn draw_3x5_number(&mut self, value: u32, x: i32, y: i32, color: RGB8, align: Align) {
        let mut digits: heapless::String<10> = heapless::String::new();
        // u32::MAX has 10 digits, so this cannot overflow the buffer.
        let _ = core::fmt::write(&mut digits, format_args!("{value}"));
        self.draw_3x5_str(&digits, x, y, color, align);
    }

    /// Draw text in the 4×6 `embedded-graphics` font with its top-left corner at `top_left`.
    pub fn draw_text(&mut self, text: &str, top_left: Point, color: RGB8) {
        let style = MonoTextStyle::new(&FONT_4X6, rgb8_to_rgb888(color));
        let Ok(_) = Text::with_baseline(text, top_left, style, Baseline::Top).draw(self);
    }
}

const fn blend_channel(old: u8, new: u8, alpha: u8) -> u8 {
    let anti_alpha = 255 - alpha as u16;
    ((old as u16 * anti_alpha + new as u16 * alpha as u16) >> 8) as u8
}

/// Horizontal alignment for 3×5 text.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Align {
    /// `x` is the left edge of the first glyph.
    #[default]
    Left,
    /// `x` is the middle of the text.
    Center,
    /// `x` is the right edge of the last glyph.
    Right,
}

const FONT_3X5_ADVANCE: i32 = 4;

const FONT_3X5_MISSING: [u8; 5] = [0b101, 0b010, 0b101, 0b010, 0b101];

const FONT_3X5_DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b010, 0b100, 0b111],
    [0b111, 0b001, 0b011, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

impl<const W: usize, const H: usize> Deref for Frame2d<W, H> {
    type Target = [[RGB8; W]; H];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const W: usize, const H: usize> DerefMut for Frame2d<W, H> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<const W: usize, const H: usize> Index<(usize, usize)> for Frame2d<W, H> {
    type Output = RGB8;

    fn index(&self, (x_index, y_index): (usize, usize)) -> &Self::Output {
        assert!(x_index < W, "x_index must be within width");
        assert!(y_index < H, "y_index must be within height");
        &self.0[y_index][x_index]
    }
}

impl<const W: usize, const H: usize> IndexMut<(usize, usize)> for Frame2d<W, H> {
    fn index_mut(&mut self, (x_index, y_index): (usize, usize)) -> &mut Self::Output {
        assert!(x_index < W, "x_index must be within width");
        assert!(y_index < H, "y_index must be within height");
        &mut self.0[y_index][x_index]
    }
}

impl<const W: usize, const H: usize> From<[[RGB8; W]; H]> for Frame2d<W, H> {
    fn from(array: [[RGB8; W]; H]) -> Self {
        Self(array)
    }
}

impl<const W: usize, const H: usize> Default for Frame2d<W, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const W: usize, const H: usize> OriginDimensions for Frame2d<W, H> {
    fn size(&self) -> Size {
        Self::SIZE
    }
}

impl<const W: usize, const H: usize> DrawTarget for Frame2d<W, H> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            self.set_pixel(coord.x, coord.y, rgb888_to_rgb8(color));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
    use smart_leds::colors;

    type Frame = Frame2d<6, 5>;

    #[test]
    fn set_pixel_clips_silently() {
        let mut frame = Frame::new();
        frame.set_pixel(-1, 0, colors::RED);
        frame.set_pixel(0, -1, colors::RED);
        frame.set_pixel(6, 0, colors::RED);
        frame.set_pixel(0, 5, colors::RED);
        assert_eq!(frame, Frame::new());

        frame.set_pixel(5, 4, colors::RED);
        assert_eq!(frame[(5, 4)], colors::RED);
    }

    #[test]
    fn blend_pixel_mixes_by_alpha() {
        let mut frame = Frame::filled(RGB8::new(200, 0, 100));
        frame.blend_pixel(1, 1, RGB8::new(0, 255, 100), 128);
        // (200 * 127 + 0) >> 8, (0 + 255 * 128) >> 8, (100 * 127 + 100 * 128) >> 8
        assert_eq!(frame[(1, 1)], RGB8::new(99, 127, 99));

        frame.blend_pixel(2, 2, colors::WHITE, 0);
        assert_eq!(frame[(2, 2)], RGB8::new(199, 0, 99));
    }

    #[test]
    fn embedded_graphics_clips_out_of_range_pixels() {
        let mut frame = Frame::new();
        Line::new(Point::new(-3, 2), Point::new(10, 2))
            .into_styled(PrimitiveStyle::with_stroke(Rgb888::GREEN, 1))
            .draw(&mut frame)
            .expect("frame drawing is infallible");
        assert!((*frame)[2].iter().all(|&pixel| pixel == colors::LIME));

        Rectangle::new(Frame::TOP_LEFT, Frame::SIZE)
            .into_styled(PrimitiveStyle::with_stroke(Rgb888::BLUE, 1))
            .draw(&mut frame)
            .expect("frame drawing is infallible");
        assert_eq!(frame[(0, 0)], colors::BLUE);
        assert_eq!(frame[(5, 4)], colors::BLUE);
        assert_eq!(frame[(2, 2)], colors::LIME);
    }

    #[test]
    fn digit_glyphs_match_font() {
        let mut frame = Frame2d::<3, 5>::new();
        frame.draw_3x5_char('7', 0, 0, colors::WHITE);
        let lit: [[bool; 3]; 5] = frame.0.map(|row| row.map(|pixel| pixel == colors::WHITE));
        assert_eq!(
            lit,
            [
                [true, true, true],
                [false, false, true],
                [false, true, false],
                [false, true, false],
                [false, true, false],
            ]
        );
    }

    #[test]
    fn numbers_align_right_and_center() {
        let mut right = Frame2d::<12, 5>::new();
        right.draw_3x5_number(10, 11, 0, colors::WHITE, Align::Right);
        // "10" is 8 pixels wide: left edge at 11 - 8 + 1 = 4, so the "1" stem sits at x = 5.
        assert_eq!(right[(5, 0)], colors::WHITE);
        assert_eq!(right[(3, 0)], RGB8::default());

        let mut center = Frame2d::<12, 5>::new();
        center.draw_3x5_number(8, 6, 0, colors::WHITE, Align::Center);
        // one glyph, 4 wide: starts at 6 - 2 = 4
        assert_eq!(center[(4, 0)], colors::WHITE);
        assert_eq!(center[(6, 0)], colors::WHITE);
        assert_eq!(center[(3, 0)], RGB8::default());
    }

    #[test]
    fn orb_is_brightest_at_centre() {
        let mut frame = Frame2d::<7, 7>::new();
        frame.draw_orb(3.0, 3.0, 2.0, colors::WHITE);
        let centre = frame[(3, 3)];
        let edge = frame[(3, 1)];
        assert!(centre.r > 240);
        assert!(edge.r < centre.r);
        assert_eq!(frame[(0, 0)], RGB8::default());
    }

    #[test]
    fn glyphs_at_extreme_coordinates_are_clipped() {
        let mut frame = Frame::new();
        for (x, y) in [
            (i32::MAX - 1, 0),
            (0, i32::MAX - 1),
            (i32::MAX, i32::MAX),
            (i32::MIN, 0),
            (0, i32::MIN),
            (i32::MIN, i32::MIN),
        ] {
            frame.draw_3x5_char('8', x, y, colors::WHITE);
            frame.draw_3x5_char('?', x, y, colors::WHITE);
            for align in [Align::Left, Align::Center, Align::Right] {
                frame.draw_3x5_str("12", x, y, colors::WHITE, align);
                frame.draw_3x5_number(u32::MAX, x, y, colors::WHITE, align);
            }
        }
        assert_eq!(frame, Frame::new());
    }

    #[test]
    fn text_near_the_i32_limits_is_clipped() {
        let mut frame = Frame::new();
        frame.draw_3x5_number(12, i32::MAX - 2, 0, colors::WHITE, Align::Left);
        frame.draw_3x5_str("12", i32::MIN, 0, colors::WHITE, Align::Right);
        assert_eq!(frame, Frame::new());

        // Text straddling the left edge keeps its visible part.
        frame.draw_3x5_str("88", 6, 0, colors::WHITE, Align::Right);
        assert_eq!(frame[(0, 0)], colors::WHITE);
    }

    #[test]
    fn orb_only_visits_the_frame() {
        let mut frame = Frame::new();
        frame.draw_orb(3.0, 2.0, 1.0e9, colors::WHITE);
        assert!(frame.iter().flatten().all(|&pixel| pixel.r > 250));

        let mut off_frame = Frame::new();
        off_frame.draw_orb(-1.0e9, 1.0e9, 10.0, colors::WHITE);
        off_frame.draw_orb(f32::MAX, f32::MIN, 1.0, colors::WHITE);
        off_frame.draw_orb(f32::NAN, 2.0, 3.0, colors::WHITE);
        assert_eq!(off_frame, Frame::new());
    }

    #[test]
    fn text_draws_inside_frame() {
        let mut frame = Frame2d::<12, 6>::new();
        frame.draw_text("8", Point::new(0, 0), colors::WHITE);
        assert!(frame.iter().flatten().any(|&pixel| pixel == colors::WHITE));
        frame.clear();
        assert_eq!(frame, Frame2d::new());
    }
}
