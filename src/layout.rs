//! Compile-time mapping between buffer pixels and physical LEDs.
//!
//! A wall is a grid of strip tiles. Each strip is a vertical stack of matrices wired
//! serpentine, and strips are numbered left to right, bottom row of tiles first:
//!
//! ```text
//! 3 strip columns x 1 strip row, 2 matrices per strip (the reference 48x32 wall):
//!
//!   +------+------+------+
//!   | S0M1 | S1M1 | S2M1 |
//!   +------+------+------+
//!   | S0M0 | S1M0 | S2M0 |      LED 0 of every strip is the bottom-left pixel of its tile
//!   +------+------+------+
//! ```
//!
//! [`WallLayout`] is computed once, in a `const`, from a [`StripTopology`] (or from an
//! arbitrary per-strip [`LedLayout`]) and caches both directions of the mapping, so
//! nothing is recomputed per pixel.
//!
//! ```rust
//! use led_wall::layout::{FirstRow, StripTopology, WallLayout};
//!
//! const TOPOLOGY: StripTopology = StripTopology {
//!     matrix_width: 2,
//!     matrix_height: 2,
//!     matrices_per_strip: 1,
//!     strip_columns: 2,
//!     strip_rows: 1,
//!     first_row: FirstRow::Bottom,
//! };
//! static WALL: WallLayout<4, 2, 2, 4> = WallLayout::from_topology(TOPOLOGY);
//!
//! // Bottom row runs left to right, the row above runs back.
//! assert_eq!(WALL.physical_index(0, 1), (0, 0));
//! assert_eq!(WALL.physical_index(1, 1), (0, 1));
//! assert_eq!(WALL.physical_index(1, 0), (0, 2));
//! assert_eq!(WALL.physical_index(0, 0), (0, 3));
//! assert_eq!(WALL.physical_index(2, 1), (1, 0));
//! ```

use smart_leds::RGB8;

use crate::frame::Frame2d;

/// Per-strip LED colors in wiring order.
pub type StripColors<const S: usize, const L: usize> = [[RGB8; L]; S];

// ============================================================================
// StripTopology
// ============================================================================

/// Which physical row of a strip carries LED 0.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FirstRow {
    /// LED 0 is at the bottom-left of the tile; wiring climbs upward.
    Bottom,
    /// LED 0 is at the top-left of the tile; wiring runs downward.
    Top,
}

/// Physical build of the wall.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StripTopology {
    /// Columns of one matrix.
    pub matrix_width: usize,
    /// Rows of one matrix.
    pub matrix_height: usize,
    /// Matrices chained on one strip, stacked vertically.
    pub matrices_per_strip: usize,
    /// Strip tiles across the wall.
    pub strip_columns: usize,
    /// Strip tiles down the wall.
    pub strip_rows: usize,
    /// Where each strip starts.
    pub first_row: FirstRow,
}

impl StripTopology {
    /// 48×32 wall: three strips side by side, each two 16×16 matrices tall.
    pub const REFERENCE_WALL: Self = Self {
        matrix_width: 16,
        matrix_height: 16,
        matrices_per_strip: 2,
        strip_columns: 3,
        strip_rows: 1,
        first_row: FirstRow::Bottom,
    };

    /// Number of strips.
    #[must_use]
    pub const fn strip_count(&self) -> usize {
        self.strip_columns * self.strip_rows
    }

    /// LEDs on one strip.
    #[must_use]
    pub const fn leds_per_strip(&self) -> usize {
        self.matrices_per_strip * self.matrix_width * self.matrix_height
    }

    /// Width of one strip tile in pixels.
    #[must_use]
    pub const fn strip_width(&self) -> usize {
        self.matrix_width
    }

    /// Height of one strip tile in pixels.
    #[must_use]
    pub const fn strip_height(&self) -> usize {
        self.matrix_height * self.matrices_per_strip
    }

    /// Wall width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.strip_columns * self.strip_width()
    }

    /// Wall height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.strip_rows * self.strip_height()
    }

    /// `(x, y)` inside a strip tile of the LED at `led_index`, for serpentine wiring.
    const fn serpentine_xy(&self, led_index: usize) -> (usize, usize) {
        let width = self.strip_width();
        let wired_row = led_index / width;
        let along_row = led_index % width;
        let x = if wired_row % 2 == 0 {
            along_row
        } else {
            width - 1 - along_row
        };
        let y = match self.first_row {
            FirstRow::Bottom => self.strip_height() - 1 - wired_row,
            FirstRow::Top => wired_row,
        };
        (x, y)
    }
}

// ============================================================================
// LedLayout
// ============================================================================

/// How the `N` LEDs of one strip map onto the cells of a `W × H` tile.
///
/// `index_to_xy()[led]` is the `(x, y)` of that LED, with `(0, 0)` at the top-left.
/// Layouts are validated when constructed: every cell must appear exactly once. Use
/// them in a `const` so a bad layout fails the build.
///
/// ```rust
/// use led_wall::layout::LedLayout;
///
/// // 3x2 tile wired serpentine from the bottom-left corner.
/// const FROM_BOTTOM: LedLayout<6, 3, 2> = LedLayout::serpentine_row_major().flip_v();
/// const EXPECTED: LedLayout<6, 3, 2> =
///     LedLayout::new([(0, 1), (1, 1), (2, 1), (2, 0), (1, 0), (0, 0)]);
/// const _: () = assert!(FROM_BOTTOM.equals(&EXPECTED));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedLayout<const N: usize, const W: usize, const H: usize> {
    map: [(u16, u16); N],
}

impl<const N: usize, const W: usize, const H: usize> LedLayout<N, W, H> {
    /// Validate and wrap an explicit LED order.
    ///
    /// # Panics
    ///
    /// Panics (at compile time in a `const`) if a coordinate is out of range, a cell
    /// repeats, or `W * H != N`.
    #[must_use]
    pub const fn new(map: [(u16, u16); N]) -> Self {
        assert!(W > 0 && H > 0, "W and H must be positive");
        assert!(W * H == N, "W*H must equal N");

        let mut seen = [false; N];
        let mut led_index = 0;
        while led_index < N {
            let (x, y) = map[led_index];
            let x = x as usize;
            let y = y as usize;
            assert!(x < W, "column out of bounds");
            assert!(y < H, "row out of bounds");

            let cell = y * W + x;
            assert!(!seen[cell], "duplicate (col,row) in mapping");
            seen[cell] = true;
            led_index += 1;
        }

        Self { map }
    }

    /// The `(x, y)` of every LED, in wiring order.
    #[must_use]
    pub const fn index_to_xy(&self) -> &[(u16, u16); N] {
        &self.map
    }

    /// Const equality, for compile-time assertions.
    #[must_use]
    pub const fn equals(&self, other: &Self) -> bool {
        let mut led_index = 0;
        while led_index < N {
            if self.map[led_index].0 != other.map[led_index].0
                || self.map[led_index].1 != other.map[led_index].1
            {
                return false;
            }
            led_index += 1;
        }
        true
    }

    /// Rows wired alternately left-to-right and right-to-left, starting at the top-left.
    #[must_use]
    pub const fn serpentine_row_major() -> Self {
        assert!(W * H == N, "W*H must equal N");

        let mut map = [(0_u16, 0_u16); N];
        let mut led_index = 0;
        while led_index < N {
            let y = led_index / W;
            let along_row = led_index % W;
            let x = if y % 2 == 0 { along_row } else { W - 1 - along_row };
            map[led_index] = (x as u16, y as u16);
            led_index += 1;
        }
        Self::new(map)
    }

    /// Columns wired alternately top-to-bottom and bottom-to-top, starting at the top-left.
    #[must_use]
    pub const fn serpentine_column_major() -> Self {
        assert!(W * H == N, "W*H must equal N");

        let mut map = [(0_u16, 0_u16); N];
        let mut led_index = 0;
        while led_index < N {
            let x = led_index / H;
            let along_column = led_index % H;
            let y = if x % 2 == 0 {
                along_column
            } else {
                H - 1 - along_column
            };
            map[led_index] = (x as u16, y as u16);
            led_index += 1;
        }
        Self::new(map)
    }

    /// Rotate the tile a quarter turn clockwise.
    #[must_use]
    pub const fn rotate_cw(self) -> LedLayout<N, H, W> {
        let mut map = [(0u16, 0u16); N];
        let mut led_index = 0;
        while led_index < N {
            let (x, y) = self.map[led_index];
            map[led_index] = ((H - 1 - y as usize) as u16, x);
            led_index += 1;
        }
        LedLayout::<N, H, W>::new(map)
    }

    /// Rotate the tile a quarter turn counter-clockwise.
    #[must_use]
    pub const fn rotate_ccw(self) -> LedLayout<N, H, W> {
        let mut map = [(0u16, 0u16); N];
        let mut led_index = 0;
        while led_index < N {
            let (x, y) = self.map[led_index];
            map[led_index] = (y, (W - 1 - x as usize) as u16);
            led_index += 1;
        }
        LedLayout::<N, H, W>::new(map)
    }

    /// Rotate the tile half a turn.
    #[must_use]
    pub const fn rotate_180(self) -> Self {
        self.flip_h().flip_v()
    }

    /// Mirror left-right.
    #[must_use]
    pub const fn flip_h(self) -> Self {
        let mut map = [(0u16, 0u16); N];
        let mut led_index = 0;
        while led_index < N {
            let (x, y) = self.map[led_index];
            map[led_index] = ((W - 1 - x as usize) as u16, y);
            led_index += 1;
        }
        Self::new(map)
    }

    /// Mirror top-bottom.
    #[must_use]
    pub const fn flip_v(self) -> Self {
        let mut map = [(0u16, 0u16); N];
        let mut led_index = 0;
        while led_index < N {
            let (x, y) = self.map[led_index];
            map[led_index] = (x, (H - 1 - y as usize) as u16);
            led_index += 1;
        }
        Self::new(map)
    }

    /// Chain `next` after this tile on the same strip, stacked on top of it.
    ///
    /// LEDs of `self` keep their indices and move down by `H2` rows; `next` follows.
    /// This is how a strip of several matrices is described when it climbs the wall.
    #[must_use]
    pub const fn stack_above<const N2: usize, const H2: usize, const OUT_N: usize, const OUT_H: usize>(
        self,
        next: LedLayout<N2, W, H2>,
    ) -> LedLayout<OUT_N, W, OUT_H> {
        assert!(OUT_N == N + N2, "OUT_N must equal N + N2");
        assert!(OUT_H == H + H2, "OUT_H must equal H + H2");

        let mut map = [(0u16, 0u16); OUT_N];
        let mut led_index = 0;
        while led_index < N {
            let (x, y) = self.map[led_index];
            map[led_index] = (x, (y as usize + H2) as u16);
            led_index += 1;
        }
        let mut next_index = 0;
        while next_index < N2 {
            map[N + next_index] = next.map[next_index];
            next_index += 1;
        }
        LedLayout::<OUT_N, W, OUT_H>::new(map)
    }
}

// ============================================================================
// WallLayout
// ============================================================================

/// Cached two-way mapping for a `W × H` wall of `S` strips with `L` LEDs each.
#[derive(Clone, Debug)]
pub struct WallLayout<const W: usize, const H: usize, const S: usize, const L: usize> {
    physical: [[(u8, u16); W]; H],
    logical: [[(u16, u16); L]; S],
}

impl<const W: usize, const H: usize, const S: usize, const L: usize> WallLayout<W, H, S, L> {
    /// Serpentine wiring described by `topology`.
    ///
    /// # Panics
    ///
    /// Panics (at compile time in a `const`) if the generic sizes disagree with `topology`.
    #[must_use]
    pub const fn from_topology(topology: StripTopology) -> Self {
        assert!(topology.width() == W, "W must equal strip_columns * matrix_width");
        assert!(
            topology.height() == H,
            "H must equal strip_rows * matrices_per_strip * matrix_height"
        );
        assert!(topology.strip_count() == S, "S must equal strip_columns * strip_rows");
        assert!(
            topology.leds_per_strip() == L,
            "L must equal matrices_per_strip * matrix_width * matrix_height"
        );

        let mut strip_map = [(0u16, 0u16); L];
        let mut led_index = 0;
        while led_index < L {
            let (x, y) = topology.serpentine_xy(led_index);
            strip_map[led_index] = (x as u16, y as u16);
            led_index += 1;
        }
        Self::tile(&strip_map, topology.strip_width(), topology.strip_height())
    }

    /// Tile an arbitrary per-strip layout across the wall in strip order.
    #[must_use]
    pub const fn from_strip_layout<const SW: usize, const SH: usize>(
        strip_layout: LedLayout<L, SW, SH>,
    ) -> Self {
        Self::tile(strip_layout.index_to_xy(), SW, SH)
    }

    const fn tile(strip_map: &[(u16, u16); L], strip_width: usize, strip_height: usize) -> Self {
        assert!(S > 0 && S <= u8::MAX as usize, "strip count must fit in u8");
        assert!(L <= u16::MAX as usize, "LEDs per strip must fit in u16");
        assert!(W <= u16::MAX as usize && H <= u16::MAX as usize, "wall must fit in u16");
        assert!(W % strip_width == 0, "W must be a whole number of strip tiles");
        assert!(H % strip_height == 0, "H must be a whole number of strip tiles");
        let strip_columns = W / strip_width;
        let strip_rows = H / strip_height;
        assert!(strip_columns * strip_rows == S, "tiles must match the strip count");

        let mut physical = [[(0u8, 0u16); W]; H];
        let mut logical = [[(0u16, 0u16); L]; S];
        let mut seen = [[false; W]; H];

        let mut strip_index = 0;
        while strip_index < S {
            let origin_x = (strip_index % strip_columns) * strip_width;
            let row_from_bottom = strip_index / strip_columns;
            let origin_y = H - (row_from_bottom + 1) * strip_height;

            let mut led_index = 0;
            while led_index < L {
                let (tile_x, tile_y) = strip_map[led_index];
                let x = origin_x + tile_x as usize;
                let y = origin_y + tile_y as usize;
                assert!(!seen[y][x], "two LEDs map to the same pixel");
                seen[y][x] = true;
                physical[y][x] = (strip_index as u8, led_index as u16);
                logical[strip_index][led_index] = (x as u16, y as u16);
                led_index += 1;
            }
            strip_index += 1;
        }

        Self { physical, logical }
    }

    /// `(strip, led)` that displays buffer pixel `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the wall.
    #[must_use]
    pub fn physical_index(&self, x: usize, y: usize) -> (usize, usize) {
        assert!(x < W, "x must be within width");
        assert!(y < H, "y must be within height");
        let (strip, led) = self.physical[y][x];
        (usize::from(strip), usize::from(led))
    }

    /// Buffer pixel `(x, y)` shown by LED `led` of strip `strip`.
    ///
    /// # Panics
    ///
    /// Panics if `strip` or `led` is out of range.
    #[must_use]
    pub fn logical_xy(&self, strip: usize, led: usize) -> (usize, usize) {
        assert!(strip < S, "strip must be within strip count");
        assert!(led < L, "led must be within LEDs per strip");
        let (x, y) = self.logical[strip][led];
        (usize::from(x), usize::from(y))
    }

    /// Copy `frame` into per-strip arrays in wiring order.
    pub fn remap(&self, frame: &Frame2d<W, H>, strips: &mut StripColors<S, L>) {
        for (strip_colors, strip_xy) in strips.iter_mut().zip(&self.logical) {
            for (color, &(x, y)) in strip_colors.iter_mut().zip(strip_xy) {
                *color = frame.0[usize::from(y)][usize::from(x)];
            }
        }
    }
}
