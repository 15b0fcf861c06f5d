//! Per-frame color correction: a gamma lookup followed by temporal dithering.
//!
//! Both steps are optional per frame and are selected with [`ColorOptions`]. Gamma
//! always runs first, so the dither carries the rounding error of the corrected value.
//!
//! The dither is a 1-step temporal error diffusion. For every pixel and channel:
//!
//! ```text
//! sum       = raw + pending_error
//! quantized = sum >> 1
//! error     = sum - (quantized << 1)     // 0 or 1, fed to the same pixel next frame
//! ```
//!
//! The error never moves to a neighbouring pixel.

use smart_leds::RGB8;

use crate::frame::Frame2d;
use crate::{Error, Result};

/// Gamma used by [`GammaTable::default`].
pub const DEFAULT_GAMMA: f32 = 2.8;

/// 256-entry gamma lookup: `round(255 * (input / 255) ^ gamma)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GammaTable([u8; 256]);

impl GammaTable {
    /// Build the table for `gamma`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGamma`] if `gamma` is not finite or not positive.
    pub fn new(gamma: f32) -> Result<Self> {
        if !gamma.is_finite() || gamma <= 0.0 {
            return Err(Error::InvalidGamma);
        }
        let mut table = [0u8; 256];
        for (input, output) in (0u8..=255).zip(table.iter_mut()) {
            let normalized = f32::from(input) / 255.0;
            *output = (libm::powf(normalized, gamma) * 255.0 + 0.5) as u8;
        }
        Ok(Self(table))
    }

    /// The identity table (gamma 1.0).
    #[must_use]
    pub const fn linear() -> Self {
        let mut table = [0u8; 256];
        let mut index = 0;
        while index < 256 {
            table[index] = index as u8;
            index += 1;
        }
        Self(table)
    }

    /// Look up one channel value.
    #[must_use]
    pub const fn correct(&self, value: u8) -> u8 {
        self.0[value as usize]
    }

    /// The raw lookup table.
    #[must_use]
    pub const fn as_array(&self) -> &[u8; 256] {
        &self.0
    }
}

impl Default for GammaTable {
    fn default() -> Self {
        Self::new(DEFAULT_GAMMA).unwrap_or_else(|_| Self::linear())
    }
}

/// Per-frame color processing switches.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ColorOptions {
    /// Apply the gamma table.
    pub gamma: bool,
    /// Apply temporal dithering.
    pub dither: bool,
}

impl Default for ColorOptions {
    fn default() -> Self {
        Self {
            gamma: true,
            dither: true,
        }
    }
}

/// Dither state carried from frame to frame.
///
/// `pending_error` holds 0 or 1 per channel; `quantized` is the output of the most
/// recent dither pass.
#[derive(Clone, Debug)]
pub struct DitherState<const W: usize, const H: usize> {
    pending_error: Frame2d<W, H>,
    quantized: Frame2d<W, H>,
}

impl<const W: usize, const H: usize> DitherState<W, H> {
    /// Start with no pending error.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending_error: Frame2d::new(),
            quantized: Frame2d::new(),
        }
    }

    /// Quantize `frame` into the internal grid and return it.
    pub fn step(&mut self, frame: &Frame2d<W, H>) -> &Frame2d<W, H> {
        let rows = frame
            .iter()
            .zip(self.pending_error.iter_mut())
            .zip(self.quantized.iter_mut());
        for ((raw_row, error_row), out_row) in rows {
            let pixels = raw_row.iter().zip(error_row.iter_mut()).zip(out_row.iter_mut());
            for ((raw, error), out) in pixels {
                *out = RGB8::new(
                    dither_channel(raw.r, &mut error.r),
                    dither_channel(raw.g, &mut error.g),
                    dither_channel(raw.b, &mut error.b),
                );
            }
        }
        &self.quantized
    }

    /// Error waiting to be added to pixel `(x, y)` on the next frame.
    #[must_use]
    pub fn pending_error(&self, x: usize, y: usize) -> RGB8 {
        self.pending_error[(x, y)]
    }
}

impl<const W: usize, const H: usize> Default for DitherState<W, H> {
    fn default() -> Self {
        Self::new()
    }
}

fn dither_channel(raw: u8, pending_error: &mut u8) -> u8 {
    let sum = u16::from(raw) + u16::from(*pending_error);
    let quantized = sum >> 1;
    *pending_error = (sum - (quantized << 1)) as u8;
    quantized as u8
}

/// Gamma table plus dither state for one wall.
#[derive(Clone, Debug)]
pub struct ColorProcessor<const W: usize, const H: usize> {
    gamma_table: GammaTable,
    dither: DitherState<W, H>,
}

impl<const W: usize, const H: usize> ColorProcessor<W, H> {
    /// Create a processor around a prebuilt gamma table.
    #[must_use]
    pub const fn new(gamma_table: GammaTable) -> Self {
        Self {
            gamma_table,
            dither: DitherState::new(),
        }
    }

    /// Replace every channel with its gamma-corrected value, in place.
    pub fn apply_gamma(&self, frame: &mut Frame2d<W, H>) {
        for pixel in frame.iter_mut().flatten() {
            *pixel = RGB8::new(
                self.gamma_table.correct(pixel.r),
                self.gamma_table.correct(pixel.g),
                self.gamma_table.correct(pixel.b),
            );
        }
    }

    /// Run one dither step over `frame` and return the quantized result.
    pub fn apply_dither(&mut self, frame: &Frame2d<W, H>) -> &Frame2d<W, H> {
        self.dither.step(frame)
    }

    /// Gamma (optional, in place) then dither (optional) in one call.
    ///
    /// The returned view is what the layout mapper should read: the dithered grid when
    /// dithering is on, otherwise `frame` itself.
    pub fn process<'a>(
        &'a mut self,
        frame: &'a mut Frame2d<W, H>,
        options: ColorOptions,
    ) -> &'a Frame2d<W, H> {
        if options.gamma {
            self.apply_gamma(frame);
        }
        if options.dither {
            self.apply_dither(frame)
        } else {
            frame
        }
    }

    /// The dither state, for inspection.
    #[must_use]
    pub const fn dither_state(&self) -> &DitherState<W, H> {
        &self.dither
    }

    /// The gamma table in use.
    #[must_use]
    pub const fn gamma_table(&self) -> &GammaTable {
        &self.gamma_table
    }
}
