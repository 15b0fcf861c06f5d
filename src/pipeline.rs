//! The render side of the wall: draw, correct, remap, encode, submit.
//!
//! [`Pipeline`] owns everything the render task touches. A frame goes through:
//!
//! ```text
//! frame_mut() --draw--> gamma --> dither --> remap --> encode --> submit
//!                      (optional)  (optional)  WallLayout  FrameEncoder  FrameSubmitter
//! ```
//!
//! `submit` is the only await point; it returns as soon as the previous frame's reset
//! window is over, so drawing the next frame overlaps with transmitting this one.

use embassy_time::Instant;

use crate::Result;
use crate::bitplane::FrameEncoder;
use crate::color::{ColorOptions, ColorProcessor, GammaTable};
use crate::frame::Frame2d;
use crate::layout::{StripColors, WallLayout};
use crate::scheduler::{FrameHandoff, FrameQueue, FrameSubmitter};
use crate::telemetry::FrameTimings;

/// Render-side state for a `W × H` wall of `S` strips with `L` LEDs each.
pub struct Pipeline<const W: usize, const H: usize, const S: usize, const L: usize, E>
where
    E: FrameEncoder<S, L>,
{
    layout: &'static WallLayout<W, H, S, L>,
    color: ColorProcessor<W, H>,
    frames: [Frame2d<W, H>; 2],
    active: usize,
    strip_colors: StripColors<S, L>,
    fillable: Option<&'static mut E::Buffer>,
    submitter: FrameSubmitter<E::Buffer>,
}

impl<const W: usize, const H: usize, const S: usize, const L: usize, E> Pipeline<W, H, S, L, E>
where
    E: FrameEncoder<S, L>,
{
    /// Build the pipeline and return it with the queue for the transmission task.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::HandoffAlreadySplit`] if `handoff` is already in use.
    pub fn new(
        layout: &'static WallLayout<W, H, S, L>,
        gamma_table: GammaTable,
        handoff: &'static FrameHandoff<E::Buffer>,
        buffers: [&'static mut E::Buffer; 2],
    ) -> Result<(Self, FrameQueue<E::Buffer>)> {
        let (submitter, fillable, queue) = handoff.split(buffers)?;
        let pipeline = Self {
            layout,
            color: ColorProcessor::new(gamma_table),
            frames: [Frame2d::new(); 2],
            active: 0,
            strip_colors: [[smart_leds::RGB8::default(); L]; S],
            fillable: Some(fillable),
            submitter,
        };
        Ok((pipeline, queue))
    }

    /// The pixel buffer to draw this frame into.
    pub fn frame_mut(&mut self) -> &mut Frame2d<W, H> {
        &mut self.frames[self.active]
    }

    /// The most recently rendered frame, after gamma if it was applied.
    #[must_use]
    pub fn last_frame(&self) -> &Frame2d<W, H> {
        &self.frames[self.active ^ 1]
    }

    /// Per-strip colors of the most recent render, in wiring order.
    #[must_use]
    pub const fn strip_colors(&self) -> &StripColors<S, L> {
        &self.strip_colors
    }

    /// The color processor, for inspecting dither state.
    #[must_use]
    pub const fn color_processor(&self) -> &ColorProcessor<W, H> {
        &self.color
    }

    /// Process and submit the current frame, then start a cleared one.
    ///
    /// Waits only inside `submit`, until the previous frame's reset window is over.
    /// If a `render` future is dropped while waiting, its frame is still sent by the
    /// next call, and the drawing buffer is neither swapped nor cleared.
    pub async fn render(&mut self, options: ColorOptions) -> FrameTimings {
        let mut timings = FrameTimings::default();
        let fillable = match self.fillable.take() {
            Some(fillable) => fillable,
            None => {
                warn!("previous render was interrupted; finishing its submit");
                self.submitter.reclaim().await
            }
        };
        self.submitter.begin_fill();

        let frame = &mut self.frames[self.active];

        let start = Instant::now();
        if options.gamma {
            self.color.apply_gamma(frame);
        }
        let gamma_done = Instant::now();

        let processed: &Frame2d<W, H> = if options.dither {
            self.color.apply_dither(frame)
        } else {
            frame
        };
        let dither_done = Instant::now();

        self.layout.remap(processed, &mut self.strip_colors);
        let remap_done = Instant::now();

        E::encode(&self.strip_colors, fillable);
        let encode_done = Instant::now();

        self.fillable = Some(self.submitter.submit(fillable).await);
        let submit_done = Instant::now();

        timings.gamma = gamma_done - start;
        timings.dither = dither_done - gamma_done;
        timings.remap = remap_done - dither_done;
        timings.encode = encode_done - remap_done;
        timings.wait = submit_done - encode_done;

        self.active ^= 1;
        self.frames[self.active].clear();
        timings
    }
}
