//! Frame timing and rate reporting.

use embassy_time::{Duration, Instant};

/// Time spent in each pipeline stage for one frame.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FrameTimings {
    /// Gamma lookup.
    pub gamma: Duration,
    /// Temporal dither.
    pub dither: Duration,
    /// Pixel buffer to strip order.
    pub remap: Duration,
    /// Strip colors to transmit buffer.
    pub encode: Duration,
    /// Waiting in `submit` for the line to free up.
    pub wait: Duration,
}

impl FrameTimings {
    /// Sum of the stages that do work (everything but `wait`).
    #[must_use]
    pub fn busy(&self) -> Duration {
        self.gamma + self.dither + self.remap + self.encode
    }

    /// Write one log line with every stage in microseconds.
    pub fn log(&self) {
        info!(
            "gamma {} us, dither {} us, remap {} us, encode {} us, wait {} us",
            self.gamma.as_micros(),
            self.dither.as_micros(),
            self.remap.as_micros(),
            self.encode.as_micros(),
            self.wait.as_micros(),
        );
    }
}

/// Counts frames and reports the rate once per second.
#[derive(Clone, Copy, Debug)]
pub struct FrameRate {
    window_start: Option<Instant>,
    frames: u32,
}

impl FrameRate {
    const WINDOW: Duration = Duration::from_secs(1);

    /// Start counting at the first tick.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            window_start: None,
            frames: 0,
        }
    }

    /// Count a frame finished at `now`.
    ///
    /// Returns the frames per second whenever a full second has elapsed since the last
    /// report. The first tick only starts the window.
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        let Some(window_start) = self.window_start else {
            self.window_start = Some(now);
            return None;
        };
        self.frames += 1;

        let elapsed = now - window_start;
        if elapsed < Self::WINDOW {
            return None;
        }
        let fps = (u64::from(self.frames) * 1_000_000 / elapsed.as_micros().max(1)) as u32;
        self.window_start = Some(now);
        self.frames = 0;
        Some(fps)
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_second() {
        let mut rate = FrameRate::new();
        assert_eq!(rate.tick(Instant::from_millis(0)), None);
        for frame in 1..50 {
            assert_eq!(rate.tick(Instant::from_millis(frame * 20)), None);
        }
        assert_eq!(rate.tick(Instant::from_millis(1_000)), Some(50));
        assert_eq!(rate.tick(Instant::from_millis(1_010)), None);
    }

    #[test]
    fn busy_excludes_wait() {
        let timings = FrameTimings {
            gamma: Duration::from_micros(1),
            dither: Duration::from_micros(2),
            remap: Duration::from_micros(3),
            encode: Duration::from_micros(4),
            wait: Duration::from_micros(100),
        };
        assert_eq!(timings.busy(), Duration::from_micros(10));
    }
}
