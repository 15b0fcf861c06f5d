//! Double-buffer handoff between the render task and the transmission task.
//!
//! Two `&'static mut` transmit buffers circulate between the tasks. The render side
//! holds one and fills it; [`FrameSubmitter::submit`] sends it to the transmission side
//! and gets the other back. A buffer is only ever reachable from one task at a time, so
//! the transmitter can never read a buffer that is being filled.
//!
//! WS2812 strips latch a frame once the line has been low for at least
//! [`WS2812_RESET`]. After the last bit leaves the PIO FIFO the transmission side arms a
//! [`ResetTimer`]; the next `submit` stays suspended until that timer has expired.
//!
//! ```text
//!  render task                         transmission task
//!  -----------                         -----------------
//!  fill A            Filling
//!  submit(A) ------> ReadyToSwap
//!     wait line_free
//!     outgoing <- A ------------------> next_frame() = A     Transmitting
//!     <- B (spare)                      transmit(A)
//!  fill B                               frame_sent(A) -> returned, arm timer   ResetWait
//!  submit(B)                            Timer::at(deadline)
//!     wait line_free <----------------- reset_elapsed() signals line_free      Idle
//!     outgoing <- B
//!     <- A (returned)
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant};
use portable_atomic::{AtomicBool, AtomicU8, Ordering};

use crate::{Error, Result};

/// Minimum low time on the data line before the next frame.
pub const WS2812_RESET: Duration = Duration::from_micros(80);

/// Most recent step of the transmission cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransmissionState {
    /// Line is free; no frame in flight.
    Idle = 0,
    /// The render side is writing its buffer.
    Filling = 1,
    /// A filled buffer is waiting for the line to become free.
    ReadyToSwap = 2,
    /// DMA is draining a buffer into the PIO.
    Transmitting = 3,
    /// The last bit is out; holding the line low for the reset period.
    ResetWait = 4,
}

impl TransmissionState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Filling,
            2 => Self::ReadyToSwap,
            3 => Self::Transmitting,
            4 => Self::ResetWait,
            _ => Self::Idle,
        }
    }
}

/// One-shot deadline for the WS2812 reset window.
///
/// Arming replaces any earlier deadline, so a stale deadline can never expire early.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ResetTimer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl ResetTimer {
    /// A disarmed timer that waits `interval` once armed.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Reset window for a transmitter that needs `drain_time` after the FIFO empties.
    #[must_use]
    pub const fn after_drain(drain_time: Duration) -> Self {
        Self::new(Duration::from_ticks(WS2812_RESET.as_ticks() + drain_time.as_ticks()))
    }

    /// Start (or restart) the window at `now`. Returns the new deadline.
    pub fn arm(&mut self, now: Instant) -> Instant {
        let deadline = now + self.interval;
        self.deadline = Some(deadline);
        deadline
    }

    /// `true` exactly once per arming, the first time `now` reaches the deadline.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// The pending deadline, if armed.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Length of the window.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

/// Static home for the handoff channels and the reset signal.
///
/// Create it in a `static` (or a `StaticCell`) and call [`FrameHandoff::split`] once.
pub struct FrameHandoff<B: 'static> {
    outgoing: Channel<CriticalSectionRawMutex, &'static mut B, 1>,
    returned: Channel<CriticalSectionRawMutex, &'static mut B, 1>,
    line_free: Signal<CriticalSectionRawMutex, ()>,
    state: AtomicU8,
    split: AtomicBool,
}

impl<B: 'static> FrameHandoff<B> {
    /// Create an unsplit handoff.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            outgoing: Channel::new(),
            returned: Channel::new(),
            line_free: Signal::new(),
            state: AtomicU8::new(TransmissionState::Idle as u8),
            split: AtomicBool::new(false),
        }
    }

    /// Hand over both buffers and get the two task-side handles.
    ///
    /// Returns the submitter, the first buffer to fill, and the transmission queue. The
    /// line starts free, so the first `submit` does not wait.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandoffAlreadySplit`] on a second call.
    pub fn split(
        &'static self,
        buffers: [&'static mut B; 2],
    ) -> Result<(FrameSubmitter<B>, &'static mut B, FrameQueue<B>)> {
        if self.split.swap(true, Ordering::AcqRel) {
            return Err(Error::HandoffAlreadySplit);
        }
        let [fillable, spare] = buffers;
        self.set_state(TransmissionState::Idle);
        self.line_free.signal(());
        Ok((
            FrameSubmitter {
                handoff: self,
                queued: None,
                spare: Some(spare),
            },
            fillable,
            FrameQueue { handoff: self },
        ))
    }

    /// The most recent transition.
    #[must_use]
    pub fn state(&self) -> TransmissionState {
        TransmissionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: TransmissionState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl<B: 'static> Default for FrameHandoff<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Render-side handle.
///
/// A buffer passed to [`FrameSubmitter::submit`] stays owned by the submitter (or by the
/// handoff channels) until it comes back, so dropping a `submit` future loses nothing:
/// [`FrameSubmitter::reclaim`] finishes the interrupted handoff.
pub struct FrameSubmitter<B: 'static> {
    handoff: &'static FrameHandoff<B>,
    queued: Option<&'static mut B>,
    spare: Option<&'static mut B>,
}

impl<B: 'static> FrameSubmitter<B> {
    /// Record that the render side has started writing its buffer.
    pub fn begin_fill(&self) {
        self.handoff.set_state(TransmissionState::Filling);
    }

    /// Queue `filled` for transmission and return the buffer to fill next.
    ///
    /// Waits (without spinning) until the previous frame's reset window has elapsed.
    pub async fn submit(&mut self, filled: &'static mut B) -> &'static mut B {
        self.handoff.set_state(TransmissionState::ReadyToSwap);
        self.queued = Some(filled);
        self.reclaim().await
    }

    /// Finish a `submit` whose future was dropped and return the buffer to fill next.
    ///
    /// Only call this while the render side holds no buffer; otherwise it waits for a
    /// buffer that never comes back.
    pub async fn reclaim(&mut self) -> &'static mut B {
        if self.queued.is_some() {
            self.handoff.line_free.wait().await;
            if let Some(filled) = self.queued.take() {
                // The line is only freed after the queue has taken the previous frame,
                // so the slot is empty here.
                if let Err(TrySendError::Full(filled)) = self.handoff.outgoing.try_send(filled) {
                    error!("outgoing slot still full after the reset window");
                    self.handoff.outgoing.send(filled).await;
                }
            }
        }
        match self.spare.take() {
            Some(spare) => spare,
            None => self.handoff.returned.receive().await,
        }
    }

    /// The handoff this submitter belongs to.
    #[must_use]
    pub const fn handoff(&self) -> &'static FrameHandoff<B> {
        self.handoff
    }
}

/// Transmission-side handle.
pub struct FrameQueue<B: 'static> {
    handoff: &'static FrameHandoff<B>,
}

impl<B: 'static> FrameQueue<B> {
    /// Wait for the next submitted buffer.
    pub async fn next_frame(&mut self) -> &'static mut B {
        let buffer = self.handoff.outgoing.receive().await;
        self.handoff.set_state(TransmissionState::Transmitting);
        buffer
    }

    /// Give a drained buffer back and start the reset window at `now`.
    ///
    /// Returns the instant at which [`FrameQueue::reset_elapsed`] will succeed.
    pub async fn frame_sent(
        &mut self,
        buffer: &'static mut B,
        reset_timer: &mut ResetTimer,
        now: Instant,
    ) -> Instant {
        let deadline = reset_timer.arm(now);
        self.handoff.set_state(TransmissionState::ResetWait);
        self.handoff.returned.send(buffer).await;
        deadline
    }

    /// Free the line if the reset window has elapsed at `now`.
    ///
    /// Returns `true` when this call released the waiting submitter.
    pub fn reset_elapsed(&mut self, reset_timer: &mut ResetTimer, now: Instant) -> bool {
        if !reset_timer.expire(now) {
            return false;
        }
        self.handoff.set_state(TransmissionState::Idle);
        self.handoff.line_free.signal(());
        true
    }

    /// The handoff this queue belongs to.
    #[must_use]
    pub const fn handoff(&self) -> &'static FrameHandoff<B> {
        self.handoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_timer_fires_once() {
        let mut timer = ResetTimer::new(Duration::from_micros(80));
        assert!(!timer.expire(Instant::from_micros(1_000)));

        let deadline = timer.arm(Instant::from_micros(100));
        assert_eq!(deadline, Instant::from_micros(180));
        assert!(!timer.expire(Instant::from_micros(179)));
        assert!(timer.expire(Instant::from_micros(180)));
        assert!(!timer.expire(Instant::from_micros(500)));
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn rearm_replaces_deadline() {
        let mut timer = ResetTimer::new(Duration::from_micros(80));
        timer.arm(Instant::from_micros(0));
        timer.arm(Instant::from_micros(50));
        assert!(!timer.expire(Instant::from_micros(80)));
        assert!(timer.expire(Instant::from_micros(130)));
    }

    #[test]
    fn reset_window_includes_drain_time() {
        let timer = ResetTimer::after_drain(Duration::from_micros(12));
        assert_eq!(timer.interval(), Duration::from_micros(92));
    }

    #[test]
    fn state_round_trips_through_u8() {
        for state in [
            TransmissionState::Idle,
            TransmissionState::Filling,
            TransmissionState::ReadyToSwap,
            TransmissionState::Transmitting,
            TransmissionState::ResetWait,
        ] {
            assert_eq!(TransmissionState::from_u8(state as u8), state);
        }
    }
}
