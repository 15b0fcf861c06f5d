//! The transmission side of the wall: the [`Transmitter`] trait and the loop that feeds it.
//!
//! Two interchangeable ways to put a frame on the wire, picked by type (hardware builds):
//!
//! - [`ParallelTransmitter`]: one state machine drives every strip from consecutive
//!   GPIOs, fed bit planes by a single DMA channel.
//! - [`SinglePinTransmitter`]: one `embassy_rp` `PioWs2812` per strip, written
//!   concurrently.
//!
//! [`transmission_loop`] runs either one against a [`FrameQueue`].

use embassy_time::{Duration, Instant, Timer};

use crate::bitplane::FrameEncoder;
use crate::scheduler::{FrameQueue, ResetTimer};

// PIO transmitters need embassy_rp and are excluded when testing on host
#[cfg(not(feature = "host"))]
mod hardware;
#[cfg(not(feature = "host"))]
pub use hardware::{ParallelTransmitter, SinglePinTransmitter, StripDriver};

/// Transmit buffer type consumed by `T`.
pub type TransmitBuffer<T, const S: usize, const L: usize> =
    <<T as Transmitter<S, L>>::Encoder as FrameEncoder<S, L>>::Buffer;

/// Puts one encoded frame on the wire.
pub trait Transmitter<const S: usize, const L: usize> {
    /// Encoder producing the buffer this transmitter reads.
    type Encoder: FrameEncoder<S, L>;

    /// Time from the end of DMA until the last bit has left the pin.
    const DRAIN_TIME: Duration;

    /// Push `buffer` out. Returns once DMA has delivered the last word.
    async fn transmit(&mut self, buffer: &<Self::Encoder as FrameEncoder<S, L>>::Buffer);
}

// ============================================================================
// Loop
// ============================================================================

/// Transmit every submitted frame, honouring the reset window between frames.
///
/// Run this in its own task; wrap it in a concrete `#[embassy_executor::task]`.
pub async fn transmission_loop<T, const S: usize, const L: usize>(
    mut transmitter: T,
    mut queue: FrameQueue<TransmitBuffer<T, S, L>>,
) -> !
where
    T: Transmitter<S, L>,
{
    let mut reset_timer = ResetTimer::after_drain(T::DRAIN_TIME);
    info!(
        "transmission loop started, reset window {} us",
        reset_timer.interval().as_micros()
    );

    loop {
        let buffer = queue.next_frame().await;
        transmitter.transmit(buffer).await;
        let deadline = queue.frame_sent(buffer, &mut reset_timer, Instant::now()).await;
        loop {
            Timer::at(deadline).await;
            if queue.reset_elapsed(&mut reset_timer, Instant::now()) {
                break;
            }
        }
    }
}
