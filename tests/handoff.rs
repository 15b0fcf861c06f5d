#![allow(missing_docs)]
//! Host-level tests for the double-buffer handoff and reset window.

use core::pin::pin;
use core::task::Poll;
use std::cell::RefCell;

use embassy_futures::select::{Either, select};
use embassy_futures::{block_on, poll_once, yield_now};
use embassy_time::{Duration, Instant};
use led_wall::Error;
use led_wall::bitplane::{FrameEncoder, StripEncoder};
use led_wall::layout::StripColors;
use led_wall::scheduler::{FrameHandoff, ResetTimer, TransmissionState, WS2812_RESET};
use led_wall::transmitter::{Transmitter, transmission_loop};
use smart_leds::RGB8;

type Buffer = [u32; 4];

fn leak_handoff() -> (&'static FrameHandoff<Buffer>, [&'static mut Buffer; 2]) {
    let handoff: &'static FrameHandoff<Buffer> = Box::leak(Box::new(FrameHandoff::new()));
    let first: &'static mut Buffer = Box::leak(Box::new([0; 4]));
    let second: &'static mut Buffer = Box::leak(Box::new([0; 4]));
    (handoff, [first, second])
}

#[test]
fn split_only_once() -> Result<(), Error> {
    let (handoff, buffers) = leak_handoff();
    let _parts = handoff.split(buffers)?;
    let (_, again) = leak_handoff();
    assert!(matches!(handoff.split(again), Err(Error::HandoffAlreadySplit)));
    Ok(())
}

#[test]
fn first_submit_does_not_wait() -> Result<(), Error> {
    let (handoff, buffers) = leak_handoff();
    let (mut submitter, fillable, _queue) = handoff.split(buffers)?;
    assert_eq!(handoff.state(), TransmissionState::Idle);

    let submit = pin!(submitter.submit(fillable));
    assert!(poll_once(submit).is_ready());
    assert_eq!(handoff.state(), TransmissionState::ReadyToSwap);
    Ok(())
}

#[test]
fn second_submit_waits_for_reset_window() -> Result<(), Error> {
    let (handoff, buffers) = leak_handoff();
    let (mut submitter, fillable, mut queue) = handoff.split(buffers)?;
    let mut reset_timer = ResetTimer::new(WS2812_RESET);

    fillable[0] = 1;
    let next = block_on(submitter.submit(fillable));

    let sent = block_on(queue.next_frame());
    assert_eq!(sent[0], 1);
    assert_eq!(handoff.state(), TransmissionState::Transmitting);

    let dma_done = Instant::from_micros(10_000);
    let deadline = block_on(queue.frame_sent(sent, &mut reset_timer, dma_done));
    assert_eq!(deadline, dma_done + WS2812_RESET);
    assert_eq!(handoff.state(), TransmissionState::ResetWait);

    next[0] = 2;
    let mut second = pin!(submitter.submit(next));
    assert!(poll_once(second.as_mut()).is_pending());

    // One tick before the deadline the line is still held low.
    assert!(!queue.reset_elapsed(&mut reset_timer, Instant::from_micros(10_079)));
    assert!(poll_once(second.as_mut()).is_pending());

    assert!(queue.reset_elapsed(&mut reset_timer, Instant::from_micros(10_080)));
    assert_eq!(handoff.state(), TransmissionState::Idle);
    let Poll::Ready(returned) = poll_once(second.as_mut()) else {
        panic!("submit must complete once the reset window has elapsed");
    };
    // The drained first buffer comes back for filling.
    assert_eq!(returned[0], 1);

    let in_flight = block_on(queue.next_frame());
    assert_eq!(in_flight[0], 2);
    Ok(())
}

#[test]
fn stale_deadline_cannot_release_early() -> Result<(), Error> {
    let (handoff, buffers) = leak_handoff();
    let (mut submitter, fillable, mut queue) = handoff.split(buffers)?;
    let mut reset_timer = ResetTimer::new(Duration::from_micros(100));

    let next = block_on(submitter.submit(fillable));
    let sent = block_on(queue.next_frame());
    block_on(queue.frame_sent(sent, &mut reset_timer, Instant::from_micros(0)));
    // Re-armed before the first deadline.
    reset_timer.arm(Instant::from_micros(50));

    let mut second = pin!(submitter.submit(next));
    assert!(!queue.reset_elapsed(&mut reset_timer, Instant::from_micros(100)));
    assert!(poll_once(second.as_mut()).is_pending());
    assert!(queue.reset_elapsed(&mut reset_timer, Instant::from_micros(150)));
    assert!(poll_once(second.as_mut()).is_ready());
    Ok(())
}

#[test]
fn transmit_side_never_sees_the_buffer_being_filled() -> Result<(), Error> {
    let (handoff, buffers) = leak_handoff();
    let (mut submitter, mut fillable, mut queue) = handoff.split(buffers)?;
    let mut reset_timer = ResetTimer::new(WS2812_RESET);
    let mut now = Instant::from_micros(0);

    for frame in 1..=32u32 {
        fillable.fill(frame);
        let filling_addr: *const Buffer = &raw const *fillable;

        let mut submit = pin!(submitter.submit(fillable));
        let next = loop {
            if let Poll::Ready(next) = poll_once(submit.as_mut()) {
                break next;
            }
            // Render side is blocked: let the transmit side finish the previous frame.
            now += Duration::from_micros(100);
            assert!(queue.reset_elapsed(&mut reset_timer, now));
        };

        let sent = block_on(queue.next_frame());
        assert_eq!(*sent, [frame; 4]);
        assert!(core::ptr::eq(&*sent, filling_addr));
        assert!(!core::ptr::eq(&*sent, &*next));

        now += Duration::from_micros(500);
        block_on(queue.frame_sent(sent, &mut reset_timer, now));
        fillable = next;
    }
    Ok(())
}

/// Records the red value of LED 0 and the time each frame went out.
struct RecordingTransmitter<'a> {
    sent: &'a RefCell<Vec<(u8, Instant)>>,
}

impl Transmitter<1, 2> for RecordingTransmitter<'_> {
    type Encoder = StripEncoder;

    const DRAIN_TIME: Duration = Duration::from_micros(20);

    async fn transmit(&mut self, strips: &StripColors<1, 2>) {
        self.sent.borrow_mut().push((strips[0][0].r, Instant::now()));
    }
}

#[test]
fn transmission_loop_spaces_frames_by_the_reset_window() -> Result<(), Error> {
    const FRAMES: u8 = 4;
    let handoff: &'static FrameHandoff<StripColors<1, 2>> = Box::leak(Box::new(FrameHandoff::new()));
    let blank = <StripEncoder as FrameEncoder<1, 2>>::BLANK;
    let buffers = [Box::leak(Box::new(blank)), Box::leak(Box::new(blank))];
    let (mut submitter, fillable, queue) = handoff.split(buffers)?;

    let sent = RefCell::new(Vec::new());
    let transmitter = RecordingTransmitter { sent: &sent };
    let render = async {
        let mut fillable = fillable;
        for frame in 1..=FRAMES {
            fillable[0][0] = RGB8::new(frame, 0, 0);
            fillable = submitter.submit(fillable).await;
        }
        while sent.borrow().len() < usize::from(FRAMES) {
            yield_now().await;
        }
    };

    match block_on(select(transmission_loop::<_, 1, 2>(transmitter, queue), render)) {
        Either::First(never) => never,
        Either::Second(()) => {}
    }

    let sent = sent.into_inner();
    let order: Vec<u8> = sent.iter().map(|&(frame, _)| frame).collect();
    assert_eq!(order, [1, 2, 3, 4]);
    let reset_window = WS2812_RESET + Duration::from_micros(20);
    for pair in sent.windows(2) {
        assert!(pair[1].1 - pair[0].1 >= reset_window);
    }
    Ok(())
}
