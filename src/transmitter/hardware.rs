//! PIO implementations of [`Transmitter`].

use embassy_futures::join::{join, join3, join4};
use embassy_rp::Peri;
use embassy_rp::clocks::clk_sys_freq;
use embassy_rp::dma::Channel;
use embassy_rp::pio::{
    Common, Config, Direction, FifoJoin, Instance, LoadedProgram, Pin, ShiftConfig,
    ShiftDirection, StateMachine,
};
use embassy_rp::pio_programs::ws2812::{PioWs2812, RgbColorOrder};
use embassy_time::Duration;
use fixed::types::U24F8;
use pio::{Assembler, MovDestination, MovOperation, MovSource, OutDestination};
use smart_leds::RGB8;

use super::Transmitter;
use crate::bitplane::{BitPlaneEncoder, BitPlanes, StripColors, StripEncoder};
use crate::{Error, Result};

// WS2812 bit time is 1.25 us at 800 kHz.
const BIT_TIME_NS: u64 = 1_250;

// PIO cycles per bit, split high / data / low.
const T1: u8 = 2;
const T2: u8 = 5;
const T3: u8 = 3;
const CYCLES_PER_BIT: u32 = (T1 + T2 + T3) as u32;

// ============================================================================
// Parallel
// ============================================================================

/// Drives `S` strips from `S` consecutive pins with a single state machine.
pub struct ParallelTransmitter<'d, PIO: Instance, const SM: usize, DMA: Channel, const S: usize> {
    sm: StateMachine<'d, PIO, SM>,
    dma: Peri<'d, DMA>,
}

impl<'d, PIO: Instance, const SM: usize, DMA: Channel, const S: usize>
    ParallelTransmitter<'d, PIO, SM, DMA, S>
{
    /// Load the parallel program and start the state machine.
    ///
    /// `pins[s]` carries strip `s`; the pins must be consecutive GPIOs in that order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PinsNotConsecutive`] if the pins are not consecutive.
    pub fn new(
        common: &mut Common<'d, PIO>,
        mut sm: StateMachine<'d, PIO, SM>,
        dma: Peri<'d, DMA>,
        pins: [Pin<'d, PIO>; S],
    ) -> Result<Self> {
        const { assert!(S > 0 && S <= 8, "parallel output supports 1 to 8 strips") };

        let mut expected = None;
        for pin in &pins {
            let number = pin.pin();
            if expected.is_some_and(|expected| expected != number) {
                return Err(Error::PinsNotConsecutive);
            }
            expected = Some(number.wrapping_add(1));
        }

        let program = load_parallel_program(common);
        let pin_refs: [&Pin<'d, PIO>; S] = core::array::from_fn(|index| &pins[index]);

        let mut cfg = Config::default();
        cfg.use_program(&program, &[]);
        cfg.set_out_pins(&pin_refs);
        sm.set_pin_dirs(Direction::Out, &pin_refs);

        let clock_freq = U24F8::from_num(clk_sys_freq() / 1000);
        let bit_freq = U24F8::from_num(800 * CYCLES_PER_BIT);
        cfg.clock_divider = clock_freq / bit_freq;

        cfg.fifo_join = FifoJoin::TxOnly;
        cfg.shift_out = ShiftConfig {
            auto_fill: true,
            threshold: 8,
            direction: ShiftDirection::Right,
        };

        sm.set_config(&cfg);
        sm.set_enable(true);
        info!("parallel transmitter: {} strips from GPIO {}", S, pins[0].pin());

        Ok(Self { sm, dma })
    }
}

// Every instruction drives all strip pins at once: high, data bit per strip, low.
fn load_parallel_program<'d, PIO: Instance>(common: &mut Common<'d, PIO>) -> LoadedProgram<'d, PIO> {
    let mut assembler: Assembler<32> = Assembler::new();

    let mut wrap_target = assembler.label();
    let mut wrap_source = assembler.label();
    assembler.bind(&mut wrap_target);
    assembler.out(OutDestination::X, 8);
    assembler.mov_with_delay(MovDestination::PINS, MovOperation::Invert, MovSource::NULL, T1 - 1);
    assembler.mov_with_delay(MovDestination::PINS, MovOperation::None, MovSource::X, T2 - 1);
    assembler.mov_with_delay(MovDestination::PINS, MovOperation::None, MovSource::NULL, T3 - 2);
    assembler.bind(&mut wrap_source);

    let program = assembler.assemble_with_wrap(wrap_source, wrap_target);
    common.load_program(&program)
}

impl<PIO: Instance, const SM: usize, DMA: Channel, const S: usize, const L: usize> Transmitter<S, L>
    for ParallelTransmitter<'_, PIO, SM, DMA, S>
{
    type Encoder = BitPlaneEncoder;

    // 8 FIFO entries plus the OSR, one bit time each.
    const DRAIN_TIME: Duration = Duration::from_nanos((8 + 1) * BIT_TIME_NS);

    async fn transmit(&mut self, planes: &BitPlanes<L>) {
        self.sm
            .tx()
            .dma_push(self.dma.reborrow(), planes.as_flattened(), false)
            .await;
    }
}

// ============================================================================
// One state machine per strip
// ============================================================================

/// A single-strip driver that can be written as part of a [`SinglePinTransmitter`].
pub trait StripDriver<const L: usize> {
    /// Write one strip's colors.
    async fn write(&mut self, colors: &[RGB8; L]);
}

impl<PIO: Instance, const SM: usize, const L: usize, ORDER: RgbColorOrder> StripDriver<L>
    for PioWs2812<'_, PIO, SM, L, ORDER>
{
    async fn write(&mut self, colors: &[RGB8; L]) {
        Self::write(self, colors).await;
    }
}

/// Drives each strip with its own driver, all in parallel.
///
/// `D` is a tuple of 2, 3 or 4 [`StripDriver`]s in strip order.
pub struct SinglePinTransmitter<D> {
    drivers: D,
}

impl<D> SinglePinTransmitter<D> {
    /// Wrap a tuple of drivers, strip 0 first.
    pub const fn new(drivers: D) -> Self {
        Self { drivers }
    }
}

// Each driver's own FIFO (8 words) plus its OSR, 24 bits per word.
const SINGLE_PIN_DRAIN_TIME: Duration = Duration::from_nanos((8 + 1) * 24 * BIT_TIME_NS);

macro_rules! single_pin_transmitter {
    ($strips:literal, $join:ident, $(($driver:ident, $index:tt)),+) => {
        impl<const L: usize, $($driver: StripDriver<L>),+> Transmitter<$strips, L>
            for SinglePinTransmitter<($($driver,)+)>
        {
            type Encoder = StripEncoder;

            const DRAIN_TIME: Duration = SINGLE_PIN_DRAIN_TIME;

            async fn transmit(&mut self, strips: &StripColors<$strips, L>) {
                $join($(self.drivers.$index.write(&strips[$index])),+).await;
            }
        }
    };
}

single_pin_transmitter!(2, join, (A, 0), (B, 1));
single_pin_transmitter!(3, join3, (A, 0), (B, 1), (C, 2));
single_pin_transmitter!(4, join4, (A, 0), (B, 1), (C, 2), (D, 3));
