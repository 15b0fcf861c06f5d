//! Two-player Pong on a 48×32 wall of six 16×16 matrices.
//!
//! Wiring: three strips of two matrices each on GPIO 2, 3 and 4, stacked bottom-up.
//! Encoder 1 (A 22, B 26, switch 27) moves the left paddle, encoder 2 (A 19, B 20,
//! switch 21) the right one. Holding switch 1 shows the frame without gamma, holding
//! switch 2 without dithering.
//!
//! `host` is a default feature, so turn the defaults off when building the firmware:
//!
//! ```text
//! cargo run --release --target thumbv6m-none-eabi --no-default-features --features embedded --bin pong_wall
//! ```
//!
//! Add `single-pin` to the features to drive each strip from its own state machine
//! instead of the parallel bit-plane program.
#![no_std]
#![no_main]
#![cfg(not(feature = "host"))]

use core::{convert::Infallible, panic};

use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::{PIN_19, PIN_20, PIN_21, PIN_22, PIN_26, PIN_27, PIO0};
use embassy_rp::pio::{InterruptHandler, Pio};
use embassy_rp::Peri;
use embassy_time::Instant;
use led_wall::{
    Result,
    bitplane::FrameEncoder,
    color::{ColorOptions, GammaTable},
    layout::{StripTopology, WallLayout},
    pipeline::Pipeline,
    pong::Pong,
    rotary_encoder::{PressedTo, RotaryEncoder, SwitchState, rotary_encoder_loop},
    scheduler::{FrameHandoff, FrameQueue},
    telemetry::FrameRate,
    transmitter::{TransmitBuffer, transmission_loop},
};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

const WIDTH: usize = 48;
const HEIGHT: usize = 32;
const STRIPS: usize = 3;
const LEDS_PER_STRIP: usize = 512;

static WALL: WallLayout<WIDTH, HEIGHT, STRIPS, LEDS_PER_STRIP> =
    WallLayout::from_topology(StripTopology::REFERENCE_WALL);

static LEFT_ENCODER: RotaryEncoder = RotaryEncoder::new();
static RIGHT_ENCODER: RotaryEncoder = RotaryEncoder::new();

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => InterruptHandler<PIO0>;
});

#[cfg(not(feature = "single-pin"))]
type WallTransmitter = led_wall::transmitter::ParallelTransmitter<
    'static,
    PIO0,
    0,
    embassy_rp::peripherals::DMA_CH0,
    STRIPS,
>;

#[cfg(feature = "single-pin")]
type StripDriver<const SM: usize> =
    embassy_rp::pio_programs::ws2812::PioWs2812<'static, PIO0, SM, LEDS_PER_STRIP>;

#[cfg(feature = "single-pin")]
type WallTransmitter = led_wall::transmitter::SinglePinTransmitter<(
    StripDriver<0>,
    StripDriver<1>,
    StripDriver<2>,
)>;

type Buffer = TransmitBuffer<WallTransmitter, STRIPS, LEDS_PER_STRIP>;
type Encoder = <WallTransmitter as led_wall::transmitter::Transmitter<STRIPS, LEDS_PER_STRIP>>::Encoder;
type WallPipeline = Pipeline<WIDTH, HEIGHT, STRIPS, LEDS_PER_STRIP, Encoder>;

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let err = inner_main(spawner).await.unwrap_err();
    panic!("{err}");
}

async fn inner_main(spawner: Spawner) -> Result<Infallible> {
    let p = embassy_rp::init(Default::default());

    static HANDOFF: FrameHandoff<Buffer> = FrameHandoff::new();
    static FRONT: StaticCell<Buffer> = StaticCell::new();
    static BACK: StaticCell<Buffer> = StaticCell::new();
    static PIPELINE: StaticCell<WallPipeline> = StaticCell::new();

    let blank = <Encoder as FrameEncoder<STRIPS, LEDS_PER_STRIP>>::BLANK;
    let buffers = [FRONT.init(blank), BACK.init(blank)];
    let (pipeline, queue) = WallPipeline::new(&WALL, GammaTable::default(), &HANDOFF, buffers)?;
    let pipeline = PIPELINE.init(pipeline);

    let Pio {
        mut common,
        sm0,
        sm1,
        sm2,
        ..
    } = Pio::new(p.PIO0, Irqs);

    #[cfg(not(feature = "single-pin"))]
    let transmitter = {
        let _ = (sm1, sm2);
        let pins = [
            common.make_pio_pin(p.PIN_2),
            common.make_pio_pin(p.PIN_3),
            common.make_pio_pin(p.PIN_4),
        ];
        WallTransmitter::new(&mut common, sm0, p.DMA_CH0, pins)?
    };

    #[cfg(feature = "single-pin")]
    let transmitter = {
        use embassy_rp::pio_programs::ws2812::{PioWs2812, PioWs2812Program};

        let program = PioWs2812Program::new(&mut common);
        WallTransmitter::new((
            PioWs2812::new(&mut common, sm0, p.DMA_CH0, p.PIN_2, &program),
            PioWs2812::new(&mut common, sm1, p.DMA_CH1, p.PIN_3, &program),
            PioWs2812::new(&mut common, sm2, p.DMA_CH2, p.PIN_4, &program),
        ))
    };

    spawner
        .spawn(transmission_task(transmitter, queue))
        .map_err(led_wall::Error::TaskSpawn)?;
    spawner
        .spawn(left_encoder_task(p.PIN_22, p.PIN_26, p.PIN_27))
        .map_err(led_wall::Error::TaskSpawn)?;
    spawner
        .spawn(right_encoder_task(p.PIN_19, p.PIN_20, p.PIN_21))
        .map_err(led_wall::Error::TaskSpawn)?;

    let mut pong = Pong::<WIDTH, HEIGHT>::new();
    let mut frame_rate = FrameRate::new();
    let mut last_frame = Instant::now();

    loop {
        let now = Instant::now();
        let dt_s = (now - last_frame).as_micros() as f32 / 1_000_000.0;
        last_frame = now;

        pong.update(dt_s, LEFT_ENCODER.fetch_delta(), RIGHT_ENCODER.fetch_delta());
        pong.draw(pipeline.frame_mut());

        // Holding a switch turns its correction off.
        let options = ColorOptions {
            gamma: LEFT_ENCODER.fetch_switch_state() == SwitchState::Released,
            dither: RIGHT_ENCODER.fetch_switch_state() == SwitchState::Released,
        };
        let timings = pipeline.render(options).await;

        if let Some(fps) = frame_rate.tick(Instant::now()) {
            let [left, right] = pong.scores();
            defmt::info!("{} fps, score {}:{}", fps, left, right);
            timings.log();
        }
    }
}

#[embassy_executor::task]
async fn transmission_task(transmitter: WallTransmitter, queue: FrameQueue<Buffer>) -> ! {
    transmission_loop::<_, STRIPS, LEDS_PER_STRIP>(transmitter, queue).await
}

#[embassy_executor::task]
async fn left_encoder_task(
    a: Peri<'static, PIN_22>,
    b: Peri<'static, PIN_26>,
    switch: Peri<'static, PIN_27>,
) -> ! {
    rotary_encoder_loop(a, b, switch, PressedTo::Ground, &LEFT_ENCODER).await
}

#[embassy_executor::task]
async fn right_encoder_task(
    a: Peri<'static, PIN_19>,
    b: Peri<'static, PIN_20>,
    switch: Peri<'static, PIN_21>,
) -> ! {
    rotary_encoder_loop(a, b, switch, PressedTo::Ground, &RIGHT_ENCODER).await
}
