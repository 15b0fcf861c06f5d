//! Drive a wall of tiled WS2812 LED matrices from a Pico.
//!
//! The wall is a rectangular pixel buffer ([`frame::Frame2d`]) that is corrected
//! ([`color`]), remapped onto the wiring order of several strips ([`layout`]),
//! packed into the format the transmitter shifts out ([`bitplane`]) and handed
//! over to the transmission task ([`scheduler`]). [`pipeline::Pipeline`] runs
//! that sequence once per frame.
//!
//! # Glossary
//!
//! - **Strip:** one serial chain of WS2812 LEDs driven by one data pin.
//! - **Matrix:** a 16×16 panel; a strip chains one or more of them.
//! - **Bit plane:** a byte holding the same color bit for every strip, so one
//!   DMA stream can drive all strips in lock-step.
//! - **Reset window:** the low period (≥ 80 µs) that latches a WS2812 frame.
//! - **PIO ([Programmable I/O](https://medium.com/data-science/nine-pico-pio-wats-with-rust-part-1-9d062067dc25)):** Pico 1 has 2. Pico 2 has 3.
//! - **DMA ([Direct Memory Access](https://en.wikipedia.org/wiki/Direct_memory_access)):** Both Pico 1 and 2 have 12 channels.
#![cfg_attr(not(feature = "host"), no_std)]
#![allow(async_fn_in_trait, reason = "single-threaded embedded")]

// Compile-time checks: exactly one board must be selected (unless testing with host feature)
#[cfg(all(not(any(feature = "pico1", feature = "pico2")), not(feature = "host")))]
compile_error!("Must enable exactly one board feature: 'pico1' or 'pico2'");

#[cfg(all(feature = "pico1", feature = "pico2"))]
compile_error!("Cannot enable both 'pico1' and 'pico2' features simultaneously");

#[cfg(all(not(feature = "arm"), not(feature = "host")))]
compile_error!("Must enable the 'arm' architecture feature");

// Must come first so the logging macros are visible to every module below.
#[macro_use]
mod fmt;

pub mod bitplane;
pub mod color;
mod error;
pub mod frame;
pub mod layout;
pub mod pipeline;
pub mod pong;
pub mod rotary_encoder;
pub mod scheduler;
pub mod telemetry;
#[cfg(feature = "host")]
pub mod to_png;
pub mod transmitter;

// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};
