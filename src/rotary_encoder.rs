//! Quadrature rotary encoders with a push switch.
//!
//! A task per encoder ([`rotary_encoder_loop`]) waits on GPIO edges, decodes them, and
//! publishes through atomics in a [`RotaryEncoder`]. The render task polls the counter
//! and the switch once per frame.
//!
//! ```text
//! trail = (previous A, previous B, A, B)
//!
//!   +1: 0001 0111 1110 1000
//!   -1: 0010 1011 1101 0100
//!    0: anything else (no change or a skipped state)
//! ```

use portable_atomic::{AtomicI32, AtomicU8, Ordering};

#[cfg(not(feature = "host"))]
use embassy_futures::select::{Either, select};
#[cfg(not(feature = "host"))]
use embassy_rp::gpio::{Input, Pull};
#[cfg(not(feature = "host"))]
use embassy_rp::{Peri, gpio::Pin};
#[cfg(not(feature = "host"))]
use embassy_time::{Duration, Timer};

// ============================================================================
// PressedTo - How the switch is wired
// ============================================================================

/// How the encoder's switch is wired.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PressedTo {
    /// Switch connects the pin to 3.3V; pulled down, reads high when pressed.
    Voltage,
    /// Switch connects the pin to ground; pulled up, reads low when pressed.
    Ground,
}

impl PressedTo {
    /// Whether a raw pin level means pressed.
    #[must_use]
    pub const fn is_pressed(self, level_high: bool) -> bool {
        match self {
            Self::Voltage => level_high,
            Self::Ground => !level_high,
        }
    }
}

/// Last debounced switch transition.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SwitchState {
    /// Not pressed (also the state before any edge).
    #[default]
    Released = 0,
    /// Held down.
    Pressed = 1,
}

// ============================================================================
// Decoders
// ============================================================================

/// Turns successive A/B levels into detent steps.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct QuadratureDecoder {
    trail: u8,
}

impl QuadratureDecoder {
    /// Start from the current A/B levels so the first edge decodes correctly.
    #[must_use]
    pub const fn new(a: bool, b: bool) -> Self {
        Self {
            trail: ((a as u8) << 1) | b as u8,
        }
    }

    /// Feed the levels after an edge; returns +1, -1, or 0.
    pub const fn update(&mut self, a: bool, b: bool) -> i32 {
        self.trail = ((self.trail << 2) | ((a as u8) << 1) | b as u8) & 0xF;
        match self.trail {
            0b0001 | 0b0111 | 0b1110 | 0b1000 => 1,
            0b0010 | 0b1011 | 0b1101 | 0b0100 => -1,
            _ => 0,
        }
    }
}

/// Turns successive pressed levels into switch transitions.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SwitchDecoder {
    trail: u8,
}

impl SwitchDecoder {
    /// Start from the current pressed level.
    #[must_use]
    pub const fn new(pressed: bool) -> Self {
        Self {
            trail: pressed as u8,
        }
    }

    /// Feed a sampled level; returns the transition, if any.
    pub const fn update(&mut self, pressed: bool) -> Option<SwitchState> {
        self.trail = ((self.trail << 1) | pressed as u8) & 0b11;
        match self.trail {
            0b01 => Some(SwitchState::Pressed),
            0b10 => Some(SwitchState::Released),
            _ => None,
        }
    }
}

// ============================================================================
// RotaryEncoder - shared state
// ============================================================================

/// Counter and switch state shared between an encoder task and its readers.
///
/// Create it in a `static`.
#[derive(Debug)]
pub struct RotaryEncoder {
    counter: AtomicI32,
    switch_state: AtomicU8,
}

impl RotaryEncoder {
    /// Zero counter, switch released.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicI32::new(0),
            switch_state: AtomicU8::new(SwitchState::Released as u8),
        }
    }

    /// Steps since the last call, clockwise positive. Resets the count.
    pub fn fetch_delta(&self) -> i32 {
        self.counter.swap(0, Ordering::AcqRel)
    }

    /// The most recent switch transition.
    #[must_use]
    pub fn fetch_switch_state(&self) -> SwitchState {
        match self.switch_state.load(Ordering::Acquire) {
            1 => SwitchState::Pressed,
            _ => SwitchState::Released,
        }
    }

    /// Add decoded steps.
    pub fn record_steps(&self, steps: i32) {
        if steps != 0 {
            self.counter.fetch_add(steps, Ordering::AcqRel);
        }
    }

    /// Publish a switch transition.
    pub fn record_switch(&self, state: SwitchState) {
        self.switch_state.store(state as u8, Ordering::Release);
    }
}

impl Default for RotaryEncoder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Hardware loop
// ============================================================================

#[cfg(not(feature = "host"))]
const SWITCH_DEBOUNCE_DELAY: Duration = Duration::from_millis(10);

/// Watch one encoder's pins forever, publishing into `encoder`.
///
/// A and B use pull-ups (common pin to ground). Wrap this in a concrete
/// `#[embassy_executor::task]`.
#[cfg(not(feature = "host"))]
pub async fn rotary_encoder_loop<A: Pin, B: Pin, SW: Pin>(
    a: Peri<'static, A>,
    b: Peri<'static, B>,
    sw: Peri<'static, SW>,
    pressed_to: PressedTo,
    encoder: &'static RotaryEncoder,
) -> ! {
    let switch_pull = match pressed_to {
        PressedTo::Voltage => Pull::Down,
        PressedTo::Ground => Pull::Up,
    };
    let mut a = Input::new(a, Pull::Up);
    let mut b = Input::new(b, Pull::Up);
    let mut sw = Input::new(sw, switch_pull);

    match select(
        rotation_loop(&mut a, &mut b, encoder),
        switch_loop(&mut sw, pressed_to, encoder),
    )
    .await
    {
        Either::First(never) | Either::Second(never) => never,
    }
}

#[cfg(not(feature = "host"))]
async fn rotation_loop(a: &mut Input<'_>, b: &mut Input<'_>, encoder: &RotaryEncoder) -> ! {
    let mut decoder = QuadratureDecoder::new(a.is_high(), b.is_high());
    loop {
        select(a.wait_for_any_edge(), b.wait_for_any_edge()).await;
        let steps = decoder.update(a.is_high(), b.is_high());
        encoder.record_steps(steps);
    }
}

#[cfg(not(feature = "host"))]
async fn switch_loop(sw: &mut Input<'_>, pressed_to: PressedTo, encoder: &RotaryEncoder) -> ! {
    let mut decoder = SwitchDecoder::new(pressed_to.is_pressed(sw.is_high()));
    loop {
        sw.wait_for_any_edge().await;
        Timer::after(SWITCH_DEBOUNCE_DELAY).await;
        if let Some(state) = decoder.update(pressed_to.is_pressed(sw.is_high())) {
            debug!("encoder switch {}", state as u8);
            encoder.record_switch(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Clockwise Gray sequence starting from 00: 00 -> 01 -> 11 -> 10 -> 00
    const CLOCKWISE: [(bool, bool); 4] = [(false, true), (true, true), (true, false), (false, false)];

    #[test]
    fn clockwise_counts_up() {
        let mut decoder = QuadratureDecoder::new(false, false);
        let steps: i32 = CLOCKWISE.iter().map(|&(a, b)| decoder.update(a, b)).sum();
        assert_eq!(steps, 4);
    }

    #[test]
    fn counter_clockwise_counts_down() {
        let mut decoder = QuadratureDecoder::new(false, false);
        let steps: i32 = CLOCKWISE
            .iter()
            .rev()
            .skip(1)
            .chain(core::iter::once(&(false, false)))
            .map(|&(a, b)| decoder.update(a, b))
            .sum();
        assert_eq!(steps, -4);
    }

    #[test]
    fn bounce_and_skips_count_zero() {
        let mut decoder = QuadratureDecoder::new(false, false);
        // same levels again
        assert_eq!(decoder.update(false, false), 0);
        // both lines changed at once
        assert_eq!(decoder.update(true, true), 0);
    }

    #[test]
    fn switch_reports_transitions_only() {
        let mut decoder = SwitchDecoder::new(false);
        assert_eq!(decoder.update(false), None);
        assert_eq!(decoder.update(true), Some(SwitchState::Pressed));
        assert_eq!(decoder.update(true), None);
        assert_eq!(decoder.update(false), Some(SwitchState::Released));
    }

    #[test]
    fn pressed_to_maps_levels() {
        assert!(PressedTo::Ground.is_pressed(false));
        assert!(!PressedTo::Ground.is_pressed(true));
        assert!(PressedTo::Voltage.is_pressed(true));
    }

    #[test]
    fn fetch_delta_resets() {
        let encoder = RotaryEncoder::new();
        encoder.record_steps(3);
        encoder.record_steps(-1);
        assert_eq!(encoder.fetch_delta(), 2);
        assert_eq!(encoder.fetch_delta(), 0);

        assert_eq!(encoder.fetch_switch_state(), SwitchState::Released);
        encoder.record_switch(SwitchState::Pressed);
        assert_eq!(encoder.fetch_switch_state(), SwitchState::Pressed);
    }
}
