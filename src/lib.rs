//! Bit-banged driver for chained 74HC595 (output) and 74HC165 (input) shift
//! registers sharing one clock line.
//!
//! Four GPIOs drive the whole chain: clock, latch, serial-out and serial-in.
//! Every call to [`ShiftChainIo::run`] latches the outputs, loads the inputs and
//! shifts both directions at once, then debounces the inputs and reports
//! settled changes through a callback.

pub mod config;
pub mod debounce;
pub mod engine;

pub use config::Wiring;
pub use engine::{InputCallback, ShiftChainIo};

/// Logic level of a GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl From<bool> for Level {
    #[inline]
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

impl From<Level> for bool {
    #[inline]
    fn from(level: Level) -> Self {
        level == Level::High
    }
}

/// Direction a GPIO line is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

/// Digital GPIO primitives the driver needs from the host platform.
///
/// Abstracts over real pins (ESP32) and the simulated register chain used on
/// the host, so the engine never cares which one it drives.
/// Operations are infallible: a backend that can fail is expected to report
/// the failure itself and carry on.
pub trait Gpio {
    /// Configure `pin` as an input or an output.
    fn set_direction(&mut self, pin: u8, direction: Direction);

    /// Drive an output `pin` to `level`.
    fn write(&mut self, pin: u8, level: Level);

    /// Sample the current level of `pin`.
    fn read(&mut self, pin: u8) -> Level;
}

#[cfg(target_os = "espidf")]
pub mod esp32;

#[cfg(not(target_os = "espidf"))]
pub mod mock;
