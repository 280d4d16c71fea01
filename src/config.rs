/// Default number of register pairs the engine reserves storage for.
pub const DEFAULT_MAX_CHAIN: usize = 4;

/// Pins per shift register (and per register pair, in each direction).
pub const PINS_PER_REGISTER: usize = 8;

/// Default debounce window in scan cycles.
pub const DEFAULT_DEBOUNCE_CYCLES: u8 = 32;

/// Default clock line: 595 SRCLK (11) and 165 CLK (2).
pub const DEFAULT_CLOCK_PIN: u8 = 6;

/// Default latch line: 595 RCLK (12) and 165 SH/LD (1).
pub const DEFAULT_LATCH_PIN: u8 = 7;

/// Default serial-out line: 595 SER (14).
pub const DEFAULT_SERIAL_OUT_PIN: u8 = 8;

/// Default serial-in line: 165 QH (9).
pub const DEFAULT_SERIAL_IN_PIN: u8 = 9;

/// Assignment of the four GPIO roles the chain is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wiring {
    /// Shared shift clock for both register families.
    pub clock: u8,
    /// Latches the 595 outputs and loads the 165 inputs.
    pub latch: u8,
    /// Serial data towards the 595 chain.
    pub serial_out: u8,
    /// Serial data from the 165 chain.
    pub serial_in: u8,
}

impl Wiring {
    pub const fn new(clock: u8, latch: u8, serial_out: u8, serial_in: u8) -> Self {
        Self {
            clock,
            latch,
            serial_out,
            serial_in,
        }
    }
}

impl Default for Wiring {
    fn default() -> Self {
        Self::new(
            DEFAULT_CLOCK_PIN,
            DEFAULT_LATCH_PIN,
            DEFAULT_SERIAL_OUT_PIN,
            DEFAULT_SERIAL_IN_PIN,
        )
    }
}
