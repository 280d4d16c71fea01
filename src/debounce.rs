//! Per-pin debounce and edge detection over the sampled input bytes.

use crate::config::{DEFAULT_DEBOUNCE_CYCLES, PINS_PER_REGISTER};

/// Debounce state of a single input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PinDebounce {
    /// Last level accepted for this pin. Updated as soon as a change is seen.
    pub stable: bool,
    /// Scan cycles left before the change is confirmed; 0 means settled.
    pub countdown: u16,
}

/// Debounce state vector for up to `N` input registers.
///
/// A change is taken over into the stable value on the cycle it is first
/// seen. With a threshold below 2 it is reported right away; otherwise a
/// countdown of `threshold + 1` is armed and the change is reported on the
/// cycle the countdown reaches 1, provided the pin still reads the stable
/// value then. A pin that flips back inside the window re-arms the countdown
/// with its new value.
#[derive(Debug, Clone)]
pub struct Debouncer<const N: usize> {
    threshold: u8,
    pins: [[PinDebounce; PINS_PER_REGISTER]; N],
}

impl<const N: usize> Default for Debouncer<N> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_CYCLES)
    }
}

impl<const N: usize> Debouncer<N> {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold,
            pins: [[PinDebounce::default(); PINS_PER_REGISTER]; N],
        }
    }

    #[inline]
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Set the debounce window in scan cycles. 0 and 1 disable debouncing.
    #[inline]
    pub fn set_threshold(&mut self, cycles: u8) {
        self.threshold = cycles;
    }

    /// Debounce state of `pin`.
    ///
    /// # Panics
    ///
    /// Panics if `pin >= N * 8`.
    #[inline]
    pub fn pin(&self, pin: usize) -> PinDebounce {
        self.pins[pin / PINS_PER_REGISTER][pin % PINS_PER_REGISTER]
    }

    /// Run one debounce pass over the first `pin_count` pins of `inputs`.
    ///
    /// `notify` is called synchronously with `(pin, value)` for every
    /// confirmed change, in ascending pin order.
    pub fn update<F>(&mut self, inputs: &[u8], pin_count: usize, mut notify: F)
    where
        F: FnMut(u8, bool),
    {
        let immediate = self.threshold < 2;
        let armed = u16::from(self.threshold) + 1;

        for pin in 0..pin_count {
            let value = input_bit(inputs, pin);
            let state = &mut self.pins[pin / PINS_PER_REGISTER][pin % PINS_PER_REGISTER];

            if state.stable != value {
                state.stable = value;

                if immediate {
                    notify(pin as u8, value);
                    continue;
                }

                state.countdown = armed;
            }

            if state.countdown > 0 {
                state.countdown -= 1;
            }

            // Re-read: only a level that still matches at expiry is reported.
            if state.countdown == 1 {
                let value = input_bit(inputs, pin);
                if state.stable == value {
                    notify(pin as u8, value);
                }
            }
        }
    }
}

#[inline]
fn input_bit(inputs: &[u8], pin: usize) -> bool {
    (inputs[pin / PINS_PER_REGISTER] >> (pin % PINS_PER_REGISTER)) & 1 == 1
}
