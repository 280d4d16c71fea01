use crate::config::{DEFAULT_MAX_CHAIN, PINS_PER_REGISTER, Wiring};
use crate::debounce::Debouncer;
use crate::{Direction, Gpio, Level};

/// Notification for a settled input change, called with `(pin, value)`.
pub type InputCallback = Box<dyn FnMut(u8, bool)>;

/// Scan-and-debounce engine for a chain of 595/165 register pairs.
///
/// Owns the wiring, the output and input bytes of every register and the
/// debounce state of every input pin. Storage is reserved for `N` pairs;
/// only the first [`chain_length`](Self::chain_length) are shifted and
/// debounced.
///
/// # Index contract
///
/// Register indices below `N` and pin indices below `N * 8` are always
/// accepted, even past the active chain length: they address reserved
/// storage that is transmitted once the chain is extended. Anything at or
/// beyond `N` registers is a caller bug and panics.
///
/// # Threading
///
/// The engine is single-owner. Writes to the outputs must come from the same
/// context that calls [`run`](Self::run), or be serialized by the caller.
pub struct ShiftChainIo<G, const N: usize = DEFAULT_MAX_CHAIN> {
    gpio: G,
    wiring: Wiring,
    chain_length: usize,
    outputs: [u8; N],
    inputs: [u8; N],
    debouncer: Debouncer<N>,
    on_change: Option<InputCallback>,
    initialized: bool,
}

impl<G, const N: usize> std::fmt::Debug for ShiftChainIo<G, N>
where
    G: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShiftChainIo")
            .field("gpio", &self.gpio)
            .field("wiring", &self.wiring)
            .field("chain_length", &self.chain_length)
            .field("outputs", &self.outputs)
            .field("inputs", &self.inputs)
            .field("debouncer", &self.debouncer)
            .field("has_callback", &self.on_change.is_some())
            .finish()
    }
}

impl<G: Gpio> ShiftChainIo<G> {
    /// Creates an engine with the default pin assignment and chain capacity.
    #[inline]
    pub fn with_default_wiring(gpio: G) -> Self {
        Self::new(gpio, Wiring::default())
    }
}

impl<G: Gpio, const N: usize> ShiftChainIo<G, N> {
    /// Creates an engine driving `wiring` through `gpio`.
    ///
    /// The chain starts with one register pair and the default debounce
    /// window. No line is touched until [`initialize`](Self::initialize).
    pub fn new(gpio: G, wiring: Wiring) -> Self {
        const {
            assert!(N >= 1 && N * PINS_PER_REGISTER <= 256, "chain capacity must be 1..=32");
        }

        Self {
            gpio,
            wiring,
            chain_length: 1,
            outputs: [0; N],
            inputs: [0; N],
            debouncer: Debouncer::default(),
            on_change: None,
            initialized: false,
        }
    }

    /// Configures the four lines and stores the change notification.
    ///
    /// Clock, latch and serial-out become outputs idling high; serial-in
    /// becomes an input. Without a callback no debouncing is performed.
    pub fn initialize(&mut self, on_change: Option<InputCallback>) {
        self.on_change = on_change;

        let Wiring {
            clock,
            latch,
            serial_out,
            serial_in,
        } = self.wiring;

        self.gpio.set_direction(clock, Direction::Output);
        self.gpio.set_direction(latch, Direction::Output);
        self.gpio.set_direction(serial_out, Direction::Output);
        self.gpio.set_direction(serial_in, Direction::Input);

        self.gpio.write(latch, Level::High);
        self.gpio.write(clock, Level::High);
        self.gpio.write(serial_out, Level::High);

        self.initialized = true;
        log::debug!(
            "shift chain initialized on {:?}, {} pair(s), notifications {}",
            self.wiring,
            self.chain_length,
            if self.on_change.is_some() { "on" } else { "off" }
        );
    }

    /// Replaces the change notification without touching the lines.
    pub fn set_callback(&mut self, on_change: Option<InputCallback>) {
        self.on_change = on_change;
    }

    /// Sets the number of register pairs in use, clamped to `1..=N`.
    ///
    /// Takes effect on the next [`run`](Self::run).
    pub fn set_chain_length(&mut self, pairs: usize) {
        let clamped = pairs.clamp(1, N);
        if clamped != pairs {
            log::debug!("chain length {pairs} clamped to {clamped}");
        }
        self.chain_length = clamped;
    }

    /// Sets the debounce window in scan cycles, for every input pin.
    ///
    /// 0 and 1 report changes on the cycle they are sampled.
    pub fn set_debounce_threshold(&mut self, cycles: u8) {
        self.debouncer.set_threshold(cycles);
    }

    /// Replaces the whole byte of output register `register`.
    ///
    /// Bit `n` drives output `n` of that register.
    ///
    /// # Panics
    ///
    /// Panics if `register >= N`.
    #[inline]
    pub fn set_output_byte(&mut self, register: usize, byte: u8) {
        self.outputs[register] = byte;
    }

    /// Sets output `pin` high or low.
    ///
    /// # Panics
    ///
    /// Panics if `pin >= N * 8`.
    pub fn set_output_pin(&mut self, pin: usize, high: bool) {
        let (register, bit) = split(pin);
        if high {
            self.outputs[register] |= 1 << bit;
        } else {
            self.outputs[register] &= !(1 << bit);
        }
    }

    /// Last sampled level of input `pin`.
    ///
    /// # Panics
    ///
    /// Panics if `pin >= N * 8`.
    #[inline]
    pub fn input_pin(&self, pin: usize) -> bool {
        let (register, bit) = split(pin);
        (self.inputs[register] >> bit) & 1 == 1
    }

    /// Requested level of output `pin`.
    ///
    /// # Panics
    ///
    /// Panics if `pin >= N * 8`.
    #[inline]
    pub fn output_pin(&self, pin: usize) -> bool {
        let (register, bit) = split(pin);
        (self.outputs[register] >> bit) & 1 == 1
    }

    /// # Panics
    ///
    /// Panics if `register >= N`.
    #[inline]
    pub fn output_byte(&self, register: usize) -> u8 {
        self.outputs[register]
    }

    /// # Panics
    ///
    /// Panics if `register >= N`.
    #[inline]
    pub fn input_byte(&self, register: usize) -> u8 {
        self.inputs[register]
    }

    #[inline]
    pub fn chain_length(&self) -> usize {
        self.chain_length
    }

    /// Number of input (and output) pins in the active chain.
    #[inline]
    pub fn pin_count(&self) -> usize {
        self.chain_length * PINS_PER_REGISTER
    }

    #[inline]
    pub fn debounce_threshold(&self) -> u8 {
        self.debouncer.threshold()
    }

    #[inline]
    pub fn wiring(&self) -> Wiring {
        self.wiring
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[inline]
    pub fn debouncer(&self) -> &Debouncer<N> {
        &self.debouncer
    }

    #[inline]
    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    #[inline]
    pub fn gpio_mut(&mut self) -> &mut G {
        &mut self.gpio
    }

    /// Runs one scan cycle.
    ///
    /// 1. Latch low then high: commits the previously shifted outputs and
    ///    loads a fresh snapshot of the inputs.
    /// 2. Shift every active pair, MSB first. Each clock pulse moves one
    ///    output bit out and one input bit in. Output registers are sent last
    ///    to first; input bytes arrive first to last, register 0 being the
    ///    165 next to serial-in.
    /// 3. Debounce the inputs and notify settled changes, if a callback is set.
    ///
    /// Never blocks; the caller picks the scan rate (1 kHz is plenty for
    /// buttons and LEDs).
    pub fn run(&mut self) {
        let Wiring {
            clock,
            latch,
            serial_out,
            serial_in,
        } = self.wiring;

        self.gpio.write(latch, Level::Low);
        self.gpio.write(latch, Level::High);
        self.gpio.write(clock, Level::Low);

        // Outputs go out far end first; inputs arrive near end first.
        for (received, register) in (0..self.chain_length).rev().enumerate() {
            let out = self.outputs[register];
            let mut data_in = 0u8;

            for bit in (0..PINS_PER_REGISTER).rev() {
                self.gpio.write(serial_out, Level::from((out >> bit) & 1 == 1));

                data_in <<= 1;
                if self.gpio.read(serial_in) == Level::High {
                    data_in |= 1;
                }

                self.gpio.write(clock, Level::High);
                self.gpio.write(clock, Level::Low);
            }

            self.inputs[received] = data_in;
        }

        if let Some(on_change) = self.on_change.as_mut() {
            let pin_count = self.chain_length * PINS_PER_REGISTER;
            self.debouncer.update(&self.inputs, pin_count, |pin, value| {
                log::trace!("input {pin} settled {}", if value { "high" } else { "low" });
                on_change(pin, value);
            });
        }
    }
}

#[inline]
fn split(pin: usize) -> (usize, usize) {
    (pin / PINS_PER_REGISTER, pin % PINS_PER_REGISTER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use test_case::test_case;

    /// Records every line operation and answers reads from a queue.
    #[derive(Debug, Default)]
    struct RecordingGpio {
        ops: Vec<Op>,
        reads: Vec<Level>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        Dir(u8, Direction),
        Write(u8, Level),
        Read(u8),
    }

    impl Gpio for RecordingGpio {
        fn set_direction(&mut self, pin: u8, direction: Direction) {
            self.ops.push(Op::Dir(pin, direction));
        }

        fn write(&mut self, pin: u8, level: Level) {
            self.ops.push(Op::Write(pin, level));
        }

        fn read(&mut self, pin: u8) -> Level {
            self.ops.push(Op::Read(pin));
            if self.reads.is_empty() {
                Level::Low
            } else {
                self.reads.remove(0)
            }
        }
    }

    fn engine() -> ShiftChainIo<RecordingGpio> {
        ShiftChainIo::with_default_wiring(RecordingGpio::default())
    }

    fn recorder() -> (Rc<RefCell<Vec<(u8, bool)>>>, InputCallback) {
        let fired = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&fired);
        let callback: InputCallback = Box::new(move |pin, value| sink.borrow_mut().push((pin, value)));
        (fired, callback)
    }

    #[test]
    fn test_initialize_configures_lines() {
        let mut io = engine();
        io.initialize(None);

        assert!(io.is_initialized());
        assert_eq!(
            io.gpio().ops,
            vec![
                Op::Dir(6, Direction::Output),
                Op::Dir(7, Direction::Output),
                Op::Dir(8, Direction::Output),
                Op::Dir(9, Direction::Input),
                Op::Write(7, Level::High),
                Op::Write(6, Level::High),
                Op::Write(8, Level::High),
            ]
        );
    }

    #[test]
    fn test_defaults() {
        let io = engine();
        assert_eq!(io.chain_length(), 1);
        assert_eq!(io.pin_count(), 8);
        assert_eq!(io.debounce_threshold(), 32);
        assert!(!io.is_initialized());
    }

    #[test_case(0, 1; "zero floors to one")]
    #[test_case(1, 1; "minimum")]
    #[test_case(3, 3; "in range")]
    #[test_case(4, 4; "maximum")]
    #[test_case(5, 4; "one past maximum")]
    #[test_case(usize::MAX, 4; "huge")]
    fn test_chain_length_clamped(requested: usize, expected: usize) {
        let mut io = engine();
        io.set_chain_length(requested);
        assert_eq!(io.chain_length(), expected);
        assert_eq!(io.pin_count(), expected * 8);
    }

    #[test]
    fn test_output_pin_round_trip_independent() {
        let mut io = engine();
        for pin in 0..32 {
            io.set_output_pin(pin, pin % 3 == 0);
        }
        for pin in 0..32 {
            assert_eq!(io.output_pin(pin), pin % 3 == 0, "pin {pin}");
        }

        io.set_output_pin(9, true);
        io.set_output_pin(9, false);
        assert!(!io.output_pin(9));
        assert!(io.output_pin(12));
    }

    #[test]
    fn test_output_byte_maps_msb_to_highest_pin() {
        let mut io = engine();
        io.set_output_byte(2, 0b1011_0000);

        let pins: Vec<bool> = (16..24).map(|pin| io.output_pin(pin)).collect();
        assert_eq!(
            pins,
            vec![false, false, false, false, true, true, false, true]
        );
        assert_eq!(io.output_byte(2), 0b1011_0000);
    }

    #[test]
    #[should_panic]
    fn test_register_beyond_capacity_panics() {
        let mut io = engine();
        io.set_output_byte(4, 0xFF);
    }

    #[test]
    fn test_run_protocol_order() {
        let mut io = engine();
        io.set_output_byte(0, 0b1000_0001);
        io.run();

        let ops = &io.gpio().ops;
        assert_eq!(
            &ops[..3],
            &[
                Op::Write(7, Level::Low),
                Op::Write(7, Level::High),
                Op::Write(6, Level::Low),
            ]
        );

        // 8 bits of: data out, sample in, clock high, clock low
        let bits = &ops[3..];
        assert_eq!(bits.len(), 32);
        for (i, chunk) in bits.chunks(4).enumerate() {
            let expected = Level::from(i == 0 || i == 7);
            assert_eq!(
                chunk,
                &[
                    Op::Write(8, expected),
                    Op::Read(9),
                    Op::Write(6, Level::High),
                    Op::Write(6, Level::Low),
                ],
                "bit {i}"
            );
        }
    }

    #[test]
    fn test_run_shifts_last_register_first() {
        let mut io = engine();
        io.set_chain_length(2);
        io.set_output_byte(0, 0x00);
        io.set_output_byte(1, 0xFF);
        io.gpio_mut().reads = [[Level::High; 4], [Level::Low; 4], [Level::Low; 4], [Level::High; 4]]
            .concat();
        io.run();

        let data: Vec<Level> = io
            .gpio()
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Write(8, level) => Some(*level),
                _ => None,
            })
            .collect();
        assert_eq!(&data[..8], &[Level::High; 8]);
        assert_eq!(&data[8..], &[Level::Low; 8]);
        // First byte sampled belongs to input register 0.
        assert_eq!(io.input_byte(0), 0b1111_0000);
        assert_eq!(io.input_byte(1), 0b0000_1111);
        assert!(io.input_pin(7));
        assert!(!io.input_pin(0));
        assert!(io.input_pin(8));
        assert!(!io.input_pin(15));
    }

    #[test]
    fn test_first_sampled_byte_is_input_register_zero() {
        let mut io = engine();
        io.set_chain_length(2);
        io.gpio_mut().reads = [vec![Level::High; 8], vec![Level::Low; 8]].concat();
        io.run();

        assert_eq!(io.input_byte(0), 0xFF);
        assert_eq!(io.input_byte(1), 0x00);
    }

    #[test]
    fn test_run_without_callback_skips_debounce() {
        let mut io = engine();
        io.set_debounce_threshold(0);
        io.gpio_mut().reads = vec![Level::High; 8];
        io.run();

        assert_eq!(io.input_byte(0), 0xFF);
        assert!(!io.debouncer().pin(0).stable);
    }

    #[test]
    fn test_run_notifies_immediately_without_debounce() {
        let mut io = engine();
        let (fired, callback) = recorder();
        io.initialize(Some(callback));
        io.set_debounce_threshold(1);

        // Bit 3 is the fifth sample (MSB first).
        io.gpio_mut().reads = vec![
            Level::Low,
            Level::Low,
            Level::Low,
            Level::Low,
            Level::High,
            Level::Low,
            Level::Low,
            Level::Low,
        ];
        io.run();
        assert_eq!(*fired.borrow(), vec![(3, true)]);

        io.run();
        assert_eq!(*fired.borrow(), vec![(3, true), (3, false)]);
    }

    #[test]
    fn test_set_callback_enables_notifications() {
        let mut io = engine();
        io.initialize(None);
        io.set_debounce_threshold(0);

        let (fired, callback) = recorder();
        io.set_callback(Some(callback));
        io.gpio_mut().reads = vec![Level::High; 8];
        io.run();

        assert_eq!(fired.borrow().len(), 8);
    }
}
