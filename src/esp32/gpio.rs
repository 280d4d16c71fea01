use esp_idf_svc::hal::gpio::{
    AnyInputPin, AnyOutputPin, Input, Level as PinLevel, Output, Pin, PinDriver,
};
use esp_idf_svc::sys::EspError;

use crate::config::Wiring;
use crate::{Direction, Gpio, Level};

/// Error types for ESP32 GPIO setup.
#[derive(Debug, thiserror::Error)]
pub enum GpioError {
    #[error("GPIO driver initialization failed: {0}")]
    Driver(#[from] EspError),
}

/// The four chain lines, owned as ESP-IDF pin drivers.
///
/// Directions are fixed when the drivers are created, so
/// [`Gpio::set_direction`] only checks the request against them. Driver
/// errors after construction are logged and ignored: the shift protocol has
/// no way to recover from a failed line mid-scan.
pub struct Esp32Gpio<'d> {
    wiring: Wiring,
    clock: PinDriver<'d, AnyOutputPin, Output>,
    latch: PinDriver<'d, AnyOutputPin, Output>,
    serial_out: PinDriver<'d, AnyOutputPin, Output>,
    serial_in: PinDriver<'d, AnyInputPin, Input>,
}

impl<'d> Esp32Gpio<'d> {
    /// Takes ownership of the four lines and creates their drivers.
    pub fn new(
        clock: AnyOutputPin,
        latch: AnyOutputPin,
        serial_out: AnyOutputPin,
        serial_in: AnyInputPin,
    ) -> Result<Self, GpioError> {
        let wiring = Wiring::new(
            clock.pin() as u8,
            latch.pin() as u8,
            serial_out.pin() as u8,
            serial_in.pin() as u8,
        );

        let gpio = Self {
            wiring,
            clock: PinDriver::output(clock)?,
            latch: PinDriver::output(latch)?,
            serial_out: PinDriver::output(serial_out)?,
            serial_in: PinDriver::input(serial_in)?,
        };
        log::info!("GPIO drivers ready for {wiring:?}");
        Ok(gpio)
    }

    /// Pin assignment taken from the owned lines.
    #[inline]
    pub fn wiring(&self) -> Wiring {
        self.wiring
    }

    fn output(&mut self, pin: u8) -> Option<&mut PinDriver<'d, AnyOutputPin, Output>> {
        match pin {
            p if p == self.wiring.clock => Some(&mut self.clock),
            p if p == self.wiring.latch => Some(&mut self.latch),
            p if p == self.wiring.serial_out => Some(&mut self.serial_out),
            _ => None,
        }
    }
}

impl Gpio for Esp32Gpio<'_> {
    fn set_direction(&mut self, pin: u8, direction: Direction) {
        let owned = if pin == self.wiring.serial_in {
            Some(Direction::Input)
        } else {
            self.output(pin).map(|_| Direction::Output)
        };
        if owned != Some(direction) {
            log::warn!("GPIO {pin}: cannot configure as {direction:?}, driver is {owned:?}");
        }
    }

    fn write(&mut self, pin: u8, level: Level) {
        let level = if bool::from(level) {
            PinLevel::High
        } else {
            PinLevel::Low
        };
        match self.output(pin) {
            Some(driver) => {
                if let Err(e) = driver.set_level(level) {
                    log::warn!("GPIO {pin}: write failed: {e}");
                }
            }
            None => log::warn!("GPIO {pin}: not an output line of this chain"),
        }
    }

    fn read(&mut self, pin: u8) -> Level {
        if pin != self.wiring.serial_in {
            log::warn!("GPIO {pin}: not the input line of this chain");
            return Level::Low;
        }
        Level::from(self.serial_in.is_high())
    }
}
