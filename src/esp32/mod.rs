mod gpio;

pub use gpio::{Esp32Gpio, GpioError};
