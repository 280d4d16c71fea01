#[cfg(target_os = "espidf")]
fn main() {
    use esp_idf_svc::hal::gpio::{InputPin, OutputPin};
    use esp_idf_svc::hal::peripherals::Peripherals;
    use shift_chain_io::esp32::Esp32Gpio;
    use shift_chain_io::ShiftChainIo;

    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("Shift Chain IO - ESP32");

    let peripherals = match Peripherals::take() {
        Ok(peripherals) => peripherals,
        Err(e) => {
            log::error!("peripherals unavailable: {e}");
            return;
        }
    };
    let pins = peripherals.pins;

    // Default wiring: clock 6, latch 7, serial-out 8, serial-in 9
    let gpio = match Esp32Gpio::new(
        pins.gpio6.downgrade_output(),
        pins.gpio7.downgrade_output(),
        pins.gpio8.downgrade_output(),
        pins.gpio9.downgrade_input(),
    ) {
        Ok(gpio) => gpio,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };

    let wiring = gpio.wiring();
    let mut io: ShiftChainIo<Esp32Gpio<'static>> = ShiftChainIo::new(gpio, wiring);
    io.set_chain_length(shift_chain_io::config::DEFAULT_MAX_CHAIN);
    io.initialize(Some(Box::new(|pin: u8, value: bool| {
        log::info!("input {pin} -> {}", u8::from(value));
    })));

    loop {
        io.run();
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(1);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    shift_chain_io::mock::run_interactive_terminal();
}
