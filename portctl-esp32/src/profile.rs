//! ESP32-S3 DevKitC-1 wiring
//!
//! Line `n` is GPIO `n`. GPIO 22..=25 are not bonded out on the S3, GPIO 19/20
//! carry USB and GPIO 26..=29 the flash/PSRAM bus. ADC1 channel `n` sits on
//! GPIO `n + 1`.
//!
//! The S3 die temperature sensor is not an ADC channel, so this board has no
//! core temperature line.

use portctl::profile::DEFAULT_MODE;
use portctl::{AnalogSensor, BoardProfile, Level, PortSpec, LINE_COUNT};

pub const BOARD_NAME: &str = "ESP32-S3 DevKitC";

const SPECS: [PortSpec; LINE_COUNT] = [
    PortSpec::digital_in("GPIO 0", "BOOT button"),
    PortSpec::digital_out("GPIO 1", Level::High, "Digital Out"),
    PortSpec::digital_out("GPIO 2", Level::Low, "Digital Out"),
    PortSpec::pwm_out("GPIO 3", 50, "PWM LED (% dutycycle)"),
    PortSpec::analog_in("GPIO 4", AnalogSensor::Voltage, "ADC1 ch=3, volts"),
    PortSpec::analog_in("GPIO 5", AnalogSensor::Voltage, "ADC1 ch=4, volts"),
    PortSpec::analog_in("GPIO 6", AnalogSensor::Voltage, "ADC1 ch=5, volts"),
    PortSpec::analog_in("GPIO 7", AnalogSensor::Voltage, "ADC1 ch=6, volts"),
    PortSpec::digital_in("GPIO 8", ""),
    PortSpec::digital_in("GPIO 9", ""),
    PortSpec::digital_in("GPIO 10", ""),
    PortSpec::digital_in("GPIO 11", ""),
    PortSpec::digital_in("GPIO 12", ""),
    PortSpec::digital_in("GPIO 13", ""),
    PortSpec::digital_in("GPIO 14", ""),
    PortSpec::digital_out("GPIO 15", Level::Low, ""),
    PortSpec::unused("GPIO 16", ""),
    PortSpec::unused("GPIO 17", ""),
    PortSpec::unused("GPIO 18", ""),
    PortSpec::unused("GPIO 19", "Internal: USB D-. Do not use!!!"),
    PortSpec::unused("GPIO 20", "Internal: USB D+. Do not use!!!"),
    PortSpec::unused("GPIO 21", ""),
    PortSpec::unused("GPIO 22", "Not bonded"),
    PortSpec::unused("GPIO 23", "Not bonded"),
    PortSpec::unused("GPIO 24", "Not bonded"),
    PortSpec::unused("GPIO 25", "Not bonded"),
    PortSpec::unused("GPIO 26", "Internal: SPI flash. Do not use!!!"),
    PortSpec::unused("GPIO 27", "Internal: SPI flash. Do not use!!!"),
    PortSpec::unused("GPIO 28", "Internal: SPI flash. Do not use!!!"),
    PortSpec::unused("GPIO 29", "Internal: SPI flash. Do not use!!!"),
];

/// Line sampled at boot to clear the saved configuration (active low)
pub const RESET_LINE: usize = 0;

pub const fn esp32s3_devkitc() -> BoardProfile {
    BoardProfile {
        board: BOARD_NAME,
        mode: DEFAULT_MODE,
        specs: SPECS,
        reserved: &[19, 20, 22, 23, 24, 25, 26, 27, 28, 29],
    }
}
