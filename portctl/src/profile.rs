//! Board profiles - the static wiring of a board.
//!
//! A profile names the board, lists one [`PortSpec`] per line and marks the
//! lines the board itself uses. Reserved lines must be inactive; building the
//! table enforces this.

use crate::display::DisplayConfig;
use crate::table::{AnalogSensor, Level, PortSpec, PortTable, TableError, LINE_COUNT};

/// Application mode shown next to the board name
pub const DEFAULT_MODE: &str = "IoT Server";

/// Static description of a board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardProfile {
    pub board: &'static str,
    pub mode: &'static str,
    pub specs: [PortSpec; LINE_COUNT],
    /// Lines wired to on-board peripherals
    pub reserved: &'static [usize],
}

const PICO_W_SPECS: [PortSpec; LINE_COUNT] = [
    PortSpec::digital_in("GP 0", "Digital In"),
    PortSpec::digital_out("GP 1", Level::High, "Digital Out"),
    PortSpec::digital_out("GP 2", Level::Low, "Digital Out"),
    PortSpec::pwm_out("GP 3", 50, "PWM LED (% dutycycle)"),
    PortSpec::digital_in("GP 4", ""),
    PortSpec::digital_in("GP 5", ""),
    PortSpec::digital_in("GP 6", ""),
    PortSpec::digital_in("GP 7", ""),
    PortSpec::digital_in("GP 8", ""),
    PortSpec::digital_in("GP 9", ""),
    PortSpec::digital_in("GP 10", ""),
    PortSpec::digital_in("GP 11", ""),
    PortSpec::digital_in("GP 12", ""),
    PortSpec::digital_in("GP 13", ""),
    PortSpec::digital_in("GP 14", ""),
    PortSpec::digital_out("GP 15", Level::Low, ""),
    PortSpec::unused("GP 16", ""),
    PortSpec::unused("GP 17", ""),
    PortSpec::unused("GP 18", ""),
    PortSpec::unused("GP 19", ""),
    PortSpec::unused("GP 20", ""),
    PortSpec::unused("GP 21", ""),
    PortSpec::unused("GP 22", ""),
    PortSpec::unused("GP 23", "Internal: Wireless Power On! Do not use!!!"),
    PortSpec::unused("GP 24", "Internal: Wireless SPI Data. Do not use!!!"),
    PortSpec::unused("GP 25", "Internal: Wireless SPI Chip-Select. Do not use!!!"),
    PortSpec::analog_in("GP 26", AnalogSensor::Voltage, "ADC ch=1, volts"),
    PortSpec::analog_in("GP 27", AnalogSensor::Voltage, "ADC ch=2, volts"),
    PortSpec::analog_in("GP 28", AnalogSensor::Voltage, "ADC ch=3, volts"),
    PortSpec::analog_in("GP 29", AnalogSensor::CoreTemperature, "ADC ch=4, core temp (deg C)"),
];

impl BoardProfile {
    /// Raspberry Pi Pico W reference wiring
    pub const fn pico_w() -> Self {
        Self {
            board: "Raspberry Pi Pico W",
            mode: DEFAULT_MODE,
            specs: PICO_W_SPECS,
            // Wireless module power, SPI data and chip-select
            reserved: &[23, 24, 25],
        }
    }

    /// Build the runtime table, validating reserved lines
    pub fn build_table(&self) -> Result<PortTable, TableError> {
        PortTable::from_specs(&self.specs, self.reserved)
    }

    /// Display configuration with the board title and default flags
    pub fn display_config(&self) -> DisplayConfig {
        DisplayConfig::new(self.board, self.mode)
    }
}
