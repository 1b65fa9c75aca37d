//! Conversions between raw 16-bit hardware values and displayed units.
//!
//! Analog readings arrive as a 16-bit raw value regardless of the ADC's native
//! resolution. The die temperature sensor uses the fixed linear calibration
//! `temp = 27 - (volts - 0.706) / 0.001721`.

/// Full-scale raw reading / duty value
pub const RAW_FULL_SCALE: u16 = u16::MAX;

/// ADC reference voltage
pub const ADC_REFERENCE_VOLTS: f64 = 3.3;

/// Sensor voltage at 27 degrees Celsius
const TEMP_SENSOR_VOLTS_AT_27C: f64 = 0.706;

/// Sensor slope in volts per degree Celsius
const TEMP_SENSOR_VOLTS_PER_DEGREE: f64 = 0.001721;

/// Round to two decimals
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Unrounded voltage for a raw reading
#[inline]
pub fn raw_to_volts(raw: u16) -> f64 {
    raw as f64 * ADC_REFERENCE_VOLTS / RAW_FULL_SCALE as f64
}

/// Displayed value of a voltage line, in volts with two decimals
pub fn volts_reading(raw: u16) -> f32 {
    round2(raw_to_volts(raw)) as f32
}

/// Displayed value of the temperature line, in degrees Celsius with two decimals
pub fn core_temperature_celsius(raw: u16) -> f32 {
    let volts = raw_to_volts(raw);
    round2(27.0 - (volts - TEMP_SENSOR_VOLTS_AT_27C) / TEMP_SENSOR_VOLTS_PER_DEGREE) as f32
}

/// Raw 16-bit duty for a percentage, `round(percent * 65535 / 100)`.
///
/// Percentages above 100 saturate at full scale.
pub fn duty_from_percent(percent: u8) -> u16 {
    let percent = u32::from(percent.min(100));
    ((percent * u32::from(RAW_FULL_SCALE) + 50) / 100) as u16
}
