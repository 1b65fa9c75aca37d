//! Port controller - the single authority over physical line state.
//!
//! Behavior of a line is fully determined by whether it is active and by its
//! mode. The controller owns the [`PortTable`] and the [`PortHal`], and is the
//! only code that mutates either.
//!
//! Hardware failures:
//! - [`PortController::initialize`] stops at the first failure.
//! - [`PortController::apply_action`] writes the hardware before touching the
//!   table, so a failed write leaves the table unchanged.
//! - [`PortController::refresh_inputs`] skips a failing line for this cycle
//!   and keeps its previous value.

use crate::calibration::{core_temperature_celsius, duty_from_percent, volts_reading};
use crate::display::DisplayConfig;
use crate::hal::{HalError, PortHal};
use crate::request::Action;
use crate::table::{AnalogSensor, Level, LineState, PortTable, LINE_COUNT};
use log::{debug, info, warn};
use thiserror::Error;

/// Highest accepted PWM duty percentage
pub const MAX_DUTY_PERCENT: u32 = 100;

/// Controller error: a hardware failure on a given line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("hardware access failed on line {line}: {source}")]
pub struct PortError {
    pub line: usize,
    #[source]
    pub source: HalError,
}

impl PortError {
    fn new(line: usize, source: HalError) -> Self {
        Self { line, source }
    }
}

/// Why an action was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Line number beyond the table
    UnknownLine,
    /// Line exists but is not active
    InactiveLine,
    /// Action does not fit the line's mode
    ModeMismatch,
    /// PWM percentage above 100
    PercentOutOfRange,
}

/// Result of applying one action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Ignored(IgnoreReason),
}

/// Owns the port table and drives the hardware behind it
pub struct PortController<H> {
    table: PortTable,
    hal: H,
}

impl<H: PortHal> PortController<H> {
    pub fn new(table: PortTable, hal: H) -> Self {
        Self { table, hal }
    }

    pub fn table(&self) -> &PortTable {
        &self.table
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    /// Bring up every active line according to its mode.
    ///
    /// Meant to run once at startup: a second call re-reads inputs, re-arms
    /// outputs and appends the PWM frequency to the comment again.
    pub fn initialize(&mut self) -> Result<(), PortError> {
        let hal = &mut self.hal;

        for line in self.table.iter_mut() {
            let index = line.index();
            match line.state {
                LineState::DigitalIn { .. } => {
                    hal.configure_input(index).map_err(|e| PortError::new(index, e))?;
                    let level = hal.read_level(index).map_err(|e| PortError::new(index, e))?;
                    line.state = LineState::DigitalIn { level };
                    debug!("Line {} ({}): digital input, level {}", index, line.name(), level.as_bit());
                }
                LineState::DigitalOut { level } => {
                    hal.configure_output(index).map_err(|e| PortError::new(index, e))?;
                    hal.write_level(index, level).map_err(|e| PortError::new(index, e))?;
                    debug!("Line {} ({}): digital output, driven {}", index, line.name(), level.as_bit());
                }
                LineState::AnalogIn { sensor, .. } => {
                    let raw = hal.read_analog(index, sensor).map_err(|e| PortError::new(index, e))?;
                    line.state = LineState::AnalogIn {
                        value: analog_value(raw, sensor),
                        sensor,
                    };
                    debug!("Line {} ({}): analog input, raw {}", index, line.name(), raw);
                }
                LineState::PwmOut { freq_hz, .. } => {
                    hal.configure_pwm(index, freq_hz).map_err(|e| PortError::new(index, e))?;
                    line.comment.push_str(&format!(" {} Hz", freq_hz));
                    hal.write_duty(index, 0).map_err(|e| PortError::new(index, e))?;
                    line.state = LineState::PwmOut { duty: 0, freq_hz };
                    debug!("Line {} ({}): pwm output at {} Hz", index, line.name(), freq_hz);
                }
            }
        }

        info!("Initialized {} active lines", self.table.active_count());
        Ok(())
    }

    /// Re-sample every digital and analog input.
    ///
    /// Returns the number of lines that failed and kept their previous value.
    pub fn refresh_inputs(&mut self) -> usize {
        let hal = &mut self.hal;
        let mut failures = 0;

        for line in self.table.iter_mut() {
            let index = line.index();
            let result = match line.state {
                LineState::DigitalIn { .. } => hal
                    .read_level(index)
                    .map(|level| LineState::DigitalIn { level }),
                LineState::AnalogIn { sensor, .. } => hal
                    .read_analog(index, sensor)
                    .map(|raw| LineState::AnalogIn {
                        value: analog_value(raw, sensor),
                        sensor,
                    }),
                LineState::DigitalOut { .. } | LineState::PwmOut { .. } => continue,
            };

            match result {
                Ok(state) => line.state = state,
                Err(e) => {
                    warn!("Skipping line {} this cycle: {}", index, e);
                    failures += 1;
                }
            }
        }

        failures
    }

    /// Apply one parsed action.
    ///
    /// Invalid targets (unknown or inactive line, wrong mode, duty above 100%)
    /// are ignored without touching the hardware or the table.
    pub fn apply_action(&mut self, action: &Action, display: &mut DisplayConfig) -> Result<Outcome, PortError> {
        match *action {
            Action::SetFlag { flag, on } => {
                if display.set_flag(flag, on) {
                    info!("Display flag {} set {}", flag.path_prefix(), if on { "on" } else { "off" });
                }
                Ok(Outcome::Applied)
            }
            Action::SetDigital { line, level } => self.set_digital(line, level),
            Action::SetDuty { line, percent } => self.set_duty(line, percent),
        }
    }

    fn set_digital(&mut self, index: usize, level: Level) -> Result<Outcome, PortError> {
        let line = match self.table.get_mut(index) {
            Some(line) => line,
            None => return Ok(Outcome::Ignored(missing_line(index))),
        };
        if !matches!(line.state, LineState::DigitalOut { .. }) {
            return Ok(Outcome::Ignored(IgnoreReason::ModeMismatch));
        }

        self.hal
            .write_level(index, level)
            .map_err(|e| PortError::new(index, e))?;
        line.state = LineState::DigitalOut { level };
        info!("Line {} ({}) set {}", index, line.name(), level.label());
        Ok(Outcome::Applied)
    }

    fn set_duty(&mut self, index: usize, percent: u32) -> Result<Outcome, PortError> {
        let line = match self.table.get_mut(index) {
            Some(line) => line,
            None => return Ok(Outcome::Ignored(missing_line(index))),
        };
        let freq_hz = match line.state {
            LineState::PwmOut { freq_hz, .. } => freq_hz,
            _ => return Ok(Outcome::Ignored(IgnoreReason::ModeMismatch)),
        };
        if percent > MAX_DUTY_PERCENT {
            return Ok(Outcome::Ignored(IgnoreReason::PercentOutOfRange));
        }

        let duty = percent as u8;
        self.hal
            .write_duty(index, duty_from_percent(duty))
            .map_err(|e| PortError::new(index, e))?;
        line.state = LineState::PwmOut { duty, freq_hz };
        info!("Line {} ({}) duty {}%", index, line.name(), duty);
        Ok(Outcome::Applied)
    }
}

fn missing_line(index: usize) -> IgnoreReason {
    if index < LINE_COUNT {
        IgnoreReason::InactiveLine
    } else {
        IgnoreReason::UnknownLine
    }
}

fn analog_value(raw: u16, sensor: AnalogSensor) -> f32 {
    match sensor {
        AnalogSensor::Voltage => volts_reading(raw),
        AnalogSensor::CoreTemperature => core_temperature_celsius(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplayFlag;
    use crate::hal::{HalWrite, PinConfig, SimulatedHal};
    use crate::table::PortSpec;
    use proptest::prelude::*;

    fn specs() -> [PortSpec; LINE_COUNT] {
        let mut specs = [PortSpec::unused("GP", ""); LINE_COUNT];
        specs[0] = PortSpec::digital_in("GP 0", "Digital In");
        specs[1] = PortSpec::digital_out("GP 1", Level::Low, "Digital Out");
        specs[2] = PortSpec::digital_out("GP 2", Level::High, "Digital Out");
        specs[3] = PortSpec::pwm_out("GP 3", 50, "PWM LED (% dutycycle)");
        specs[26] = PortSpec::analog_in("GP 26", AnalogSensor::Voltage, "ADC ch=1, volts");
        specs[29] = PortSpec::analog_in("GP 29", AnalogSensor::CoreTemperature, "core temp (deg C)");
        specs
    }

    fn controller() -> PortController<SimulatedHal> {
        let table = PortTable::from_specs(&specs(), &[23, 24, 25]).unwrap();
        let mut controller = PortController::new(table, SimulatedHal::new());
        controller.initialize().unwrap();
        controller.hal_mut().clear_writes();
        controller
    }

    fn display() -> DisplayConfig {
        DisplayConfig::new("Test board", "IoT Server")
    }

    #[test]
    fn test_initialize_brings_up_lines() {
        let table = PortTable::from_specs(&specs(), &[]).unwrap();
        let mut hal = SimulatedHal::new();
        hal.set_input_level(0, Level::High);
        hal.set_analog_raw(26, 32768);
        hal.set_analog_raw(29, 14000);
        let mut controller = PortController::new(table, hal);

        controller.initialize().unwrap();

        let hal = controller.hal();
        assert_eq!(hal.pin_config(0), Some(PinConfig::Input));
        assert_eq!(hal.pin_config(1), Some(PinConfig::Output));
        assert_eq!(hal.pin_config(3), Some(PinConfig::Pwm { freq_hz: 50 }));
        assert_eq!(hal.level(2), Level::High);
        assert_eq!(hal.duty(3), 0);
        // Analog lines need no configuration
        assert_eq!(hal.pin_config(26), None);

        let table = controller.table();
        assert_eq!(*table.get(0).unwrap().state(), LineState::DigitalIn { level: Level::High });
        assert_eq!(*table.get(3).unwrap().state(), LineState::PwmOut { duty: 0, freq_hz: 50 });
        assert_eq!(table.get(3).unwrap().comment(), "PWM LED (% dutycycle) 50 Hz");
        assert_eq!(
            *table.get(26).unwrap().state(),
            LineState::AnalogIn { value: 1.65, sensor: AnalogSensor::Voltage }
        );
        assert_eq!(
            *table.get(29).unwrap().state(),
            LineState::AnalogIn { value: 27.6, sensor: AnalogSensor::CoreTemperature }
        );
    }

    #[test]
    fn test_initialize_propagates_failure() {
        let table = PortTable::from_specs(&specs(), &[]).unwrap();
        let mut hal = SimulatedHal::new();
        hal.fail_line(2);
        let mut controller = PortController::new(table, hal);

        let err = controller.initialize().unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.source, HalError::Driver { line: 2, code: -1 });
    }

    #[test]
    fn test_set_digital() {
        let mut controller = controller();
        let mut display = display();

        let outcome = controller
            .apply_action(&Action::SetDigital { line: 1, level: Level::High }, &mut display)
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(*controller.table().get(1).unwrap().state(), LineState::DigitalOut { level: Level::High });
        assert_eq!(controller.hal().level(1), Level::High);

        // Applying it again leaves state and pin unchanged
        controller
            .apply_action(&Action::SetDigital { line: 1, level: Level::High }, &mut display)
            .unwrap();
        assert_eq!(*controller.table().get(1).unwrap().state(), LineState::DigitalOut { level: Level::High });
        assert_eq!(controller.hal().level(1), Level::High);
    }

    #[test]
    fn test_invalid_targets_are_ignored() {
        let mut controller = controller();
        let mut display = display();
        let before = controller.table().clone();

        let cases = [
            (Action::SetDigital { line: 0, level: Level::High }, IgnoreReason::ModeMismatch),
            (Action::SetDigital { line: 3, level: Level::High }, IgnoreReason::ModeMismatch),
            (Action::SetDigital { line: 10, level: Level::High }, IgnoreReason::InactiveLine),
            (Action::SetDigital { line: 24, level: Level::High }, IgnoreReason::InactiveLine),
            (Action::SetDigital { line: 42, level: Level::High }, IgnoreReason::UnknownLine),
            (Action::SetDuty { line: 1, percent: 50 }, IgnoreReason::ModeMismatch),
            (Action::SetDuty { line: 3, percent: 101 }, IgnoreReason::PercentOutOfRange),
            (Action::SetDuty { line: 99, percent: 10 }, IgnoreReason::UnknownLine),
        ];
        for (action, reason) in cases {
            assert_eq!(
                controller.apply_action(&action, &mut display).unwrap(),
                Outcome::Ignored(reason),
                "{:?}",
                action
            );
        }

        assert_eq!(controller.table(), &before);
        assert!(controller.hal().writes().is_empty());
    }

    #[test]
    fn test_set_duty() {
        let mut controller = controller();
        let mut display = display();

        controller
            .apply_action(&Action::SetDuty { line: 3, percent: 75 }, &mut display)
            .unwrap();
        assert_eq!(*controller.table().get(3).unwrap().state(), LineState::PwmOut { duty: 75, freq_hz: 50 });
        assert_eq!(controller.hal().writes(), &[HalWrite::Duty { line: 3, duty: 49151 }]);

        for (percent, duty) in [(0, 0), (100, 65535)] {
            controller
                .apply_action(&Action::SetDuty { line: 3, percent }, &mut display)
                .unwrap();
            assert_eq!(controller.hal().duty(3), duty);
        }
    }

    #[test]
    fn test_failed_write_leaves_state_unchanged() {
        let mut controller = controller();
        let mut display = display();
        controller.hal_mut().fail_line(1);

        let err = controller
            .apply_action(&Action::SetDigital { line: 1, level: Level::High }, &mut display)
            .unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(*controller.table().get(1).unwrap().state(), LineState::DigitalOut { level: Level::Low });
    }

    #[test]
    fn test_flags() {
        let mut controller = controller();
        let mut display = display();
        let before = controller.table().clone();

        let on = Action::SetFlag { flag: DisplayFlag::TouchControl, on: true };
        controller.apply_action(&on, &mut display).unwrap();
        controller.apply_action(&on, &mut display).unwrap();

        assert!(display.touch_control);
        assert_eq!(controller.table(), &before);
        assert!(controller.hal().writes().is_empty());
    }

    #[test]
    fn test_refresh_inputs() {
        let mut controller = controller();
        controller.hal_mut().set_input_level(0, Level::High);
        controller.hal_mut().set_analog_raw(26, 20000);
        controller.hal_mut().set_analog_raw(29, 12345);

        assert_eq!(controller.refresh_inputs(), 0);

        let table = controller.table();
        assert_eq!(*table.get(0).unwrap().state(), LineState::DigitalIn { level: Level::High });
        assert_eq!(
            *table.get(26).unwrap().state(),
            LineState::AnalogIn { value: 1.01, sensor: AnalogSensor::Voltage }
        );
        assert_eq!(
            *table.get(29).unwrap().state(),
            LineState::AnalogIn { value: 76.02, sensor: AnalogSensor::CoreTemperature }
        );
        // Outputs are left alone
        assert_eq!(*table.get(2).unwrap().state(), LineState::DigitalOut { level: Level::High });
    }

    #[test]
    fn test_refresh_skips_failing_line() {
        let mut controller = controller();
        controller.hal_mut().set_input_level(0, Level::High);
        controller.hal_mut().set_analog_raw(26, 65535);
        controller.hal_mut().fail_line(0);

        assert_eq!(controller.refresh_inputs(), 1);

        let table = controller.table();
        assert_eq!(*table.get(0).unwrap().state(), LineState::DigitalIn { level: Level::Low });
        assert_eq!(
            *table.get(26).unwrap().state(),
            LineState::AnalogIn { value: 3.3, sensor: AnalogSensor::Voltage }
        );
    }

    proptest! {
        #[test]
        fn prop_set_digital_then_state(high in any::<bool>(), repeat in 1usize..3) {
            let mut controller = controller();
            let mut display = display();
            let level = Level::from(high);
            for _ in 0..repeat {
                controller.apply_action(&Action::SetDigital { line: 1, level }, &mut display).unwrap();
            }
            prop_assert_eq!(*controller.table().get(1).unwrap().state(), LineState::DigitalOut { level });
            prop_assert_eq!(controller.hal().level(1), level);
        }

        #[test]
        fn prop_set_duty(percent in 0u32..=200) {
            let mut controller = controller();
            let mut display = display();
            let outcome = controller.apply_action(&Action::SetDuty { line: 3, percent }, &mut display).unwrap();
            if percent <= 100 {
                prop_assert_eq!(outcome, Outcome::Applied);
                prop_assert_eq!(
                    *controller.table().get(3).unwrap().state(),
                    LineState::PwmOut { duty: percent as u8, freq_hz: 50 }
                );
                let expected = (percent as f64 * 65535.0 / 100.0).round() as u16;
                prop_assert_eq!(controller.hal().duty(3), expected);
            } else {
                prop_assert_eq!(outcome, Outcome::Ignored(IgnoreReason::PercentOutOfRange));
                prop_assert_eq!(
                    *controller.table().get(3).unwrap().state(),
                    LineState::PwmOut { duty: 0, freq_hz: 50 }
                );
            }
        }

        #[test]
        fn prop_voltage_conversion(raw in any::<u16>()) {
            let mut controller = controller();
            controller.hal_mut().set_analog_raw(26, raw);
            controller.refresh_inputs();
            let expected = ((raw as f64 * 3.3 / 65535.0) * 100.0).round() / 100.0;
            prop_assert_eq!(
                *controller.table().get(26).unwrap().state(),
                LineState::AnalogIn { value: expected as f32, sensor: AnalogSensor::Voltage }
            );
        }
    }
}
