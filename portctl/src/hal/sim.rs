//! In-memory hardware used by tests and the host simulator

use super::{HalError, PortHal};
use crate::table::{AnalogSensor, Level, LINE_COUNT};
use log::trace;

/// How a simulated pin has been brought up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinConfig {
    Input,
    Output,
    Pwm { freq_hz: u32 },
}

/// A physical write recorded by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalWrite {
    Level { line: usize, level: Level },
    Duty { line: usize, duty: u16 },
}

/// Simulated board with settable inputs and a log of every output write
#[derive(Debug, Clone)]
pub struct SimulatedHal {
    config: [Option<PinConfig>; LINE_COUNT],
    levels: [Level; LINE_COUNT],
    analog: [u16; LINE_COUNT],
    duty: [u16; LINE_COUNT],
    faulty: [bool; LINE_COUNT],
    writes: Vec<HalWrite>,
}

impl Default for SimulatedHal {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedHal {
    pub fn new() -> Self {
        Self {
            config: [None; LINE_COUNT],
            levels: [Level::Low; LINE_COUNT],
            analog: [0; LINE_COUNT],
            duty: [0; LINE_COUNT],
            faulty: [false; LINE_COUNT],
            writes: Vec::new(),
        }
    }

    /// Set what a digital input reads
    pub fn set_input_level(&mut self, line: usize, level: Level) {
        if let Some(slot) = self.levels.get_mut(line) {
            *slot = level;
        }
    }

    /// Set the raw 16-bit reading of an analog line
    pub fn set_analog_raw(&mut self, line: usize, raw: u16) {
        if let Some(slot) = self.analog.get_mut(line) {
            *slot = raw;
        }
    }

    /// Make every access to `line` fail until [`SimulatedHal::repair_line`]
    pub fn fail_line(&mut self, line: usize) {
        if let Some(slot) = self.faulty.get_mut(line) {
            *slot = true;
        }
    }

    pub fn repair_line(&mut self, line: usize) {
        if let Some(slot) = self.faulty.get_mut(line) {
            *slot = false;
        }
    }

    pub fn pin_config(&self, line: usize) -> Option<PinConfig> {
        self.config.get(line).copied().flatten()
    }

    /// Current level of a line (driven level for outputs)
    pub fn level(&self, line: usize) -> Level {
        self.levels.get(line).copied().unwrap_or_default()
    }

    /// Last raw duty written to a PWM line
    pub fn duty(&self, line: usize) -> u16 {
        self.duty.get(line).copied().unwrap_or(0)
    }

    /// Every output write since creation or the last [`SimulatedHal::clear_writes`]
    pub fn writes(&self) -> &[HalWrite] {
        &self.writes
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    fn check(&self, line: usize, op: &'static str) -> Result<(), HalError> {
        if line >= LINE_COUNT {
            return Err(HalError::Unsupported { line, op });
        }
        if self.faulty[line] {
            return Err(HalError::Driver { line, code: -1 });
        }
        Ok(())
    }

    fn expect_config(&self, line: usize, op: &'static str, ok: impl Fn(PinConfig) -> bool) -> Result<(), HalError> {
        match self.config[line] {
            Some(config) if ok(config) => Ok(()),
            _ => Err(HalError::NotConfigured { line, op }),
        }
    }
}

impl PortHal for SimulatedHal {
    fn configure_input(&mut self, line: usize) -> Result<(), HalError> {
        self.check(line, "input")?;
        self.config[line] = Some(PinConfig::Input);
        trace!("sim: line {} configured as input", line);
        Ok(())
    }

    fn configure_output(&mut self, line: usize) -> Result<(), HalError> {
        self.check(line, "output")?;
        self.config[line] = Some(PinConfig::Output);
        trace!("sim: line {} configured as output", line);
        Ok(())
    }

    fn read_level(&mut self, line: usize) -> Result<Level, HalError> {
        self.check(line, "digital read")?;
        self.expect_config(line, "digital read", |c| {
            matches!(c, PinConfig::Input | PinConfig::Output)
        })?;
        Ok(self.levels[line])
    }

    fn write_level(&mut self, line: usize, level: Level) -> Result<(), HalError> {
        self.check(line, "digital write")?;
        self.expect_config(line, "digital write", |c| c == PinConfig::Output)?;
        self.levels[line] = level;
        self.writes.push(HalWrite::Level { line, level });
        Ok(())
    }

    fn read_analog(&mut self, line: usize, _sensor: AnalogSensor) -> Result<u16, HalError> {
        self.check(line, "analog read")?;
        Ok(self.analog[line])
    }

    fn configure_pwm(&mut self, line: usize, freq_hz: u32) -> Result<(), HalError> {
        self.check(line, "pwm")?;
        self.config[line] = Some(PinConfig::Pwm { freq_hz });
        trace!("sim: line {} configured as pwm at {} Hz", line, freq_hz);
        Ok(())
    }

    fn write_duty(&mut self, line: usize, duty: u16) -> Result<(), HalError> {
        self.check(line, "pwm")?;
        self.expect_config(line, "pwm", |c| matches!(c, PinConfig::Pwm { .. }))?;
        self.duty[line] = duty;
        self.writes.push(HalWrite::Duty { line, duty });
        Ok(())
    }
}
