//! Hardware abstraction seam.
//!
//! The controller never touches registers itself. Everything physical goes
//! through [`PortHal`], which a board adapter implements on top of its HAL and
//! which [`SimulatedHal`] implements in memory for tests and the host
//! simulator.
//!
//! Implementations are not expected to be reentrant: line access happens from
//! one thread of control only.

pub mod sim;

pub use sim::{HalWrite, PinConfig, SimulatedHal};

use crate::table::{AnalogSensor, Level};
use thiserror::Error;

/// Error type for hardware access
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// The board cannot perform this operation on this line
    #[error("line {line} does not support {op}")]
    Unsupported { line: usize, op: &'static str },

    /// The line was not brought up for this operation
    #[error("line {line} is not configured for {op}")]
    NotConfigured { line: usize, op: &'static str },

    /// Underlying driver returned an error code
    #[error("driver error {code} on line {line}")]
    Driver { line: usize, code: i32 },
}

/// Port for physical line access
pub trait PortHal {
    /// Configure the line as a digital input
    fn configure_input(&mut self, line: usize) -> Result<(), HalError>;

    /// Configure the line as a digital output
    fn configure_output(&mut self, line: usize) -> Result<(), HalError>;

    /// Read the current level of a digital line
    fn read_level(&mut self, line: usize) -> Result<Level, HalError>;

    /// Drive a digital output
    fn write_level(&mut self, line: usize, level: Level) -> Result<(), HalError>;

    /// Sample an analog line, scaled to a 16-bit raw reading
    fn read_analog(&mut self, line: usize, sensor: AnalogSensor) -> Result<u16, HalError>;

    /// Configure the line as a PWM output at a fixed frequency
    fn configure_pwm(&mut self, line: usize, freq_hz: u32) -> Result<(), HalError>;

    /// Set the PWM duty as a 16-bit raw value (65535 = always high)
    fn write_duty(&mut self, line: usize, duty: u16) -> Result<(), HalError>;
}
