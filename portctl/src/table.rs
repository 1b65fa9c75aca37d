//! Port table - the in-memory model of every physical line.
//!
//! A board exposes a fixed number of lines, addressed by index. Each line is
//! described once at startup by a [`PortSpec`] and then lives in the
//! [`PortTable`] for the lifetime of the process. The runtime state of a line
//! is a [`LineState`] variant per mode, so a digital line can only ever hold a
//! level and a PWM line only ever holds a duty percentage.
//!
//! Inactive lines are not stored at all: they are never touched, rendered or
//! addressable.

use thiserror::Error;

/// Number of addressable lines (`00`..`29` in request paths)
pub const LINE_COUNT: usize = 30;

/// Digital level of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    /// Create from a 0/1 value; anything non-zero is high
    pub fn from_bit(bit: u8) -> Self {
        if bit == 0 {
            Level::Low
        } else {
            Level::High
        }
    }

    /// 0 for low, 1 for high
    pub fn as_bit(self) -> u8 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }

    /// Label shown on the status page
    pub fn label(self) -> &'static str {
        match self {
            Level::Low => "off",
            Level::High => "on",
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// What an analog line is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogSensor {
    /// Plain voltage input, reported in volts
    Voltage,
    /// Die temperature sensor, reported in degrees Celsius
    CoreTemperature,
}

/// Line mode as written in a board profile, with its default value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortMode {
    DigitalIn,
    DigitalOut { default: Level },
    AnalogIn { sensor: AnalogSensor },
    /// PWM output; the frequency is fixed at initialization
    PwmOut { freq_hz: u32 },
}

/// Static description of one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    pub active: bool,
    pub mode: PortMode,
    /// Physical identifier, e.g. "GP 5"
    pub name: &'static str,
    pub comment: &'static str,
}

impl PortSpec {
    pub const fn digital_in(name: &'static str, comment: &'static str) -> Self {
        Self {
            active: true,
            mode: PortMode::DigitalIn,
            name,
            comment,
        }
    }

    pub const fn digital_out(name: &'static str, default: Level, comment: &'static str) -> Self {
        Self {
            active: true,
            mode: PortMode::DigitalOut { default },
            name,
            comment,
        }
    }

    pub const fn analog_in(name: &'static str, sensor: AnalogSensor, comment: &'static str) -> Self {
        Self {
            active: true,
            mode: PortMode::AnalogIn { sensor },
            name,
            comment,
        }
    }

    pub const fn pwm_out(name: &'static str, freq_hz: u32, comment: &'static str) -> Self {
        Self {
            active: true,
            mode: PortMode::PwmOut { freq_hz },
            name,
            comment,
        }
    }

    /// A line that does not take part (unused, or reserved by the board)
    pub const fn unused(name: &'static str, comment: &'static str) -> Self {
        Self {
            active: false,
            mode: PortMode::DigitalIn,
            name,
            comment,
        }
    }
}

/// Runtime state of an active line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineState {
    DigitalIn { level: Level },
    DigitalOut { level: Level },
    /// Volts (two decimals) or degrees Celsius, depending on `sensor`
    AnalogIn { value: f32, sensor: AnalogSensor },
    /// `duty` is a percentage in 0..=100
    PwmOut { duty: u8, freq_hz: u32 },
}

impl LineState {
    fn from_mode(mode: PortMode) -> Self {
        match mode {
            PortMode::DigitalIn => LineState::DigitalIn { level: Level::Low },
            PortMode::DigitalOut { default } => LineState::DigitalOut { level: default },
            PortMode::AnalogIn { sensor } => LineState::AnalogIn { value: 0.0, sensor },
            PortMode::PwmOut { freq_hz } => LineState::PwmOut { duty: 0, freq_hz },
        }
    }

    /// Direction label shown on the status page
    pub fn direction(&self) -> &'static str {
        match self {
            LineState::DigitalIn { .. } | LineState::AnalogIn { .. } => "Input",
            LineState::DigitalOut { .. } | LineState::PwmOut { .. } => "Output",
        }
    }

    /// True for lines whose value comes from the hardware
    pub fn is_input(&self) -> bool {
        matches!(self, LineState::DigitalIn { .. } | LineState::AnalogIn { .. })
    }
}

/// One active line
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    index: usize,
    name: &'static str,
    pub(crate) comment: String,
    pub(crate) state: LineState,
}

impl Line {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn state(&self) -> &LineState {
        &self.state
    }
}

/// Errors raised while building a table from a profile
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("line {line} is reserved by the board and cannot be active")]
    ReservedLineActive { line: usize },

    #[error("line {line} is out of range (board has {LINE_COUNT} lines)")]
    LineOutOfRange { line: usize },

    #[error("more than one line is wired to the core temperature sensor")]
    DuplicateTemperatureLine,
}

/// Fixed-size table of lines indexed by line number
#[derive(Debug, Clone, PartialEq)]
pub struct PortTable {
    lines: [Option<Line>; LINE_COUNT],
}

impl PortTable {
    /// Build the table from a static spec, rejecting any active reserved line
    pub fn from_specs(specs: &[PortSpec; LINE_COUNT], reserved: &[usize]) -> Result<Self, TableError> {
        for &line in reserved {
            if line >= LINE_COUNT {
                return Err(TableError::LineOutOfRange { line });
            }
            if specs[line].active {
                return Err(TableError::ReservedLineActive { line });
            }
        }

        let temperature_lines = specs
            .iter()
            .filter(|spec| {
                spec.active
                    && matches!(
                        spec.mode,
                        PortMode::AnalogIn {
                            sensor: AnalogSensor::CoreTemperature
                        }
                    )
            })
            .count();
        if temperature_lines > 1 {
            return Err(TableError::DuplicateTemperatureLine);
        }

        let lines = core::array::from_fn(|index| {
            let spec = &specs[index];
            spec.active.then(|| Line {
                index,
                name: spec.name,
                comment: spec.comment.to_string(),
                state: LineState::from_mode(spec.mode),
            })
        });

        Ok(Self { lines })
    }

    /// Active line at `index`, if any
    pub fn get(&self, index: usize) -> Option<&Line> {
        self.lines.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Line> {
        self.lines.get_mut(index).and_then(Option::as_mut)
    }

    /// Active lines in index order
    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter().flatten()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Line> {
        self.lines.iter_mut().flatten()
    }

    /// Number of active lines
    pub fn active_count(&self) -> usize {
        self.iter().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_specs() -> [PortSpec; LINE_COUNT] {
        [PortSpec::unused("GP", ""); LINE_COUNT]
    }

    #[test]
    fn test_level_bits() {
        assert_eq!(Level::from_bit(0), Level::Low);
        assert_eq!(Level::from_bit(1), Level::High);
        assert_eq!(Level::from_bit(7), Level::High);
        assert_eq!(Level::High.as_bit(), 1);
        assert_eq!(Level::Low.label(), "off");
        assert_eq!(Level::from(true), Level::High);
    }

    #[test]
    fn test_inactive_lines_are_not_addressable() {
        let mut specs = blank_specs();
        specs[1] = PortSpec::digital_out("GP 1", Level::High, "Digital Out");

        let table = PortTable::from_specs(&specs, &[]).unwrap();
        assert_eq!(table.active_count(), 1);
        assert!(table.get(0).is_none());
        assert!(table.get(LINE_COUNT).is_none());

        let line = table.get(1).unwrap();
        assert_eq!(line.index(), 1);
        assert_eq!(line.name(), "GP 1");
        assert_eq!(*line.state(), LineState::DigitalOut { level: Level::High });
    }

    #[test]
    fn test_reserved_line_must_stay_inactive() {
        let mut specs = blank_specs();
        specs[23] = PortSpec::digital_in("GP 23", "");

        assert_eq!(
            PortTable::from_specs(&specs, &[23, 24, 25]),
            Err(TableError::ReservedLineActive { line: 23 })
        );
        assert_eq!(
            PortTable::from_specs(&blank_specs(), &[LINE_COUNT]),
            Err(TableError::LineOutOfRange { line: LINE_COUNT })
        );
    }

    #[test]
    fn test_single_temperature_line() {
        let mut specs = blank_specs();
        specs[28] = PortSpec::analog_in("GP 28", AnalogSensor::CoreTemperature, "");
        specs[29] = PortSpec::analog_in("GP 29", AnalogSensor::CoreTemperature, "");

        assert_eq!(
            PortTable::from_specs(&specs, &[]),
            Err(TableError::DuplicateTemperatureLine)
        );
    }

    #[test]
    fn test_initial_states() {
        let mut specs = blank_specs();
        specs[0] = PortSpec::digital_in("GP 0", "");
        specs[3] = PortSpec::pwm_out("GP 3", 50, "PWM LED");
        specs[26] = PortSpec::analog_in("GP 26", AnalogSensor::Voltage, "");

        let table = PortTable::from_specs(&specs, &[]).unwrap();
        let states: Vec<_> = table.iter().map(|line| *line.state()).collect();
        assert_eq!(
            states,
            vec![
                LineState::DigitalIn { level: Level::Low },
                LineState::PwmOut { duty: 0, freq_hz: 50 },
                LineState::AnalogIn {
                    value: 0.0,
                    sensor: AnalogSensor::Voltage
                },
            ]
        );
        assert_eq!(table.get(3).unwrap().state().direction(), "Output");
        assert!(table.get(26).unwrap().state().is_input());
    }
}
