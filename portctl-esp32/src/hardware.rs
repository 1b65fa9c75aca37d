//! `PortHal` over the esp-idf-hal GPIO, ADC oneshot and LEDC drivers
//!
//! Line `n` is GPIO `n`. Pins are downgraded to `AnyIOPin` so they can be
//! kept in one table and handed to whichever driver the line's mode needs.
//! ADC channel drivers are typed by pin, so the analog lines are opened up
//! front for the board's wiring (GPIO 4..=7 on ADC1).

use esp_idf_hal::adc::attenuation::DB_11;
use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::adc::{ADCPin, ADC1};
use esp_idf_hal::gpio::{AnyIOPin, IOPin, Input, InputOutput, PinDriver, Pins};
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::{
    LedcDriver, LedcTimerDriver, LowSpeed, Resolution, CHANNEL0, CHANNEL1, CHANNEL2, CHANNEL3, CHANNEL4, CHANNEL5,
    CHANNEL6, CHANNEL7, LEDC, TIMER0, TIMER1, TIMER2, TIMER3,
};
use esp_idf_hal::sys::EspError;
use esp_idf_hal::units::FromValueType;
use log::{debug, info};
use portctl::{AnalogSensor, HalError, Level, PortHal, LINE_COUNT};
use std::rc::Rc;

/// Low-speed LEDC timers on the S3
const PWM_TIMERS: usize = 4;

const ADC_MAX_RAW: u16 = 4095;

type Adc1 = AdcDriver<'static, ADC1>;
type PwmTimer = LedcTimerDriver<'static, LowSpeed>;

/// ADC1 channel with its pin type erased
trait AnalogChannel {
    fn sample(&mut self, adc: &Adc1) -> Result<u16, EspError>;
}

impl<T> AnalogChannel for AdcChannelDriver<'static, T, Rc<Adc1>>
where
    T: ADCPin<Adc = ADC1>,
{
    fn sample(&mut self, adc: &Adc1) -> Result<u16, EspError> {
        adc.read_raw(self)
    }
}

/// What currently owns a line's pin
enum LineDriver {
    Idle(AnyIOPin),
    Input(PinDriver<'static, AnyIOPin, Input>),
    // Input stays enabled so the driven level can be read back
    Output(PinDriver<'static, AnyIOPin, InputOutput>),
    Analog(Box<dyn AnalogChannel>),
    Pwm(LedcDriver<'static>),
}

/// LEDC timers and channels not yet handed to a driver
struct LedcPool {
    timer0: Option<TIMER0>,
    timer1: Option<TIMER1>,
    timer2: Option<TIMER2>,
    timer3: Option<TIMER3>,
    channel0: Option<CHANNEL0>,
    channel1: Option<CHANNEL1>,
    channel2: Option<CHANNEL2>,
    channel3: Option<CHANNEL3>,
    channel4: Option<CHANNEL4>,
    channel5: Option<CHANNEL5>,
    channel6: Option<CHANNEL6>,
    channel7: Option<CHANNEL7>,
}

impl LedcPool {
    fn new(ledc: LEDC) -> Self {
        Self {
            timer0: Some(ledc.timer0),
            timer1: Some(ledc.timer1),
            timer2: Some(ledc.timer2),
            timer3: Some(ledc.timer3),
            channel0: Some(ledc.channel0),
            channel1: Some(ledc.channel1),
            channel2: Some(ledc.channel2),
            channel3: Some(ledc.channel3),
            channel4: Some(ledc.channel4),
            channel5: Some(ledc.channel5),
            channel6: Some(ledc.channel6),
            channel7: Some(ledc.channel7),
        }
    }

    fn timer(&mut self, index: usize, config: &TimerConfig) -> Option<Result<PwmTimer, EspError>> {
        match index {
            0 => self.timer0.take().map(|t| LedcTimerDriver::new(t, config)),
            1 => self.timer1.take().map(|t| LedcTimerDriver::new(t, config)),
            2 => self.timer2.take().map(|t| LedcTimerDriver::new(t, config)),
            3 => self.timer3.take().map(|t| LedcTimerDriver::new(t, config)),
            _ => None,
        }
    }

    fn channel(&mut self, index: usize, timer: &Rc<PwmTimer>, pin: AnyIOPin) -> Option<Result<LedcDriver<'static>, EspError>> {
        let timer = timer.clone();
        match index {
            0 => self.channel0.take().map(|c| LedcDriver::new(c, timer, pin)),
            1 => self.channel1.take().map(|c| LedcDriver::new(c, timer, pin)),
            2 => self.channel2.take().map(|c| LedcDriver::new(c, timer, pin)),
            3 => self.channel3.take().map(|c| LedcDriver::new(c, timer, pin)),
            4 => self.channel4.take().map(|c| LedcDriver::new(c, timer, pin)),
            5 => self.channel5.take().map(|c| LedcDriver::new(c, timer, pin)),
            6 => self.channel6.take().map(|c| LedcDriver::new(c, timer, pin)),
            7 => self.channel7.take().map(|c| LedcDriver::new(c, timer, pin)),
            _ => None,
        }
    }
}

pub struct EspPortHal {
    lines: [Option<LineDriver>; LINE_COUNT],
    adc: Rc<Adc1>,
    ledc: LedcPool,
    /// Configured PWM timers by frequency
    timers: heapless::Vec<(u32, Rc<PwmTimer>), PWM_TIMERS>,
    next_channel: usize,
}

impl EspPortHal {
    pub fn new(pins: Pins, adc1: ADC1, ledc: LEDC) -> anyhow::Result<Self> {
        let adc = Rc::new(AdcDriver::new(adc1)?);
        let config = AdcChannelConfig {
            attenuation: DB_11,
            ..Default::default()
        };

        let mut lines: [Option<LineDriver>; LINE_COUNT] = core::array::from_fn(|_| None);
        let digital = [
            (0, pins.gpio0.downgrade()),
            (1, pins.gpio1.downgrade()),
            (2, pins.gpio2.downgrade()),
            (3, pins.gpio3.downgrade()),
            (8, pins.gpio8.downgrade()),
            (9, pins.gpio9.downgrade()),
            (10, pins.gpio10.downgrade()),
            (11, pins.gpio11.downgrade()),
            (12, pins.gpio12.downgrade()),
            (13, pins.gpio13.downgrade()),
            (14, pins.gpio14.downgrade()),
            (15, pins.gpio15.downgrade()),
            (16, pins.gpio16.downgrade()),
            (17, pins.gpio17.downgrade()),
            (18, pins.gpio18.downgrade()),
            (21, pins.gpio21.downgrade()),
        ];
        for (line, pin) in digital {
            lines[line] = Some(LineDriver::Idle(pin));
        }

        lines[4] = Some(analog(&adc, pins.gpio4, &config)?);
        lines[5] = Some(analog(&adc, pins.gpio5, &config)?);
        lines[6] = Some(analog(&adc, pins.gpio6, &config)?);
        lines[7] = Some(analog(&adc, pins.gpio7, &config)?);
        info!("ADC1 oneshot unit ready");

        Ok(Self {
            lines,
            adc,
            ledc: LedcPool::new(ledc),
            timers: heapless::Vec::new(),
            next_channel: 0,
        })
    }

    fn slot(&mut self, line: usize) -> Result<&mut Option<LineDriver>, HalError> {
        match self.lines.get_mut(line) {
            Some(slot) if slot.is_some() => Ok(slot),
            _ => Err(HalError::Unsupported { line, op: "gpio" }),
        }
    }

    fn timer_for(&mut self, line: usize, freq_hz: u32) -> Result<Rc<PwmTimer>, HalError> {
        if let Some((_, timer)) = self.timers.iter().find(|(f, _)| *f == freq_hz) {
            return Ok(timer.clone());
        }

        let index = self.timers.len();
        let config = TimerConfig::new().frequency(freq_hz.Hz()).resolution(Resolution::Bits14);
        let timer = match self.ledc.timer(index, &config) {
            Some(timer) => Rc::new(timer.map_err(driver_error(line))?),
            None => return Err(HalError::Unsupported { line, op: "another PWM frequency" }),
        };
        self.timers
            .push((freq_hz, timer.clone()))
            .map_err(|_| HalError::Unsupported { line, op: "another PWM frequency" })?;
        debug!("LEDC timer {} at {} Hz", index, freq_hz);
        Ok(timer)
    }
}

impl PortHal for EspPortHal {
    fn configure_input(&mut self, line: usize) -> Result<(), HalError> {
        let slot = self.slot(line)?;
        let driver = match slot.take() {
            Some(LineDriver::Idle(pin)) => PinDriver::input(pin),
            Some(LineDriver::Input(pin)) => Ok(pin),
            Some(LineDriver::Output(pin)) => pin.into_input(),
            other => {
                *slot = other;
                return Err(HalError::Unsupported { line, op: "digital input" });
            }
        };
        *slot = Some(LineDriver::Input(driver.map_err(driver_error(line))?));
        Ok(())
    }

    fn configure_output(&mut self, line: usize) -> Result<(), HalError> {
        let slot = self.slot(line)?;
        let driver = match slot.take() {
            Some(LineDriver::Idle(pin)) => PinDriver::input_output(pin),
            Some(LineDriver::Input(pin)) => pin.into_input_output(),
            Some(LineDriver::Output(pin)) => Ok(pin),
            other => {
                *slot = other;
                return Err(HalError::Unsupported { line, op: "digital output" });
            }
        };
        *slot = Some(LineDriver::Output(driver.map_err(driver_error(line))?));
        Ok(())
    }

    fn read_level(&mut self, line: usize) -> Result<Level, HalError> {
        match self.slot(line)? {
            Some(LineDriver::Input(pin)) => Ok(Level::from(pin.is_high())),
            Some(LineDriver::Output(pin)) => Ok(Level::from(pin.is_high())),
            _ => Err(HalError::NotConfigured { line, op: "digital read" }),
        }
    }

    fn write_level(&mut self, line: usize, level: Level) -> Result<(), HalError> {
        let Some(LineDriver::Output(pin)) = self.slot(line)? else {
            return Err(HalError::NotConfigured { line, op: "digital output" });
        };
        let result = match level {
            Level::High => pin.set_high(),
            Level::Low => pin.set_low(),
        };
        result.map_err(driver_error(line))
    }

    fn read_analog(&mut self, line: usize, sensor: AnalogSensor) -> Result<u16, HalError> {
        if sensor == AnalogSensor::CoreTemperature {
            return Err(HalError::Unsupported { line, op: "core temperature" });
        }
        let adc = self.adc.clone();
        let Some(LineDriver::Analog(channel)) = self.slot(line)? else {
            return Err(HalError::Unsupported { line, op: "analog input" });
        };
        let raw = channel.sample(&adc).map_err(driver_error(line))?;
        Ok(scale_to_u16(raw))
    }

    fn configure_pwm(&mut self, line: usize, freq_hz: u32) -> Result<(), HalError> {
        if !matches!(self.slot(line)?, Some(LineDriver::Idle(_))) {
            return Err(HalError::Unsupported { line, op: "PWM reconfiguration" });
        }
        let timer = self.timer_for(line, freq_hz)?;

        let channel = self.next_channel;
        let Some(LineDriver::Idle(pin)) = self.lines[line].take() else {
            return Err(HalError::Unsupported { line, op: "PWM reconfiguration" });
        };
        let driver = match self.ledc.channel(channel, &timer, pin) {
            Some(driver) => driver.map_err(driver_error(line))?,
            None => return Err(HalError::Unsupported { line, op: "another PWM channel" }),
        };

        self.next_channel += 1;
        self.lines[line] = Some(LineDriver::Pwm(driver));
        debug!("Line {}: LEDC channel {} at {} Hz", line, channel, freq_hz);
        Ok(())
    }

    fn write_duty(&mut self, line: usize, duty: u16) -> Result<(), HalError> {
        let Some(LineDriver::Pwm(pwm)) = self.slot(line)? else {
            return Err(HalError::NotConfigured { line, op: "pwm" });
        };
        let ticks = scale_duty(duty, pwm.get_max_duty());
        pwm.set_duty(ticks).map_err(driver_error(line))
    }
}

fn analog<T>(adc: &Rc<Adc1>, pin: T, config: &AdcChannelConfig) -> Result<LineDriver, EspError>
where
    T: ADCPin<Adc = ADC1> + 'static,
{
    let channel = AdcChannelDriver::new(adc.clone(), pin, config)?;
    Ok(LineDriver::Analog(Box::new(channel)))
}

fn driver_error(line: usize) -> impl Fn(EspError) -> HalError {
    move |e| HalError::Driver { line, code: e.code() }
}

/// 12-bit ADC reading to the full 16-bit range (4095 -> 65535)
fn scale_to_u16(raw: u16) -> u16 {
    let raw = raw.min(ADC_MAX_RAW);
    (raw << 4) | (raw >> 8)
}

/// 16-bit duty to LEDC ticks, rounded; 65535 maps to the timer's max duty
fn scale_duty(duty: u16, max_duty: u32) -> u32 {
    (u32::from(duty) * max_duty + 32767) / 65535
}
