//! PWM channels for analog outputs
//!
//! An analog output is a timer channel driving a PWM waveform. The commanded
//! value (percent, RPM, ...) is mapped linearly onto the timer's compare
//! register; the scaling is computed once per configuration in
//! [`PwmData::precompute`] and applied on every write by
//! [`compute_pwm_value`].
//!
//! ```
//! use grblhal_ports::pwm::{compute_pwm_value, PwmConfig, PwmData};
//!
//! let data = PwmData::precompute(&PwmConfig::default(), 1_000_000).unwrap();
//! assert_eq!(data.period, 200);
//! assert_eq!(compute_pwm_value(&data, 50.0), 100);
//! ```

use fugit::HertzU32;

use crate::port::PortId;

/// Errors raised while configuring a PWM channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PwmError {
    /// `max` is not above `min`.
    InvalidRange,
    /// The frequency is not positive or exceeds the timer clock.
    InvalidFrequency,
    /// No prescaler brings the period within the timer's range.
    NoPrescaler,
    /// No free timer channel is routed to the pin.
    NoChannel,
}

/// Requested behaviour of an analog output.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmConfig {
    /// PWM frequency
    pub freq_hz: f32,
    /// Commanded value mapped to `min_value`
    pub min: f32,
    /// Commanded value mapped to `max_value`
    pub max: f32,
    /// Duty cycle, in percent, when the output is off
    pub off_value: f32,
    /// Duty cycle, in percent, at `min`
    pub min_value: f32,
    /// Duty cycle, in percent, at `max`
    pub max_value: f32,
    /// Invert the waveform
    pub invert: bool,
    /// Servo (RC pulse) output
    pub servo_mode: bool,
}

impl PwmConfig {
    /// Configuration every analog output starts with: 5 kHz, 0-100% mapped
    /// onto a 0-100% duty cycle.
    pub const AUX_DEFAULT: PwmConfig = PwmConfig {
        freq_hz: 5000.0,
        min: 0.0,
        max: 100.0,
        off_value: 0.0,
        min_value: 0.0,
        max_value: 100.0,
        invert: false,
        servo_mode: false,
    };
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self::AUX_DEFAULT
    }
}

/// Precomputed scaling of a PWM channel, in timer ticks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmData {
    /// Timer input clock after prescaling
    pub clock_hz: u32,
    /// Ticks per PWM period
    pub period: u32,
    /// Compare value when off
    pub off_value: u32,
    /// Compare value at `min`
    pub min_value: u32,
    /// Compare value at `max`
    pub max_value: u32,
    /// Lower end of the commanded range
    pub min: f32,
    /// Upper end of the commanded range
    pub max: f32,
    /// Ticks per unit of commanded value
    pub gradient: f32,
    /// The off state still produces a waveform
    pub always_on: bool,
    /// Waveform is inverted
    pub invert: bool,
}

impl PwmData {
    /// Computes the scaling of `config` for a timer counting at `clock_hz`.
    pub fn precompute(config: &PwmConfig, clock_hz: u32) -> Result<Self, PwmError> {
        if !(config.max > config.min) {
            return Err(PwmError::InvalidRange);
        }
        if !(config.freq_hz > 0.0) {
            return Err(PwmError::InvalidFrequency);
        }

        let period = (clock_hz as f32 / config.freq_hz) as u32;
        if period == 0 {
            return Err(PwmError::InvalidFrequency);
        }

        let ticks = |percent: f32| (period as f32 * percent / 100.0) as u32;
        let min_value = ticks(config.min_value);
        let max_value = ticks(config.max_value);

        Ok(PwmData {
            clock_hz,
            period,
            off_value: ticks(config.off_value),
            min_value,
            max_value,
            min: config.min,
            max: config.max,
            gradient: max_value.saturating_sub(min_value) as f32 / (config.max - config.min),
            always_on: config.off_value != 0.0,
            invert: config.invert,
        })
    }
}

/// Maps a commanded value onto a compare value.
///
/// Values at or below `min` map to the off value, values at or above `max`
/// to `max_value`.
pub fn compute_pwm_value(data: &PwmData, value: f32) -> u32 {
    if value > data.min {
        if value >= data.max {
            data.max_value
        } else {
            let ticks = ((value - data.min) * data.gradient) as u32 + data.min_value;
            ticks.min(data.max_value)
        }
    } else {
        data.off_value
    }
}

/// Searches the smallest prescaler for which the period of `config` fits in
/// `max_count` ticks.
///
/// Returns the prescaler and the scaling computed with it.
pub fn find_prescaler(
    config: &PwmConfig,
    clock_hz: u32,
    max_count: u32,
    max_prescaler: u32,
) -> Result<(u32, PwmData), PwmError> {
    let mut prescaler = 0;

    loop {
        prescaler += 1;
        if prescaler > max_prescaler {
            return Err(PwmError::NoPrescaler);
        }

        let data = PwmData::precompute(config, clock_hz / prescaler)?;
        if data.period <= max_count {
            return Ok((prescaler, data));
        }
    }
}

/// A timer channel able to produce a PWM waveform.
///
/// Implementations own their compare register exclusively.
pub trait PwmTimer {
    /// Largest period, in ticks, the counter can represent.
    const MAX_COUNT: u32;

    /// Largest integer clock prescaler.
    const MAX_PRESCALER: u32;

    /// Clock feeding the prescaler.
    fn clock(&self) -> HertzU32;

    /// Programs prescaler, period and polarity and starts the counter.
    fn configure(&mut self, prescaler: u32, period: u32, invert: bool);

    /// Writes the compare register.
    fn set_compare(&mut self, value: u32);

    /// Gates the channel's output driver.
    fn set_output_enabled(&mut self, enabled: bool);
}

/// Hands out timer channels to analog outputs.
pub trait PwmAllocator {
    /// Timer channel type
    type Timer: PwmTimer;

    /// Claims the timer channel routed to `port`/`pin` and connects it to the
    /// pin. `None` if the pin has no free PWM channel.
    fn claim(&mut self, port: PortId, pin: u8) -> Option<Self::Timer>;
}

/// PWM binding of an analog output.
#[derive(Debug)]
pub struct PwmChannel<T> {
    value: f32,
    prescaler: u32,
    data: PwmData,
    timer: T,
}

impl<T: PwmTimer> PwmChannel<T> {
    /// Takes ownership of a claimed timer channel. The channel is unusable
    /// until [`PwmChannel::configure`] succeeds.
    pub fn new(timer: T) -> Self {
        Self {
            value: 0.0,
            prescaler: 0,
            data: PwmData::default(),
            timer,
        }
    }

    /// Computes prescaler and scaling for `config` and programs the timer.
    pub fn configure(&mut self, config: &PwmConfig) -> Result<(), PwmError> {
        let clock_hz = self.timer.clock().to_Hz();
        let (prescaler, data) = find_prescaler(config, clock_hz, T::MAX_COUNT, T::MAX_PRESCALER)?;

        self.timer.configure(prescaler, data.period, config.invert);
        self.prescaler = prescaler;
        self.data = data;

        Ok(())
    }

    /// Drives the output to `value`.
    ///
    /// Hitting the off value is not the same as a 0% duty: an always-on
    /// channel keeps switching at the off compare value, any other channel
    /// has its output driver gated off.
    pub fn set_value(&mut self, value: f32) {
        let compare = compute_pwm_value(&self.data, value);

        self.value = value;

        if compare == self.data.off_value {
            if self.data.always_on {
                self.timer.set_compare(self.data.off_value);
                self.timer.set_output_enabled(true);
            } else {
                self.timer.set_compare(0);
                self.timer.set_output_enabled(false);
            }
        } else {
            self.timer.set_compare(compare);
            self.timer.set_output_enabled(true);
        }
    }

    /// Last commanded value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Prescaler found by the last successful configuration.
    pub fn prescaler(&self) -> u32 {
        self.prescaler
    }

    /// Scaling in use.
    pub fn data(&self) -> &PwmData {
        &self.data
    }

    /// The timer channel.
    pub fn timer(&self) -> &T {
        &self.timer
    }
}
