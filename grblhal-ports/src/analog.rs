//! Analog Port Manager
//!
//! Analog inputs are ADC channels, analog outputs are PWM timer channels.
//! Inputs are bound to their ADC when the manager is created; an output only
//! gets its timer channel on the first call to
//! [`AnalogPorts::configure_output`] and keeps it from then on.

use heapless::Vec;

use crate::{
    adc_map::{resolve_channel, AdcInstance, AdcMapEntry},
    host::Host,
    port::{
        pin_info, Direction, InputSignal, OutputSignal, PinCapabilities, PinDef, PinFunction,
        PinInfo, PortType, MAX_AUX_PORTS,
    },
    pwm::{PwmAllocator, PwmChannel, PwmConfig, PwmError},
};

/// Number of polls of the end-of-conversion flag before a read gives up.
pub const CONVERSION_POLL_LIMIT: u32 = 10_000;

/// Largest ADC instance index whose selected channel is tracked.
const ADC_INSTANCES: usize = 4;

/// Description given to outputs that could not be configured.
const UNSUPPORTED: &str = "N/A";

/// Error raised by an ADC conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcError {
    /// The ADC is not available
    Unavailable,
    /// The conversion did not complete in time
    Timeout,
    /// The ADC reported an error
    Conversion,
}

/// One ADC peripheral, as seen by a single analog input.
pub trait AdcConverter {
    /// The peripheral this converter drives.
    fn instance(&self) -> AdcInstance;

    /// Routes `channel` to the converter.
    fn select_channel(&mut self, channel: u8) -> Result<(), AdcError>;

    /// Starts a single conversion.
    fn start(&mut self) -> Result<(), AdcError>;

    /// Checks whether the conversion started by [`AdcConverter::start`] is
    /// done.
    fn poll(&mut self) -> nb::Result<u16, AdcError>;
}

/// Brings up ADC peripherals for analog inputs.
pub trait AdcAllocator {
    /// Converter handed to each input
    type Converter: AdcConverter;

    /// Initializes the ADC serving `entry`, with `entry.channel` selected.
    ///
    /// `None` when the peripheral cannot be brought up.
    fn allocate(&mut self, entry: &AdcMapEntry) -> Option<Self::Converter>;
}

/// Hardware handle of an analog input.
#[derive(Debug)]
pub struct AnalogInput<A> {
    /// Converter, `None` when the pin has no ADC channel
    pub adc: Option<A>,
    /// ADC channel wired to the pin
    pub channel: u8,
}

/// Hardware handle of an analog output: the timer channel, once claimed.
pub type AnalogOutput<T> = Option<PwmChannel<T>>;

/// Analog auxiliary ports of a board.
pub struct AnalogPorts<A, PA: PwmAllocator> {
    inputs: Vec<InputSignal<AnalogInput<A>>, MAX_AUX_PORTS>,
    outputs: Vec<OutputSignal<AnalogOutput<PA::Timer>>, MAX_AUX_PORTS>,
    pwm: PA,
    last_channel: [Option<u8>; ADC_INSTANCES],
}

impl<A, PA> AnalogPorts<A, PA>
where
    A: AdcConverter,
    PA: PwmAllocator,
{
    /// Creates the analog ports of a board.
    ///
    /// Inputs whose ADC cannot be brought up are left out, so the number of
    /// inputs may be lower than `inputs.len()`. Inputs with no entry in `map`
    /// are kept but always read as unavailable. Outputs are created
    /// unconfigured.
    pub fn new<AA>(
        inputs: &[PinDef],
        outputs: &[PinDef],
        map: &[AdcMapEntry],
        adc: &mut AA,
        pwm: PA,
    ) -> Self
    where
        AA: AdcAllocator<Converter = A>,
    {
        let mut ports = Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            pwm,
            last_channel: [None; ADC_INSTANCES],
        };

        let cap = PinCapabilities {
            input: true,
            analog: true,
            ..PinCapabilities::default()
        };

        for def in inputs.iter().take(MAX_AUX_PORTS) {
            let hw = match resolve_channel(map, def.port, def.pin) {
                Some(entry) => match adc.allocate(entry) {
                    Some(converter) => {
                        if let Some(slot) = ports.last_channel.get_mut(entry.adc.index()) {
                            *slot = Some(entry.channel);
                        }
                        AnalogInput {
                            adc: Some(converter),
                            channel: entry.channel,
                        }
                    }
                    None => {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("no ADC for analog input on {}:{}", def.port, def.pin);
                        continue;
                    }
                },
                None => AnalogInput {
                    adc: None,
                    channel: 0,
                },
            };

            let mut signal = InputSignal::new(def.port, def.pin, cap, hw);
            signal.function = PinFunction::AnalogInput;
            signal.mode.analog = true;
            let _ = ports.inputs.push(signal);
        }

        let cap = PinCapabilities {
            output: true,
            pwm: true,
            ..PinCapabilities::default()
        };

        for def in outputs.iter().take(MAX_AUX_PORTS) {
            let mut signal = OutputSignal::new(def.port, def.pin, cap, None);
            signal.function = PinFunction::AnalogOutput;
            let _ = ports.outputs.push(signal);
        }

        ports
    }

    /// Number of analog inputs.
    pub fn num_inputs(&self) -> u8 {
        self.inputs.len() as u8
    }

    /// Number of analog outputs.
    pub fn num_outputs(&self) -> u8 {
        self.outputs.len() as u8
    }

    /// Samples analog input `port`.
    ///
    /// Returns the raw sample, or -1 when the port does not exist, has no ADC,
    /// or the conversion fails. A failed conversion is not retried.
    pub fn read_input(&mut self, port: u8) -> i32 {
        let Some(input) = self.inputs.get_mut(port as usize) else {
            return -1;
        };
        let channel = input.hw.channel;
        let Some(adc) = input.hw.adc.as_mut() else {
            return -1;
        };

        match convert(adc, channel, &mut self.last_channel) {
            Ok(sample) => i32::from(sample),
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("analog input {} failed: {}", port, _e);
                -1
            }
        }
    }

    /// Last sample of input `port` as a value, -1 when unavailable.
    pub fn analog_in_value(&mut self, port: u8) -> f32 {
        self.read_input(port) as f32
    }

    /// Drives analog output `port` to `value`.
    ///
    /// Returns `false` only when the port does not exist. An output that was
    /// never configured is left alone.
    pub fn write_output(&mut self, port: u8, value: f32) -> bool {
        let Some(output) = self.outputs.get_mut(port as usize) else {
            return false;
        };

        if let Some(pwm) = output.hw.as_mut() {
            pwm.set_value(value);
        }

        true
    }

    /// Last value commanded on output `port`, -1 when the port does not
    /// exist or has no timer channel.
    pub fn pwm_value(&self, port: u8) -> f32 {
        self.outputs
            .get(port as usize)
            .and_then(|output| output.hw.as_ref())
            .map_or(-1.0, PwmChannel::value)
    }

    /// Configures output `port` for `config` and drives it to `config.min`.
    ///
    /// The timer channel is claimed on the first call. If no channel is
    /// available or no prescaler fits, the port is claimed through `host` as
    /// unsupported (once) and `false` is returned.
    pub fn configure_output<H: Host>(&mut self, host: &mut H, port: u8, config: &PwmConfig) -> bool {
        let Some(output) = self.outputs.get_mut(port as usize) else {
            return false;
        };

        if output.hw.is_none() {
            output.hw = self.pwm.claim(output.port, output.pin).map(PwmChannel::new);
        }

        let result = match output.hw.as_mut() {
            Some(pwm) => pwm.configure(config).map(|()| pwm),
            None => Err(PwmError::NoChannel),
        };

        match result {
            Ok(pwm) => {
                output.mode.pwm = !config.servo_mode;
                output.mode.servo_pwm = config.servo_mode;
                pwm.set_value(config.min);
                true
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("analog output {} not configured: {}", port, _e);

                output.mode.pwm = false;
                output.mode.servo_pwm = false;

                if !output.mode.claimed
                    && host.claim(PortType::Analog, Direction::Output, port, UNSUPPORTED)
                {
                    output.mode.claimed = true;
                    output.description = Some(UNSUPPORTED);
                }
                false
            }
        }
    }

    /// Snapshot of a port, `None` when it does not exist.
    pub fn get_pin_info(&self, direction: Direction, port: u8) -> Option<PinInfo> {
        match direction {
            Direction::Input => self
                .inputs
                .get(port as usize)
                .map(|signal| pin_info!(signal, port, PortType::Analog, direction)),
            Direction::Output => self
                .outputs
                .get(port as usize)
                .map(|signal| pin_info!(signal, port, PortType::Analog, direction)),
        }
    }

    /// Assigns a logical role to a port. Returns `false` when it does not
    /// exist.
    pub fn set_function(&mut self, direction: Direction, port: u8, function: PinFunction) -> bool {
        match direction {
            Direction::Input => self.inputs.get_mut(port as usize).map(|s| s.function = function),
            Direction::Output => self.outputs.get_mut(port as usize).map(|s| s.function = function),
        }
        .is_some()
    }

    /// Sets the description of a port. Ignored when it does not exist.
    pub fn set_pin_description(&mut self, direction: Direction, port: u8, description: &'static str) {
        match direction {
            Direction::Input => {
                if let Some(signal) = self.inputs.get_mut(port as usize) {
                    signal.description = Some(description);
                }
            }
            Direction::Output => {
                if let Some(signal) = self.outputs.get_mut(port as usize) {
                    signal.description = Some(description);
                }
            }
        }
    }

    /// Timer channel of output `port`, if claimed.
    pub fn pwm_channel(&self, port: u8) -> Option<&PwmChannel<PA::Timer>> {
        self.outputs.get(port as usize)?.hw.as_ref()
    }
}

/// Runs one conversion of `channel`, selecting it first unless it is already
/// the active channel of the converter's instance.
fn convert<A: AdcConverter>(
    adc: &mut A,
    channel: u8,
    last_channel: &mut [Option<u8>; ADC_INSTANCES],
) -> Result<u16, AdcError> {
    match last_channel.get_mut(adc.instance().index()) {
        Some(slot) if *slot == Some(channel) => {}
        Some(slot) => {
            *slot = None;
            adc.select_channel(channel)?;
            *slot = Some(channel);
        }
        None => adc.select_channel(channel)?,
    }

    adc.start()?;

    for _ in 0..CONVERSION_POLL_LIMIT {
        match adc.poll() {
            Ok(sample) => return Ok(sample),
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(e)) => return Err(e),
        }
    }

    Err(AdcError::Timeout)
}
