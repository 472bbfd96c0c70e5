//! Port descriptors
//!
//! A descriptor binds one physical signal to a logical auxiliary port. The
//! physical identifiers ([`PortId`] and the pin number) are opaque here: they
//! are only handed back to the board support package, never interpreted.

/// Maximum number of auxiliary ports per direction and type.
pub const MAX_AUX_PORTS: usize = 16;

/// Opaque identifier of the GPIO port (bank) a pin belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortId(pub u8);

/// Physical location of a signal, as listed in a board's pin map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinDef {
    /// Physical port
    pub port: PortId,
    /// Pin number within the port
    pub pin: u8,
}

impl PinDef {
    /// Pin `pin` of `port`.
    pub const fn new(port: PortId, pin: u8) -> Self {
        Self { port, pin }
    }
}

/// Digital or analog port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortType {
    /// Digital (on/off) port
    Digital,
    /// Analog (ADC input or PWM output) port
    Analog,
}

/// Direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// Logical role assigned to a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinFunction {
    /// Free for use by M62-M68
    #[default]
    Unassigned,
    /// Auxiliary digital input
    AuxInput,
    /// Auxiliary digital output
    AuxOutput,
    /// Auxiliary analog input
    AnalogInput,
    /// Auxiliary analog output
    AnalogOutput,
    /// Probe input
    Probe,
    /// Spindle at speed input
    SpindleAtSpeed,
    /// Spindle PWM output
    SpindlePwm,
    /// Safety door input
    SafetyDoor,
}

/// What a pin is able to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinCapabilities {
    /// Can be read as a digital input
    pub input: bool,
    /// Can be driven as a digital output
    pub output: bool,
    /// Is routed to an ADC channel
    pub analog: bool,
    /// Can be driven by a PWM channel
    pub pwm: bool,
    /// Can raise an interrupt
    pub irq: bool,
    /// Has a switchable pull resistor
    pub pull: bool,
}

/// Pull resistor setting of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    /// No pull resistor
    #[default]
    None,
    /// Pull up
    Up,
    /// Pull down
    Down,
}

/// How a pin is currently configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinMode {
    /// Configured as input
    pub input: bool,
    /// Configured as output
    pub output: bool,
    /// Sampled by an ADC
    pub analog: bool,
    /// Driven by a PWM channel
    pub pwm: bool,
    /// Driven by a PWM channel in servo mode
    pub servo_pwm: bool,
    /// Claimed by a subsystem
    pub claimed: bool,
    /// Pull resistor
    pub pull: Pull,
}

/// An input descriptor.
///
/// `P` is whatever the owner needs to sample the signal: a digital input pin
/// for the digital manager, an [`AnalogInput`](crate::analog::AnalogInput)
/// for the analog manager.
#[derive(Debug)]
pub struct InputSignal<P> {
    /// Logical role
    pub function: PinFunction,
    /// Capabilities
    pub cap: PinCapabilities,
    /// Current mode
    pub mode: PinMode,
    /// Physical port
    pub port: PortId,
    /// Physical pin number within the port
    pub pin: u8,
    /// Description set by whichever subsystem claims the port
    pub description: Option<&'static str>,
    /// Hardware handle
    pub hw: P,
}

impl<P> InputSignal<P> {
    /// Creates an unassigned input descriptor.
    pub fn new(port: PortId, pin: u8, cap: PinCapabilities, hw: P) -> Self {
        Self {
            function: PinFunction::Unassigned,
            cap,
            mode: PinMode {
                input: true,
                ..PinMode::default()
            },
            port,
            pin,
            description: None,
            hw,
        }
    }
}

/// An output descriptor.
#[derive(Debug)]
pub struct OutputSignal<P> {
    /// Logical role
    pub function: PinFunction,
    /// Capabilities
    pub cap: PinCapabilities,
    /// Current mode
    pub mode: PinMode,
    /// Physical port
    pub port: PortId,
    /// Physical pin number within the port
    pub pin: u8,
    /// Description set by whichever subsystem claims the port
    pub description: Option<&'static str>,
    /// Hardware handle
    pub hw: P,
}

impl<P> OutputSignal<P> {
    /// Creates an unassigned output descriptor.
    pub fn new(port: PortId, pin: u8, cap: PinCapabilities, hw: P) -> Self {
        Self {
            function: PinFunction::Unassigned,
            cap,
            mode: PinMode {
                output: true,
                ..PinMode::default()
            },
            port,
            pin,
            description: None,
            hw,
        }
    }
}

/// Read-only snapshot of a port, handed to the firmware core for
/// introspection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinInfo {
    /// Logical port number
    pub id: u8,
    /// Digital or analog
    pub port_type: PortType,
    /// Input or output
    pub direction: Direction,
    /// Logical role
    pub function: PinFunction,
    /// Capabilities
    pub cap: PinCapabilities,
    /// Current mode
    pub mode: PinMode,
    /// Physical port
    pub port: PortId,
    /// Physical pin number
    pub pin: u8,
    /// Description, if any
    pub description: Option<&'static str>,
}

macro_rules! pin_info {
    ($signal:expr, $id:expr, $port_type:expr, $direction:expr) => {
        $crate::port::PinInfo {
            id: $id,
            port_type: $port_type,
            direction: $direction,
            function: $signal.function,
            cap: $signal.cap,
            mode: $signal.mode,
            port: $signal.port,
            pin: $signal.pin,
            description: $signal.description,
        }
    };
}

pub(crate) use pin_info;
