//! Auxiliary I/O ports for grblHAL board support packages
//!
//! This library contains the chip-agnostic part of a grblHAL driver's
//! auxiliary port handling: the digital and analog port managers, the ADC
//! channel map lookup and the PWM duty-cycle math.
//!
//! You shouldn't include anything here which requires either the `cortex-m`
//! crate, or a PAC. The hardware is reached through the [`embedded_hal`] pin
//! traits and the small [`analog::AdcConverter`] and [`pwm::PwmTimer`] traits,
//! which a board support package implements for its microcontroller.
//!
//! ## Usage
//!
//! ```ignore
//! static ABORT: AbortFlag = AbortFlag::new();
//!
//! let digital = DigitalPorts::new(aux_inputs, aux_outputs, timer, &ABORT);
//! let analog = AnalogPorts::new(ANALOG_IN, ANALOG_OUT, ADC_MAP, &mut adcs, pwm_slices);
//! let mut ports = IoPorts::new(host, digital, analog);
//!
//! // the firmware core now dispatches M62-M68 requests through the slots
//! ports.wait_on_input(PortType::Digital, 0, WaitMode::High, 2.0);
//! ```

#![deny(missing_docs)]
#![no_std]

pub mod adc_map;
pub mod analog;
pub mod digital;
pub mod host;
pub mod ioports;
pub mod port;
pub mod pwm;
pub mod settings;

#[cfg(test)]
mod mock;

pub use adc_map::{resolve_channel, AdcClock, AdcInstance, AdcMapEntry};
pub use analog::{AdcAllocator, AdcConverter, AdcError, AnalogInput, AnalogOutput, AnalogPorts};
pub use digital::{DigitalPorts, WaitMode, WaitOutcome};
pub use host::{AbortFlag, Host, PortDispatch};
pub use ioports::IoPorts;
pub use port::{
    Direction, InputSignal, OutputSignal, PinCapabilities, PinDef, PinFunction, PinInfo, PinMode,
    PortId, PortType, Pull, MAX_AUX_PORTS,
};
pub use pwm::{PwmAllocator, PwmChannel, PwmConfig, PwmData, PwmError, PwmTimer};
pub use settings::{
    AuxPortSettings, ChainFull, IoPortSettings, SettingDetail, SettingDetails, SettingError,
    SettingFormat, SettingId, SettingsReportChain, SettingsReporter,
};
