//! Board pin maps
//!
//! Every supported board is a [`BoardConfig`] constant naming the GPIO used
//! for each signal. The board is picked at compile time with one of the
//! `board-*` cargo features and exported as [`BOARD`].
//!
//! Pins are bank 0 GPIO numbers. Analog inputs must be on GPIO26-29, the only
//! pins routed to the ADC. Analog outputs are driven by PWM slices, one
//! output per slice; the two channels of a slice share their divider and
//! period.

use fugit::HertzU32;

pub mod cnc_shield;
pub mod generic;

#[cfg(feature = "board-cnc-shield")]
pub use cnc_shield::BOARD;
#[cfg(all(feature = "board-generic", not(feature = "board-cnc-shield")))]
pub use generic::BOARD;

#[cfg(not(any(feature = "board-generic", feature = "board-cnc-shield")))]
compile_error!("select a board with one of the `board-*` features");

/// Number of motion axes.
pub const N_AXIS: usize = 3;

/// Spindle control pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpindlePins {
    /// Spindle on/off
    pub enable: Option<u8>,
    /// Spindle direction
    pub direction: Option<u8>,
    /// Spindle speed PWM
    pub pwm: Option<u8>,
}

/// Coolant control pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoolantPins {
    /// Flood coolant
    pub flood: Option<u8>,
    /// Mist coolant
    pub mist: Option<u8>,
}

/// Operator control inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlPins {
    /// Reset / emergency stop
    pub reset: Option<u8>,
    /// Feed hold
    pub feed_hold: Option<u8>,
    /// Cycle start
    pub cycle_start: Option<u8>,
    /// Safety door
    pub safety_door: Option<u8>,
}

/// Pin and clock configuration of a board.
#[derive(Debug, Clone, Copy)]
pub struct BoardConfig {
    /// Reported in the `$I` build info
    pub name: &'static str,
    /// Crystal oscillator frequency
    pub xosc: HertzU32,
    /// Step outputs, X Y Z
    pub step: [u8; N_AXIS],
    /// Direction outputs, X Y Z
    pub direction: [u8; N_AXIS],
    /// Shared stepper enable output
    pub steppers_enable: u8,
    /// Limit switch inputs, X Y Z
    pub limit: [u8; N_AXIS],
    /// Spindle
    pub spindle: SpindlePins,
    /// Coolant
    pub coolant: CoolantPins,
    /// Operator controls
    pub control: ControlPins,
    /// Probe input
    pub probe: Option<u8>,
    /// Auxiliary digital inputs, in logical port order
    pub aux_inputs: &'static [u8],
    /// Auxiliary digital outputs, in logical port order
    pub aux_outputs: &'static [u8],
    /// Auxiliary analog inputs, in logical port order
    pub analog_inputs: &'static [u8],
    /// Auxiliary analog outputs, in logical port order
    pub analog_outputs: &'static [u8],
}

impl BoardConfig {
    /// Every GPIO the board uses.
    pub fn pins(&self) -> impl Iterator<Item = u8> + '_ {
        let optional = [
            self.spindle.enable,
            self.spindle.direction,
            self.spindle.pwm,
            self.coolant.flood,
            self.coolant.mist,
            self.control.reset,
            self.control.feed_hold,
            self.control.cycle_start,
            self.control.safety_door,
            self.probe,
        ];

        self.step
            .into_iter()
            .chain(self.direction)
            .chain([self.steppers_enable])
            .chain(self.limit)
            .chain(optional.into_iter().flatten())
            .chain(self.aux_inputs.iter().copied())
            .chain(self.aux_outputs.iter().copied())
            .chain(self.analog_inputs.iter().copied())
            .chain(self.analog_outputs.iter().copied())
    }
}
