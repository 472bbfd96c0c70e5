//! Pico CNC shield adapter
//!
//! Arduino CNC shield footprint on an RP2040 carrier board. GPIO23-25 and
//! GPIO29 are broken out on the carrier, unlike on the Pico.

use fugit::HertzU32;

use super::{BoardConfig, ControlPins, CoolantPins, SpindlePins};

/// Pin map of the CNC shield adapter.
pub const BOARD: BoardConfig = BoardConfig {
    name: "RP2040 CNC shield",
    xosc: HertzU32::from_raw(12_000_000),
    step: [2, 4, 6],
    direction: [3, 5, 7],
    steppers_enable: 8,
    limit: [9, 10, 11],
    spindle: SpindlePins {
        enable: Some(13),
        direction: None,
        pwm: Some(14),
    },
    coolant: CoolantPins {
        flood: Some(15),
        mist: None,
    },
    control: ControlPins {
        reset: Some(16),
        feed_hold: Some(17),
        cycle_start: Some(18),
        safety_door: None,
    },
    probe: Some(12),
    aux_inputs: &[19, 20, 23],
    aux_outputs: &[0, 1, 21, 22],
    analog_inputs: &[26, 27, 28],
    analog_outputs: &[24, 29],
};
