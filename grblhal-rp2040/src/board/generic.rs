//! Generic Raspberry Pi Pico based controller
//!
//! Streams over USB, so the UART pins are free for auxiliary outputs.

use fugit::HertzU32;

use super::{BoardConfig, ControlPins, CoolantPins, SpindlePins};

/// Pin map of the generic Pico controller.
pub const BOARD: BoardConfig = BoardConfig {
    name: "Generic RP2040",
    xosc: HertzU32::from_raw(12_000_000),
    step: [2, 3, 4],
    direction: [5, 6, 7],
    steppers_enable: 8,
    limit: [9, 10, 11],
    spindle: SpindlePins {
        enable: Some(12),
        direction: Some(13),
        pwm: Some(14),
    },
    coolant: CoolantPins {
        flood: Some(16),
        mist: Some(17),
    },
    control: ControlPins {
        reset: Some(18),
        feed_hold: Some(19),
        cycle_start: Some(20),
        safety_door: Some(21),
    },
    probe: Some(15),
    aux_inputs: &[22],
    aux_outputs: &[0, 1],
    analog_inputs: &[26, 27],
    analog_outputs: &[28],
};
