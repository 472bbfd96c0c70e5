//! ADC channel map
//!
//! The RP2040 has a single ADC. GPIO26-29 are its external inputs 0-3,
//! channel 4 is the internal temperature sensor and has no pin.

use grblhal_ports::{AdcClock, AdcInstance, AdcMapEntry};

use crate::ports::BANK0;

/// Highest ADC input select value, the temperature sensor.
pub const MAX_ADC_CHANNEL: u8 = 4;

const fn entry(pin: u8, channel: u8) -> AdcMapEntry {
    AdcMapEntry {
        port: BANK0,
        pin,
        clock: AdcClock(0),
        adc: AdcInstance(0),
        channel,
    }
}

/// Pins that can be sampled.
pub const ADC_MAP: &[AdcMapEntry] = &[entry(26, 0), entry(27, 1), entry(28, 2), entry(29, 3)];
