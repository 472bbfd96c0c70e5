//! ADC channel map
//!
//! Boards provide a static table binding the pins that can be sampled to an
//! ADC instance and channel. The table order defines priority; a pin should
//! appear only once.

use crate::port::PortId;

/// Identifies one ADC peripheral of the microcontroller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcInstance(pub u8);

impl AdcInstance {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Clock-enable selector of the ADC block serving an entry.
///
/// Some families clock several ADC instances from one enable bit, so this is
/// kept apart from [`AdcInstance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcClock(pub u8);

/// One row of the ADC channel map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcMapEntry {
    /// Physical port of the pin
    pub port: PortId,
    /// Pin number within the port
    pub pin: u8,
    /// Clock enable required before the ADC can be used
    pub clock: AdcClock,
    /// ADC peripheral sampling this pin
    pub adc: AdcInstance,
    /// Channel of `adc` wired to this pin
    pub channel: u8,
}

/// Looks up the ADC channel wired to `port`/`pin`.
///
/// Linear search, first match wins.
pub fn resolve_channel(map: &[AdcMapEntry], port: PortId, pin: u8) -> Option<&AdcMapEntry> {
    map.iter().find(|entry| entry.port == port && entry.pin == pin)
}
