//! Auxiliary port settings
//!
//! The inversion masks live in the firmware core's settings store; this
//! module describes them to the core and chains the description after any
//! other plugin's.

use core::fmt::Write;

use heapless::{String, Vec};

/// Ports listed by name in a setting's label string.
pub const MAX_LABELED_PORTS: usize = 8;

/// Persisted auxiliary port settings.
///
/// Bit `n` of a mask belongs to logical port `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IoPortSettings {
    /// Invert the sense of digital inputs
    pub invert_in: u16,
    /// Invert the sense of digital outputs
    pub invert_out: u16,
}

/// Setting numbers, as used by `$<n>=<value>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum SettingId {
    /// Input inversion mask
    InvertIn = 370,
    /// Output inversion mask
    InvertOut = 372,
}

impl TryFrom<u16> for SettingId {
    type Error = SettingError;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        match id {
            370 => Ok(SettingId::InvertIn),
            372 => Ok(SettingId::InvertOut),
            _ => Err(SettingError::UnknownSetting),
        }
    }
}

/// Errors raised when changing a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingError {
    /// Not a setting handled here
    UnknownSetting,
    /// Value out of range
    InvalidValue,
}

/// How a setting's value is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingFormat {
    /// One bit per labeled item
    Bitfield,
}

/// Description of one setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SettingDetail<'a> {
    /// Setting number
    pub id: SettingId,
    /// Human readable name
    pub name: &'static str,
    /// Value format
    pub format: SettingFormat,
    /// Comma separated labels of the bits
    pub labels: &'a str,
}

/// A group of settings contributed by one plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SettingDetails<'a> {
    /// Group name
    pub group: &'static str,
    /// Settings of the group
    pub settings: &'a [SettingDetail<'a>],
}

/// Bits of the first `count` ports, capped at [`MAX_LABELED_PORTS`].
pub fn port_mask(count: usize) -> u16 {
    let count = count.min(MAX_LABELED_PORTS);
    ((1u32 << count) - 1) as u16
}

fn port_labels(count: usize) -> String<56> {
    let mut labels = String::new();

    for port in 0..count.min(MAX_LABELED_PORTS) {
        let sep = if port == 0 { "" } else { "," };
        // 8 labels always fit
        let _ = write!(labels, "{sep}Port {port}");
    }

    labels
}

/// Settings description of the digital auxiliary ports.
///
/// Built once from the port counts; kept apart from the ports so it can be
/// registered with a [`SettingsReportChain`] for the lifetime of the
/// firmware.
#[derive(Debug)]
pub struct AuxPortSettings {
    input_labels: String<56>,
    output_labels: String<56>,
    out_mask: u16,
}

impl AuxPortSettings {
    /// Group the settings are reported under.
    pub const GROUP: &'static str = "Aux ports";

    /// Describes `inputs` digital inputs and `outputs` digital outputs.
    pub fn new(inputs: u8, outputs: u8) -> Self {
        Self {
            input_labels: port_labels(inputs as usize),
            output_labels: port_labels(outputs as usize),
            out_mask: port_mask(outputs as usize),
        }
    }

    /// Labels of the input inversion bits.
    pub fn input_labels(&self) -> &str {
        &self.input_labels
    }

    /// Labels of the output inversion bits.
    pub fn output_labels(&self) -> &str {
        &self.output_labels
    }

    /// Output inversion bits that can be set.
    pub fn out_mask(&self) -> u16 {
        self.out_mask
    }
}

/// Something that contributes settings to the firmware core's `$$` report.
pub trait SettingsReporter {
    /// Calls `f` with the settings this reporter contributes.
    fn report(&self, f: &mut dyn FnMut(&SettingDetails<'_>));
}

impl SettingsReporter for AuxPortSettings {
    fn report(&self, f: &mut dyn FnMut(&SettingDetails<'_>)) {
        let settings = [
            SettingDetail {
                id: SettingId::InvertIn,
                name: "Invert I/O Port inputs",
                format: SettingFormat::Bitfield,
                labels: &self.input_labels,
            },
            SettingDetail {
                id: SettingId::InvertOut,
                name: "Invert I/O Port outputs",
                format: SettingFormat::Bitfield,
                labels: &self.output_labels,
            },
        ];

        f(&SettingDetails {
            group: Self::GROUP,
            settings: &settings,
        });
    }
}

/// The chain was already full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChainFull;

/// Registered settings reporters.
///
/// Reporting runs the most recently registered reporter first, then hands
/// over to the ones registered before it.
pub struct SettingsReportChain<'a, const N: usize> {
    reporters: Vec<&'a dyn SettingsReporter, N>,
}

impl<'a, const N: usize> SettingsReportChain<'a, N> {
    /// Creates an empty chain.
    pub const fn new() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    /// Adds `reporter` in front of the chain.
    pub fn register(&mut self, reporter: &'a dyn SettingsReporter) -> Result<(), ChainFull> {
        self.reporters.push(reporter).map_err(|_| ChainFull)
    }

    /// Number of registered reporters.
    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    /// Walks the chain, newest reporter first.
    pub fn report(&self, mut f: impl FnMut(&SettingDetails<'_>)) {
        for reporter in self.reporters.iter().rev() {
            reporter.report(&mut f);
        }
    }
}

impl<const N: usize> Default for SettingsReportChain<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}
