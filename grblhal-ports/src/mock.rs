//! Test doubles for the hardware and host traits

use core::cell::Cell;
use core::convert::Infallible;
use core::fmt::Write;

use embedded_hal::{
    delay::DelayNs,
    digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin},
};
use fugit::HertzU32;
use heapless::{String, Vec};

use crate::{
    adc_map::{AdcInstance, AdcMapEntry},
    analog::{AdcAllocator, AdcConverter, AdcError},
    host::{AbortFlag, Host},
    port::{Direction, PortId, PortType},
    pwm::{PwmAllocator, PwmTimer},
    settings::IoPortSettings,
};

pub struct MockTimer {
    pub clock_hz: u32,
    pub configured: Option<(u32, u32, bool)>,
    pub compare: u32,
    pub output_enabled: bool,
}

impl MockTimer {
    pub fn new(clock_hz: u32) -> Self {
        Self {
            clock_hz,
            configured: None,
            compare: 0,
            output_enabled: false,
        }
    }
}

impl PwmTimer for MockTimer {
    const MAX_COUNT: u32 = 65_530;
    const MAX_PRESCALER: u32 = 64;

    fn clock(&self) -> HertzU32 {
        HertzU32::from_raw(self.clock_hz)
    }

    fn configure(&mut self, prescaler: u32, period: u32, invert: bool) {
        self.configured = Some((prescaler, period, invert));
    }

    fn set_compare(&mut self, value: u32) {
        self.compare = value;
    }

    fn set_output_enabled(&mut self, enabled: bool) {
        self.output_enabled = enabled;
    }
}

pub struct MockPwmAllocator {
    pub clock_hz: u32,
    pub free_pins: u32,
    pub claims: u32,
}

impl MockPwmAllocator {
    pub fn new(clock_hz: u32) -> Self {
        Self {
            clock_hz,
            free_pins: u32::MAX,
            claims: 0,
        }
    }
}

impl PwmAllocator for MockPwmAllocator {
    type Timer = MockTimer;

    fn claim(&mut self, _port: PortId, pin: u8) -> Option<MockTimer> {
        self.claims += 1;
        (self.free_pins & (1 << pin) != 0).then(|| MockTimer::new(self.clock_hz))
    }
}

/// Shared record of what the mock ADCs were asked to do.
#[derive(Default)]
pub struct AdcLog {
    pub selects: Cell<u32>,
    pub starts: Cell<u32>,
    /// Channel currently routed to each instance
    pub channels: [Cell<u8>; 4],
    pub busy_polls: Cell<u32>,
    pub stuck: Cell<bool>,
    pub broken: Cell<bool>,
}

pub struct MockAdc<'a> {
    instance: AdcInstance,
    log: &'a AdcLog,
    busy: u32,
}

impl AdcConverter for MockAdc<'_> {
    fn instance(&self) -> AdcInstance {
        self.instance
    }

    fn select_channel(&mut self, channel: u8) -> Result<(), AdcError> {
        self.log.selects.set(self.log.selects.get() + 1);
        self.log.channels[self.instance.0 as usize].set(channel);
        Ok(())
    }

    fn start(&mut self) -> Result<(), AdcError> {
        if self.log.broken.get() {
            return Err(AdcError::Conversion);
        }
        self.log.starts.set(self.log.starts.get() + 1);
        self.busy = self.log.busy_polls.get();
        Ok(())
    }

    fn poll(&mut self) -> nb::Result<u16, AdcError> {
        if self.log.stuck.get() || self.busy > 0 {
            self.busy = self.busy.saturating_sub(1);
            return Err(nb::Error::WouldBlock);
        }
        // sample encodes the channel so tests can tell reads apart
        Ok(1000 + self.log.channels[self.instance.0 as usize].get() as u16)
    }
}

pub struct MockAdcAllocator<'a> {
    pub log: &'a AdcLog,
    pub exhausted_after: usize,
    pub allocated: usize,
}

impl<'a> MockAdcAllocator<'a> {
    pub fn new(log: &'a AdcLog) -> Self {
        Self {
            log,
            exhausted_after: usize::MAX,
            allocated: 0,
        }
    }
}

impl<'a> AdcAllocator for MockAdcAllocator<'a> {
    type Converter = MockAdc<'a>;

    fn allocate(&mut self, entry: &AdcMapEntry) -> Option<MockAdc<'a>> {
        if self.allocated >= self.exhausted_after {
            return None;
        }
        self.allocated += 1;
        self.log.channels[entry.adc.0 as usize].set(entry.channel);
        Some(MockAdc {
            instance: entry.adc,
            log: self.log,
            busy: 0,
        })
    }
}

pub struct MockInput<'a> {
    pub level: &'a Cell<bool>,
    pub reads: &'a Cell<u32>,
}

impl ErrorType for MockInput<'_> {
    type Error = Infallible;
}

impl InputPin for MockInput<'_> {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        self.reads.set(self.reads.get() + 1);
        Ok(self.level.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|high| !high)
    }
}

pub struct MockOutput<'a> {
    pub level: &'a Cell<bool>,
    pub transitions: &'a Cell<u32>,
}

impl MockOutput<'_> {
    fn drive(&mut self, high: bool) {
        if self.level.get() != high {
            self.transitions.set(self.transitions.get() + 1);
        }
        self.level.set(high);
    }
}

impl ErrorType for MockOutput<'_> {
    type Error = Infallible;
}

impl OutputPin for MockOutput<'_> {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.drive(true);
        Ok(())
    }
}

impl StatefulOutputPin for MockOutput<'_> {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level.get())
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level.get())
    }
}

#[derive(Default)]
pub struct MockDelay {
    pub sleeps: u32,
    pub total_ms: u32,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ms += ns / 1_000_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.sleeps += 1;
        self.total_ms += ms;
    }
}

/// What the mock host does on each realtime step.
pub enum Realtime<'a> {
    Idle,
    /// Sets `level` to `to` on the n-th step.
    SetLevel {
        after: u32,
        level: &'a Cell<bool>,
        to: bool,
    },
    /// Raises `flag` on the n-th step.
    RaiseAbort { after: u32, flag: &'a AbortFlag },
    /// Reports a pending abort through the return value on the n-th step.
    Refuse { after: u32 },
}

pub struct MockHost<'a> {
    pub settings: IoPortSettings,
    pub output: String<512>,
    pub realtime_steps: u32,
    pub realtime: Realtime<'a>,
    pub saves: u32,
    pub claims: Vec<(PortType, Direction, u8, &'static str), 8>,
    pub grant_claims: bool,
}

impl<'a> MockHost<'a> {
    pub fn new() -> Self {
        Self {
            settings: IoPortSettings::default(),
            output: String::new(),
            realtime_steps: 0,
            realtime: Realtime::Idle,
            saves: 0,
            claims: Vec::new(),
            grant_claims: true,
        }
    }
}

impl Host for MockHost<'_> {
    fn execute_realtime(&mut self) -> bool {
        self.realtime_steps += 1;
        match self.realtime {
            Realtime::Idle => true,
            Realtime::SetLevel { after, level, to } => {
                if self.realtime_steps == after {
                    level.set(to);
                }
                true
            }
            Realtime::RaiseAbort { after, flag } => {
                if self.realtime_steps == after {
                    flag.raise();
                }
                true
            }
            Realtime::Refuse { after } => self.realtime_steps < after,
        }
    }

    fn stream_write(&mut self, s: &str) {
        let _ = self.output.write_str(s);
    }

    fn settings(&self) -> &IoPortSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut IoPortSettings {
        &mut self.settings
    }

    fn save_settings(&mut self) {
        self.saves += 1;
    }

    fn claim(
        &mut self,
        port_type: PortType,
        direction: Direction,
        port: u8,
        description: &'static str,
    ) -> bool {
        let _ = self.claims.push((port_type, direction, port, description));
        self.grant_claims
    }
}
