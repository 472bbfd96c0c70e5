//! Digital Port Manager
//!
//! Digital auxiliary inputs and outputs with persisted inversion, plus the
//! blocking input wait behind M66.
//!
//! A blocking wait polls the input [`POLLS_PER_SECOND`] times per second.
//! Between polls it runs one realtime step of the firmware core and sleeps,
//! so motion keeps being planned while the wait is in progress. The wait
//! ends when the input reaches the wanted level, when the poll budget
//! derived from the timeout runs out, or when an abort is requested; an
//! abort wins over both.

use core::fmt::Write;

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, PinState, StatefulOutputPin},
};
use heapless::{String, Vec};

use crate::{
    host::{AbortFlag, Host},
    port::{pin_info, Direction, InputSignal, OutputSignal, PinInfo, PortType, MAX_AUX_PORTS},
    settings::{port_mask, IoPortSettings, SettingError, SettingId},
};

/// Input polls per second of a blocking wait.
pub const POLLS_PER_SECOND: u32 = 20;

const POLL_INTERVAL_MS: u32 = 1000 / POLLS_PER_SECOND;

/// How [`DigitalPorts::wait_on_input`] waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitMode {
    /// Read the input once
    Immediate,
    /// Wait for the input to be high
    High,
    /// Wait for the input to be low
    Low,
    /// Wait for a change. Waits for high.
    Change,
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitOutcome {
    /// The input reached the wanted level, carried here
    Satisfied(bool),
    /// The poll budget ran out
    TimedOut,
    /// An abort was requested
    Aborted,
}

impl WaitOutcome {
    /// The sample as reported to the firmware core: the level, or -1.
    pub fn value(self) -> i32 {
        match self {
            WaitOutcome::Satisfied(level) => i32::from(level),
            WaitOutcome::TimedOut | WaitOutcome::Aborted => -1,
        }
    }
}

/// Polls a blocking wait of `timeout` seconds may spend sleeping.
///
/// Rounded up; zero or negative timeouts give no budget at all.
pub fn poll_budget(timeout: f32) -> u32 {
    if !(timeout > 0.0) {
        return 0;
    }

    let polls = timeout * POLLS_PER_SECOND as f32;
    let whole = polls as u32;
    if (whole as f32) < polls {
        whole.saturating_add(1)
    } else {
        whole
    }
}

/// Writes the `[MSG:AUXn=value]` status line for a sampled port.
pub fn report_aux_value<H: Host>(host: &mut H, port: u8, value: i32) {
    let mut line: String<32> = String::new();

    let _ = if value < 0 {
        write!(line, "[MSG:AUX{port}=fail]\r\n")
    } else {
        write!(line, "[MSG:AUX{port}={value}]\r\n")
    };

    host.stream_write(&line);
}

fn bit(mask: u16, port: usize) -> bool {
    port < 16 && (mask >> port) & 1 != 0
}

fn sample<I: InputPin>(pin: &mut I, invert: bool) -> Option<bool> {
    pin.is_high().ok().map(|high| high ^ invert)
}

/// Digital auxiliary ports of a board.
///
/// `I` are the input pins, `O` the output pins and `D` the delay used between
/// polls of a blocking wait.
pub struct DigitalPorts<'a, I, O, D> {
    inputs: Vec<InputSignal<I>, MAX_AUX_PORTS>,
    outputs: Vec<OutputSignal<O>, MAX_AUX_PORTS>,
    delay: D,
    abort: &'a AbortFlag,
}

impl<'a, I, O, D> DigitalPorts<'a, I, O, D>
where
    I: InputPin,
    O: StatefulOutputPin,
    D: DelayNs,
{
    /// Creates the digital ports of a board. Signals beyond
    /// [`MAX_AUX_PORTS`] are dropped.
    pub fn new(
        inputs: impl IntoIterator<Item = InputSignal<I>>,
        outputs: impl IntoIterator<Item = OutputSignal<O>>,
        delay: D,
        abort: &'a AbortFlag,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().take(MAX_AUX_PORTS).collect(),
            outputs: outputs.into_iter().take(MAX_AUX_PORTS).collect(),
            delay,
            abort,
        }
    }

    /// Number of digital inputs.
    pub fn num_inputs(&self) -> u8 {
        self.inputs.len() as u8
    }

    /// Number of digital outputs.
    pub fn num_outputs(&self) -> u8 {
        self.outputs.len() as u8
    }

    /// Output inversion bits that can be set.
    pub fn out_mask(&self) -> u16 {
        port_mask(self.outputs.len())
    }

    /// Turns output `port` on or off. Ignored if it does not exist.
    pub fn digital_write(&mut self, settings: &IoPortSettings, port: u8, on: bool) {
        if let Some(output) = self.outputs.get_mut(port as usize) {
            let level = on ^ bit(settings.invert_out, port as usize);
            let _ = output.hw.set_state(PinState::from(level));
        }
    }

    /// Samples input `port`, waiting for a level if `mode` asks for one.
    ///
    /// Returns `None` if the port does not exist. Nothing is reported to the
    /// host stream.
    pub fn wait_for<H: Host>(
        &mut self,
        host: &mut H,
        port: u8,
        mode: WaitMode,
        timeout: f32,
    ) -> Option<WaitOutcome> {
        let invert = bit(host.settings().invert_in, port as usize);
        let input = self.inputs.get_mut(port as usize)?;

        if mode == WaitMode::Immediate {
            return Some(match sample(&mut input.hw, invert) {
                Some(level) => WaitOutcome::Satisfied(level),
                None => WaitOutcome::TimedOut,
            });
        }

        let wanted = mode != WaitMode::Low;
        let mut remaining = poll_budget(timeout);

        loop {
            if self.abort.is_raised() {
                return Some(WaitOutcome::Aborted);
            }

            if let Some(level) = sample(&mut input.hw, invert) {
                if level == wanted {
                    return Some(WaitOutcome::Satisfied(level));
                }
            }

            if remaining == 0 {
                return Some(WaitOutcome::TimedOut);
            }
            remaining -= 1;

            if !host.execute_realtime() {
                return Some(WaitOutcome::Aborted);
            }
            self.delay.delay_ms(POLL_INTERVAL_MS);
        }
    }

    /// Samples input `port` like [`DigitalPorts::wait_for`] and reports the
    /// result on the host stream.
    ///
    /// Returns the level, or -1 if the port does not exist, the wait timed
    /// out or was aborted.
    pub fn wait_on_input<H: Host>(
        &mut self,
        host: &mut H,
        port: u8,
        mode: WaitMode,
        timeout: f32,
    ) -> i32 {
        let value = self
            .wait_for(host, port, mode, timeout)
            .map_or(-1, WaitOutcome::value);

        report_aux_value(host, port, value);

        value
    }

    /// Drives every output to its inverted-off level.
    pub fn apply_inversion_on_load(&mut self, settings: &IoPortSettings) {
        for (port, output) in self.outputs.iter_mut().enumerate() {
            let _ = output
                .hw
                .set_state(PinState::from(bit(settings.invert_out, port)));
        }
    }

    /// Changes the output inversion mask.
    ///
    /// Bits beyond [`DigitalPorts::out_mask`] are dropped. Only outputs whose
    /// bit changes are toggled; the mask is saved only if it changed.
    pub fn set_inversion<H: Host>(&mut self, host: &mut H, mask: u16) -> Result<(), SettingError> {
        let mask = mask & self.out_mask();
        let current = host.settings().invert_out;

        if mask != current {
            let changed = mask ^ current;
            for (port, output) in self.outputs.iter_mut().enumerate() {
                if bit(changed, port) {
                    let _ = output.hw.toggle();
                }
            }

            host.settings_mut().invert_out = mask;
            host.save_settings();
        }

        Ok(())
    }

    /// Handles `$<id>=<value>`.
    pub fn set_setting<H: Host>(
        &mut self,
        host: &mut H,
        id: SettingId,
        value: u32,
    ) -> Result<(), SettingError> {
        let value = u16::try_from(value).map_err(|_| SettingError::InvalidValue)?;

        match id {
            SettingId::InvertIn => {
                if host.settings().invert_in != value {
                    host.settings_mut().invert_in = value;
                    host.save_settings();
                }
                Ok(())
            }
            SettingId::InvertOut => self.set_inversion(host, value),
        }
    }

    /// Current value of a setting.
    pub fn get_setting<H: Host>(&self, host: &H, id: SettingId) -> u32 {
        let settings = host.settings();
        u32::from(match id {
            SettingId::InvertIn => settings.invert_in,
            SettingId::InvertOut => settings.invert_out,
        })
    }

    /// Snapshot of a port, `None` when it does not exist.
    pub fn get_pin_info(&self, direction: Direction, port: u8) -> Option<PinInfo> {
        match direction {
            Direction::Input => self
                .inputs
                .get(port as usize)
                .map(|signal| pin_info!(signal, port, PortType::Digital, direction)),
            Direction::Output => self
                .outputs
                .get(port as usize)
                .map(|signal| pin_info!(signal, port, PortType::Digital, direction)),
        }
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
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::{
        mock::{MockDelay, MockHost, MockInput, MockOutput, Realtime},
        port::{PinCapabilities, PortId},
    };

    type Ports<'a> = DigitalPorts<'a, MockInput<'a>, MockOutput<'a>, MockDelay>;

    struct Bench {
        inputs: [Cell<bool>; 2],
        reads: Cell<u32>,
        outputs: [Cell<bool>; 3],
        transitions: Cell<u32>,
        abort: AbortFlag,
    }

    impl Bench {
        fn new() -> Self {
            Self {
                inputs: Default::default(),
                reads: Cell::new(0),
                outputs: Default::default(),
                transitions: Cell::new(0),
                abort: AbortFlag::new(),
            }
        }

        fn ports(&self) -> Ports<'_> {
            let cap = PinCapabilities {
                input: true,
                output: true,
                ..PinCapabilities::default()
            };

            let inputs = self.inputs.iter().enumerate().map(|(pin, level)| {
                InputSignal::new(PortId(1), pin as u8, cap, MockInput { level, reads: &self.reads })
            });
            let outputs = self.outputs.iter().enumerate().map(|(pin, level)| {
                OutputSignal::new(
                    PortId(2),
                    pin as u8 + 4,
                    cap,
                    MockOutput { level, transitions: &self.transitions },
                )
            });

            DigitalPorts::new(inputs, outputs, MockDelay::default(), &self.abort)
        }

        fn levels(&self) -> [bool; 3] {
            [self.outputs[0].get(), self.outputs[1].get(), self.outputs[2].get()]
        }
    }

    #[test]
    fn budget_rounds_up() {
        assert_eq!(poll_budget(0.0), 0);
        assert_eq!(poll_budget(-1.0), 0);
        assert_eq!(poll_budget(f32::NAN), 0);
        assert_eq!(poll_budget(0.05), 1);
        assert_eq!(poll_budget(0.06), 2);
        assert_eq!(poll_budget(1.0), 20);
        assert_eq!(poll_budget(2.5), 50);
    }

    #[test]
    fn out_of_range_ports_are_ignored() {
        let bench = Bench::new();
        let mut ports = bench.ports();
        let mut host = MockHost::new();

        ports.digital_write(&host.settings, 3, true);
        assert_eq!(bench.transitions.get(), 0);

        assert_eq!(ports.wait_on_input(&mut host, 2, WaitMode::High, 1.0), -1);
        assert_eq!(host.output.as_str(), "[MSG:AUX2=fail]\r\n");
        assert_eq!(bench.reads.get(), 0);
        assert_eq!(host.realtime_steps, 0);
        assert!(ports.get_pin_info(Direction::Output, 3).is_none());
    }

    #[test]
    fn digital_write_applies_inversion() {
        let bench = Bench::new();
        let mut ports = bench.ports();
        let settings = IoPortSettings {
            invert_in: 0,
            invert_out: 0b010,
        };

        ports.digital_write(&settings, 0, true);
        ports.digital_write(&settings, 1, true);
        assert_eq!(bench.levels(), [true, false, false]);

        ports.digital_write(&settings, 1, false);
        assert_eq!(bench.levels(), [true, true, false]);
    }

    #[test]
    fn immediate_reads_once() {
        let bench = Bench::new();
        bench.inputs[0].set(true);
        let mut ports = bench.ports();
        let mut host = MockHost::new();

        assert_eq!(ports.wait_on_input(&mut host, 0, WaitMode::Immediate, 5.0), 1);
        assert_eq!(bench.reads.get(), 1);
        assert_eq!(host.realtime_steps, 0);
        assert_eq!(ports.delay.sleeps, 0);
        assert_eq!(host.output.as_str(), "[MSG:AUX0=1]\r\n");
    }

    #[test]
    fn input_inversion_is_per_port() {
        let bench = Bench::new();
        let mut ports = bench.ports();
        let mut host = MockHost::new();
        host.settings.invert_in = 0b10;

        assert_eq!(ports.wait_on_input(&mut host, 0, WaitMode::Immediate, 0.0), 0);
        assert_eq!(ports.wait_on_input(&mut host, 1, WaitMode::Immediate, 0.0), 1);
        assert_eq!(host.output.as_str(), "[MSG:AUX0=0]\r\n[MSG:AUX1=1]\r\n");
    }

    #[test]
    fn zero_timeout_never_yields() {
        let bench = Bench::new();
        let mut ports = bench.ports();
        let mut host = MockHost::new();

        assert_eq!(ports.wait_on_input(&mut host, 0, WaitMode::High, 0.0), -1);
        assert_eq!(host.realtime_steps, 0);
        assert_eq!(ports.delay.sleeps, 0);
        assert_eq!(host.output.as_str(), "[MSG:AUX0=fail]\r\n");
    }

    #[test]
    fn already_at_level_returns_without_yielding() {
        let bench = Bench::new();
        let mut ports = bench.ports();
        let mut host = MockHost::new();

        assert_eq!(ports.wait_on_input(&mut host, 1, WaitMode::Low, 10.0), 0);
        assert_eq!(host.realtime_steps, 0);
    }

    #[test]
    fn wait_for_high_is_satisfied_later() {
        let bench = Bench::new();
        let mut ports = bench.ports();
        let mut host = MockHost::new();
        host.realtime = Realtime::SetLevel {
            after: 3,
            level: &bench.inputs[0],
            to: true,
        };

        assert_eq!(
            ports.wait_for(&mut host, 0, WaitMode::High, 10.0),
            Some(WaitOutcome::Satisfied(true))
        );
        assert_eq!(host.realtime_steps, 3);
        assert_eq!(ports.delay.sleeps, 3);
        assert_eq!(ports.delay.total_ms, 150);
    }

    #[test]
    fn wait_times_out_after_budget() {
        let bench = Bench::new();
        bench.inputs[1].set(true);
        let mut ports = bench.ports();
        let mut host = MockHost::new();

        assert_eq!(
            ports.wait_for(&mut host, 1, WaitMode::Low, 0.5),
            Some(WaitOutcome::TimedOut)
        );
        assert_eq!(host.realtime_steps, 10);
        assert_eq!(ports.delay.total_ms, 500);
        assert_eq!(bench.reads.get(), 11);
    }

    #[test]
    fn change_waits_for_high() {
        let bench = Bench::new();
        bench.inputs[0].set(true);
        let mut ports = bench.ports();
        let mut host = MockHost::new();

        assert_eq!(ports.wait_on_input(&mut host, 0, WaitMode::Change, 1.0), 1);

        bench.inputs[0].set(false);
        assert_eq!(
            ports.wait_for(&mut host, 0, WaitMode::Change, 0.1),
            Some(WaitOutcome::TimedOut)
        );
    }

    #[test]
    fn abort_ends_wait_mid_countdown() {
        let bench = Bench::new();
        let mut ports = bench.ports();
        let mut host = MockHost::new();
        host.realtime = Realtime::RaiseAbort {
            after: 2,
            flag: &bench.abort,
        };

        assert_eq!(ports.wait_on_input(&mut host, 0, WaitMode::High, 100.0), -1);
        assert_eq!(host.realtime_steps, 2);
        assert_eq!(host.output.as_str(), "[MSG:AUX0=fail]\r\n");
    }

    #[test]
    fn pending_abort_beats_satisfied_level() {
        let bench = Bench::new();
        bench.inputs[0].set(true);
        bench.abort.raise();
        let mut ports = bench.ports();
        let mut host = MockHost::new();

        assert_eq!(
            ports.wait_for(&mut host, 0, WaitMode::High, 1.0),
            Some(WaitOutcome::Aborted)
        );
        assert_eq!(bench.reads.get(), 0);
    }

    #[test]
    fn refused_realtime_step_aborts() {
        let bench = Bench::new();
        let mut ports = bench.ports();
        let mut host = MockHost::new();
        host.realtime = Realtime::Refuse { after: 1 };

        assert_eq!(
            ports.wait_for(&mut host, 0, WaitMode::High, 1.0),
            Some(WaitOutcome::Aborted)
        );
        assert_eq!(host.realtime_steps, 1);
        assert_eq!(ports.delay.sleeps, 0);
    }

    #[test]
    fn inversion_toggles_only_changed_outputs() {
        let bench = Bench::new();
        let mut ports = bench.ports();
        let mut host = MockHost::new();

        ports.set_inversion(&mut host, 0b101).unwrap();
        assert_eq!(bench.levels(), [true, false, true]);
        assert_eq!(bench.transitions.get(), 2);
        assert_eq!(host.settings.invert_out, 0b101);
        assert_eq!(host.saves, 1);

        ports.set_inversion(&mut host, 0b101).unwrap();
        assert_eq!(bench.transitions.get(), 2);
        assert_eq!(host.saves, 1);

        ports.set_inversion(&mut host, 0xffff).unwrap();
        assert_eq!(host.settings.invert_out, 0b111);
        assert_eq!(bench.levels(), [true, true, true]);
        assert_eq!(bench.transitions.get(), 3);
    }

    #[test]
    fn inversion_on_load_redrives_all_outputs() {
        let bench = Bench::new();
        bench.outputs[0].set(true);
        let mut ports = bench.ports();
        let settings = IoPortSettings {
            invert_in: 0,
            invert_out: 0b110,
        };

        ports.apply_inversion_on_load(&settings);
        assert_eq!(bench.levels(), [false, true, true]);
    }

    #[test]
    fn settings_round_trip() {
        let bench = Bench::new();
        let mut ports = bench.ports();
        let mut host = MockHost::new();

        ports.set_setting(&mut host, SettingId::InvertOut, 0b011).unwrap();
        assert_eq!(ports.get_setting(&host, SettingId::InvertOut), 0b011);
        assert_eq!(bench.levels(), [true, true, false]);

        ports.set_setting(&mut host, SettingId::InvertIn, 0b1).unwrap();
        assert_eq!(ports.get_setting(&host, SettingId::InvertIn), 0b1);

        assert_eq!(
            ports.set_setting(&mut host, SettingId::InvertIn, 0x1_0000),
            Err(SettingError::InvalidValue)
        );
        assert_eq!(host.saves, 2);
    }

    #[test]
    fn pin_info_describes_ports() {
        let bench = Bench::new();
        let mut ports = bench.ports();

        ports.set_pin_description(Direction::Output, 2, "Coolant pump");
        let info = ports.get_pin_info(Direction::Output, 2).unwrap();
        assert_eq!(info.id, 2);
        assert_eq!(info.port_type, PortType::Digital);
        assert_eq!(info.port, PortId(2));
        assert_eq!(info.pin, 6);
        assert!(info.mode.output);
        assert_eq!(info.description, Some("Coolant pump"));

        assert_eq!(ports.num_inputs(), 2);
        assert_eq!(ports.num_outputs(), 3);
        assert_eq!(ports.out_mask(), 0b111);
    }
}
