//! The auxiliary port context
//!
//! [`IoPorts`] owns the digital and analog managers together with the host
//! handle, and is what a board hands to the firmware core as its
//! [`PortDispatch`].

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, StatefulOutputPin},
};

use crate::{
    analog::{AdcConverter, AnalogPorts},
    digital::{report_aux_value, DigitalPorts, WaitMode},
    host::{Host, PortDispatch},
    port::{Direction, PinFunction, PinInfo, PortType},
    pwm::{PwmAllocator, PwmConfig},
    settings::{AuxPortSettings, SettingError, SettingId},
};

/// Digital and analog auxiliary ports of a board.
pub struct IoPorts<'a, H, DI, DO, D, A, PA: PwmAllocator> {
    host: H,
    digital: DigitalPorts<'a, DI, DO, D>,
    analog: AnalogPorts<A, PA>,
}

impl<'a, H, DI, DO, D, A, PA> IoPorts<'a, H, DI, DO, D, A, PA>
where
    H: Host,
    DI: InputPin,
    DO: StatefulOutputPin,
    D: DelayNs,
    A: AdcConverter,
    PA: PwmAllocator,
{
    /// Puts the ports into service.
    ///
    /// Every analog output gets [`PwmConfig::AUX_DEFAULT`] and the digital
    /// outputs are driven to their inverted-off levels.
    pub fn new(
        mut host: H,
        mut digital: DigitalPorts<'a, DI, DO, D>,
        mut analog: AnalogPorts<A, PA>,
    ) -> Self {
        for port in 0..analog.num_outputs() {
            analog.configure_output(&mut host, port, &PwmConfig::AUX_DEFAULT);
        }

        digital.apply_inversion_on_load(host.settings());

        Self {
            host,
            digital,
            analog,
        }
    }

    /// Settings description to register with the core's report chain.
    pub fn aux_settings(&self) -> AuxPortSettings {
        AuxPortSettings::new(self.digital.num_inputs(), self.digital.num_outputs())
    }

    /// Re-applies the persisted settings after the core (re)loaded them.
    pub fn settings_changed(&mut self) {
        self.digital.apply_inversion_on_load(self.host.settings());
    }

    /// Handles `$<id>=<value>` for the auxiliary port settings.
    pub fn set_setting(&mut self, id: u16, value: u32) -> Result<(), SettingError> {
        let id = SettingId::try_from(id)?;
        self.digital.set_setting(&mut self.host, id, value)
    }

    /// Reads an auxiliary port setting.
    pub fn get_setting(&self, id: u16) -> Result<u32, SettingError> {
        let id = SettingId::try_from(id)?;
        Ok(self.digital.get_setting(&self.host, id))
    }

    /// Reconfigures analog output `port`. See
    /// [`AnalogPorts::configure_output`].
    pub fn configure_output(&mut self, port: u8, config: &PwmConfig) -> bool {
        self.analog.configure_output(&mut self.host, port, config)
    }

    /// Assigns a logical role to an analog port.
    pub fn set_analog_function(
        &mut self,
        direction: Direction,
        port: u8,
        function: PinFunction,
    ) -> bool {
        self.analog.set_function(direction, port, function)
    }

    /// The host handle.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host handle.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The digital ports.
    pub fn digital(&self) -> &DigitalPorts<'a, DI, DO, D> {
        &self.digital
    }

    /// The analog ports.
    pub fn analog(&self) -> &AnalogPorts<A, PA> {
        &self.analog
    }
}

impl<H, DI, DO, D, A, PA> PortDispatch for IoPorts<'_, H, DI, DO, D, A, PA>
where
    H: Host,
    DI: InputPin,
    DO: StatefulOutputPin,
    D: DelayNs,
    A: AdcConverter,
    PA: PwmAllocator,
{
    fn num_ports(&self, port_type: PortType, direction: Direction) -> u8 {
        match (port_type, direction) {
            (PortType::Digital, Direction::Input) => self.digital.num_inputs(),
            (PortType::Digital, Direction::Output) => self.digital.num_outputs(),
            (PortType::Analog, Direction::Input) => self.analog.num_inputs(),
            (PortType::Analog, Direction::Output) => self.analog.num_outputs(),
        }
    }

    fn digital_out(&mut self, port: u8, on: bool) {
        self.digital.digital_write(self.host.settings(), port, on);
    }

    fn analog_out(&mut self, port: u8, value: f32) -> bool {
        self.analog.write_output(port, value)
    }

    fn wait_on_input(&mut self, port_type: PortType, port: u8, mode: WaitMode, timeout: f32) -> i32 {
        match port_type {
            PortType::Digital => self.digital.wait_on_input(&mut self.host, port, mode, timeout),
            PortType::Analog => {
                let value = self.analog.read_input(port);
                report_aux_value(&mut self.host, port, value);
                value
            }
        }
    }

    fn get_pin_info(&self, port_type: PortType, direction: Direction, port: u8) -> Option<PinInfo> {
        match port_type {
            PortType::Digital => self.digital.get_pin_info(direction, port),
            PortType::Analog => self.analog.get_pin_info(direction, port),
        }
    }

    fn set_pin_description(
        &mut self,
        port_type: PortType,
        direction: Direction,
        port: u8,
        description: &'static str,
    ) {
        match port_type {
            PortType::Digital => self.digital.set_pin_description(direction, port, description),
            PortType::Analog => self.analog.set_pin_description(direction, port, description),
        }
    }
}
