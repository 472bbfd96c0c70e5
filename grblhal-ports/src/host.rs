//! Contract with the firmware core
//!
//! The port managers never run on their own: the firmware core calls them
//! through [`PortDispatch`] and they call back into the core through
//! [`Host`]. The only state shared with interrupt context is the
//! [`AbortFlag`].

use core::sync::atomic::{AtomicBool, Ordering};

use crate::{
    digital::WaitMode,
    port::{Direction, PinInfo, PortType},
    settings::IoPortSettings,
};

/// Services the firmware core provides to the port managers.
pub trait Host {
    /// Runs one realtime-processing step of the core.
    ///
    /// Returns `false` when the core wants the caller to bail out (an abort is
    /// pending).
    fn execute_realtime(&mut self) -> bool;

    /// Writes `s` to the active output stream.
    fn stream_write(&mut self, s: &str);

    /// Persisted auxiliary port settings.
    fn settings(&self) -> &IoPortSettings;

    /// Mutable access to the persisted auxiliary port settings.
    ///
    /// Changes are only written to non-volatile storage by
    /// [`Host::save_settings`].
    fn settings_mut(&mut self) -> &mut IoPortSettings;

    /// Writes the global settings to non-volatile storage.
    fn save_settings(&mut self);

    /// Claims `port` for `description`, taking it out of the pool of free
    /// ports. Returns `false` if the core refused the claim.
    fn claim(
        &mut self,
        port_type: PortType,
        direction: Direction,
        port: u8,
        description: &'static str,
    ) -> bool;
}

/// Abort request raised by the core's realtime layer.
///
/// Set from interrupt context, polled by the blocking input wait. Only
/// atomic loads and stores are used so it works on cores without
/// compare-and-swap.
#[derive(Debug)]
pub struct AbortFlag(AtomicBool);

impl AbortFlag {
    /// Creates a cleared flag.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Requests an abort.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Acknowledges the abort.
    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    /// True while an abort is pending.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for AbortFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// The auxiliary port slots of the firmware core's HAL.
///
/// A board support package hands an implementor of this trait to the core
/// once at start-up; the core then routes every M62-M68 request through it.
pub trait PortDispatch {
    /// Number of ports of the given type and direction.
    fn num_ports(&self, port_type: PortType, direction: Direction) -> u8;

    /// Sets digital output `port`. Out-of-range ports are ignored.
    fn digital_out(&mut self, port: u8, on: bool);

    /// Sets analog output `port` to `value`. Returns `false` for out-of-range
    /// ports.
    fn analog_out(&mut self, port: u8, value: f32) -> bool;

    /// Samples input `port`, optionally waiting for a level. Returns the
    /// sample, or -1 on failure.
    fn wait_on_input(&mut self, port_type: PortType, port: u8, mode: WaitMode, timeout: f32)
        -> i32;

    /// Snapshot of a port, `None` when out of range.
    fn get_pin_info(&self, port_type: PortType, direction: Direction, port: u8) -> Option<PinInfo>;

    /// Sets the description of a port.
    fn set_pin_description(
        &mut self,
        port_type: PortType,
        direction: Direction,
        port: u8,
        description: &'static str,
    );
}
