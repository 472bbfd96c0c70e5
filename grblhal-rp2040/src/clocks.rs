//! Clock and boot sequencing
//!
//! Brings up the crystal oscillator, both PLLs and the clock tree once at
//! boot. The firmware cannot run on a half configured clock tree, so a
//! failure here is final.

use fugit::HertzU32;

use crate::hal::{
    clocks::{init_clocks_and_plls, ClocksManager},
    pac, Watchdog,
};

/// Clock peripherals consumed by [`init`].
pub struct ClockPeripherals {
    /// Crystal oscillator
    pub xosc: pac::XOSC,
    /// Clock generators
    pub clocks: pac::CLOCKS,
    /// System PLL
    pub pll_sys: pac::PLL_SYS,
    /// USB PLL
    pub pll_usb: pac::PLL_USB,
}

/// Starts the crystal oscillator at `xosc`, the system PLL at 125MHz and
/// the USB PLL at 48MHz, then switches the clock tree over.
///
/// Never returns on failure: see [`halt`].
pub fn init(
    xosc: HertzU32,
    peripherals: ClockPeripherals,
    resets: &mut pac::RESETS,
    watchdog: &mut Watchdog,
) -> ClocksManager {
    let ClockPeripherals {
        xosc: xosc_dev,
        clocks,
        pll_sys,
        pll_usb,
    } = peripherals;

    match init_clocks_and_plls(
        xosc.to_Hz(),
        xosc_dev,
        clocks,
        pll_sys,
        pll_usb,
        resets,
        watchdog,
    ) {
        Ok(clocks) => {
            #[cfg(feature = "defmt")]
            defmt::info!(
                "system clock {} Hz, peripheral clock {} Hz",
                crate::hal::Clock::freq(&clocks.system_clock).to_Hz(),
                crate::hal::Clock::freq(&clocks.peripheral_clock).to_Hz()
            );
            clocks
        }
        Err(_e) => {
            #[cfg(feature = "defmt")]
            defmt::error!("clock setup failed, crystal {} Hz", xosc.to_Hz());
            halt()
        }
    }
}

/// Disables interrupts and stops.
pub fn halt() -> ! {
    cortex_m::interrupt::disable();

    loop {
        cortex_m::asm::wfi();
    }
}
