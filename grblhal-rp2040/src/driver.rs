//! Board bring-up
//!
//! [`boot`] runs the whole sequence: clocks first, then the auxiliary
//! ports of the selected [`BOARD`](crate::board::BOARD). Firmware that sets
//! up the clocks itself calls [`board_init`] directly.

use heapless::Vec;

use grblhal_ports::{
    AbortFlag, AnalogPorts, DigitalPorts, Host, InputSignal, IoPorts, OutputSignal,
    PinCapabilities, PinDef, PinFunction, Pull, MAX_AUX_PORTS,
};

use crate::{
    adc_map::ADC_MAP,
    board::{BoardConfig, BOARD},
    clocks::{self, ClockPeripherals},
    hal::{clocks::ClocksManager, gpio::Pins, pac, Clock, Sio, Timer, Watchdog},
    ports::{
        aux_input, aux_output, AdcBank, AuxInput, AuxOutput, PwmSlices, Rp2040Adc, BANK0,
    },
};

/// The auxiliary port context of this board.
pub type BoardPorts<'a, H> =
    IoPorts<'a, H, AuxInput, AuxOutput, Timer, Rp2040Adc, PwmSlices>;

/// Peripherals consumed by [`board_init`].
pub struct AuxPeripherals {
    /// GPIO bank 0
    pub io_bank0: pac::IO_BANK0,
    /// Pads of bank 0
    pub pads_bank0: pac::PADS_BANK0,
    /// Single-cycle IO
    pub sio: pac::SIO,
    /// ADC
    pub adc: pac::ADC,
    /// PWM slices
    pub pwm: pac::PWM,
    /// Microsecond timer, used for the input wait delays
    pub timer: pac::TIMER,
}

/// Everything a running board hands back to the firmware.
pub struct Board<'a, H> {
    /// Auxiliary ports, to be registered as the core's port dispatch
    pub ports: BoardPorts<'a, H>,
    /// Frozen clock tree
    pub clocks: ClocksManager,
    /// Watchdog, ticking from the crystal
    pub watchdog: Watchdog,
}

/// Brings up clocks and auxiliary ports from reset.
pub fn boot<H: Host>(pac: pac::Peripherals, host: H, abort: &AbortFlag) -> Board<'_, H> {
    let mut resets = pac.RESETS;
    let mut watchdog = Watchdog::new(pac.WATCHDOG);
    let clocks = clocks::init(
        BOARD.xosc,
        ClockPeripherals {
            xosc: pac.XOSC,
            clocks: pac.CLOCKS,
            pll_sys: pac.PLL_SYS,
            pll_usb: pac.PLL_USB,
        },
        &mut resets,
        &mut watchdog,
    );

    let aux = AuxPeripherals {
        io_bank0: pac.IO_BANK0,
        pads_bank0: pac.PADS_BANK0,
        sio: pac.SIO,
        adc: pac.ADC,
        pwm: pac.PWM,
        timer: pac.TIMER,
    };
    let ports = board_init(&BOARD, host, aux, &mut resets, &clocks, abort);

    Board {
        ports,
        clocks,
        watchdog,
    }
}

/// Puts the auxiliary ports of `board` into service.
///
/// Pins that cannot take their function are left out of the port list, so
/// port numbers stay dense.
pub fn board_init<'a, H: Host>(
    board: &BoardConfig,
    host: H,
    aux: AuxPeripherals,
    resets: &mut pac::RESETS,
    clocks: &ClocksManager,
    abort: &'a AbortFlag,
) -> BoardPorts<'a, H> {
    let sio = Sio::new(aux.sio);
    // Takes IO_BANK0 and PADS_BANK0 out of reset; pins are taken over by
    // number below
    let _ = Pins::new(aux.io_bank0, aux.pads_bank0, sio.gpio_bank0, resets);

    let timer = Timer::new(aux.timer, resets, clocks);

    let in_cap = PinCapabilities {
        input: true,
        irq: true,
        pull: true,
        ..PinCapabilities::default()
    };
    let inputs = board.aux_inputs.iter().filter_map(|&gpio| {
        // SAFETY: board pins are unique and the typed pins were dropped
        let pin = unsafe { aux_input(gpio) }?;
        let mut signal = InputSignal::new(BANK0, gpio, in_cap, pin);
        signal.function = PinFunction::AuxInput;
        signal.mode.pull = Pull::Up;
        Some(signal)
    });

    let out_cap = PinCapabilities {
        output: true,
        ..PinCapabilities::default()
    };
    let outputs = board.aux_outputs.iter().filter_map(|&gpio| {
        // SAFETY: as above
        let pin = unsafe { aux_output(gpio) }?;
        let mut signal = OutputSignal::new(BANK0, gpio, out_cap, pin);
        signal.function = PinFunction::AuxOutput;
        Some(signal)
    });

    let digital = DigitalPorts::new(inputs, outputs, timer, abort);

    let analog_in = pin_defs(board.analog_inputs);
    let analog_out = pin_defs(board.analog_outputs);

    let mut pwm = PwmSlices::new(aux.pwm, resets, clocks.system_clock.freq());
    if let Some(gpio) = board.spindle.pwm {
        pwm.reserve(gpio);
    }

    let mut adc = AdcBank::new(aux.adc, resets);
    let analog = AnalogPorts::new(&analog_in, &analog_out, ADC_MAP, &mut adc, pwm);
    #[cfg(feature = "defmt")]
    if !adc.is_enabled() && !analog_in.is_empty() {
        defmt::warn!("{}: ADC not brought up", board.name);
    }

    #[cfg(feature = "defmt")]
    defmt::info!(
        "{}: {} digital in, {} digital out, {} analog in, {} analog out",
        board.name,
        digital.num_inputs(),
        digital.num_outputs(),
        analog.num_inputs(),
        analog.num_outputs()
    );

    IoPorts::new(host, digital, analog)
}

fn pin_defs(pins: &[u8]) -> Vec<PinDef, MAX_AUX_PORTS> {
    pins.iter()
        .take(MAX_AUX_PORTS)
        .map(|&pin| PinDef::new(BANK0, pin))
        .collect()
}
