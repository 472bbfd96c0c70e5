//! RP2040 hardware behind the auxiliary ports
//!
//! Auxiliary pins are taken over as [`DynPinId`] pins, so their numbers can
//! come from the board tables. Analog inputs are sampled with the single ADC
//! in one-shot mode; analog outputs drive one PWM slice each.
//!
//! The ADC and PWM registers are reached through the PAC's raw pointers, the
//! same way the HAL's own slice and channel types do: every converter shares
//! the one ADC, and a claimed slice is owned by exactly one [`SliceChannel`].

use fugit::HertzU32;
use grblhal_ports::{AdcAllocator, AdcConverter, AdcError, AdcInstance, AdcMapEntry, PortId};
use grblhal_ports::{PwmAllocator, PwmTimer};

use crate::adc_map::MAX_ADC_CHANNEL;
use crate::hal::{
    adc::AdcPin,
    gpio::{
        new_pin, DynBankId, DynFunction, DynPinId, DynPullType, FunctionPwm, FunctionSioInput,
        FunctionSioOutput, OutputEnableOverride, Pin, PullDown, PullNone, PullUp,
    },
    pac,
};

/// The only GPIO port of the RP2040, bank 0.
pub const BANK0: PortId = PortId(0);

/// Number of bank 0 GPIOs.
pub const NUM_GPIO: u8 = 30;

/// An auxiliary digital input.
pub type AuxInput = Pin<DynPinId, FunctionSioInput, PullUp>;

/// An auxiliary digital output.
pub type AuxOutput = Pin<DynPinId, FunctionSioOutput, PullDown>;

/// A pin handed to the ADC.
pub type AnalogPin = Pin<DynPinId, FunctionSioInput, PullNone>;

/// A pin driven by a PWM slice.
pub type PwmPin = Pin<DynPinId, FunctionPwm, PullNone>;

/// PWM slice driving `gpio`.
pub const fn pwm_slice(gpio: u8) -> u8 {
    (gpio >> 1) & 7
}

/// Channel of [`pwm_slice`] driving `gpio`, 0 for A and 1 for B.
pub const fn pwm_channel(gpio: u8) -> u8 {
    gpio & 1
}

/// Slice clock divider for a prescaler. The hardware reads 0 as 256.
const fn divider(prescaler: u32) -> u8 {
    if prescaler == 0 || prescaler > 255 {
        255
    } else {
        prescaler as u8
    }
}

/// Counter wrap value producing a period of `period` ticks.
const fn wrap(period: u32) -> u16 {
    if period == 0 {
        0
    } else if period > 0x1_0000 {
        0xFFFF
    } else {
        (period - 1) as u16
    }
}

/// Takes over bank 0 GPIO `gpio` in whatever state it is.
///
/// # Safety
///
/// No other handle to the pin may exist.
unsafe fn take_pin(gpio: u8) -> Option<Pin<DynPinId, DynFunction, DynPullType>> {
    if gpio >= NUM_GPIO {
        return None;
    }

    Some(new_pin(DynPinId {
        bank: DynBankId::Bank0,
        num: gpio,
    }))
}

/// Takes over `gpio` as an auxiliary input.
///
/// # Safety
///
/// No other handle to the pin may exist.
pub unsafe fn aux_input(gpio: u8) -> Option<AuxInput> {
    let pin = take_pin(gpio)?.try_into_function::<FunctionSioInput>().ok()?;
    Some(pin.into_pull_type::<PullUp>())
}

/// Takes over `gpio` as an auxiliary output, driven low.
///
/// # Safety
///
/// No other handle to the pin may exist.
pub unsafe fn aux_output(gpio: u8) -> Option<AuxOutput> {
    let pin = take_pin(gpio)?.try_into_function::<FunctionSioOutput>().ok()?;
    Some(pin.into_pull_type::<PullDown>())
}

fn adc_regs() -> &'static pac::adc::RegisterBlock {
    // SAFETY: conversions are only started by the analog port manager, one
    // at a time
    unsafe { &*pac::ADC::ptr() }
}

/// The ADC, as seen by one analog input.
pub struct Rp2040Adc {
    _pin: AdcPin<AnalogPin>,
}

impl AdcConverter for Rp2040Adc {
    fn instance(&self) -> AdcInstance {
        AdcInstance(0)
    }

    fn select_channel(&mut self, channel: u8) -> Result<(), AdcError> {
        if channel > MAX_ADC_CHANNEL {
            return Err(AdcError::Unavailable);
        }

        adc_regs()
            .cs()
            .modify(|_, w| unsafe { w.ainsel().bits(channel) });

        Ok(())
    }

    fn start(&mut self) -> Result<(), AdcError> {
        let cs = adc_regs().cs();

        if cs.read().en().bit_is_clear() {
            return Err(AdcError::Unavailable);
        }

        cs.modify(|_, w| w.start_once().set_bit());

        Ok(())
    }

    fn poll(&mut self) -> nb::Result<u16, AdcError> {
        let cs = adc_regs().cs().read();

        if cs.ready().bit_is_clear() {
            return Err(nb::Error::WouldBlock);
        }
        if cs.err().bit_is_set() {
            return Err(nb::Error::Other(AdcError::Conversion));
        }

        Ok(adc_regs().result().read().result().bits())
    }
}

/// Brings up the ADC for the analog inputs.
///
/// The ADC is reset and enabled on the first allocation.
pub struct AdcBank<'r> {
    device: Option<pac::ADC>,
    adc: Option<crate::hal::Adc>,
    resets: &'r mut pac::RESETS,
}

impl<'r> AdcBank<'r> {
    /// Takes ownership of the ADC peripheral.
    pub fn new(device: pac::ADC, resets: &'r mut pac::RESETS) -> Self {
        Self {
            device: Some(device),
            adc: None,
            resets,
        }
    }

    /// True once an input got the ADC.
    pub fn is_enabled(&self) -> bool {
        self.adc.is_some()
    }

    /// Releases the ADC driver, if it was brought up.
    pub fn free(self) -> Option<crate::hal::Adc> {
        self.adc
    }
}

impl AdcAllocator for AdcBank<'_> {
    type Converter = Rp2040Adc;

    fn allocate(&mut self, entry: &AdcMapEntry) -> Option<Rp2040Adc> {
        if entry.adc != AdcInstance(0) || entry.port != BANK0 {
            return None;
        }

        if self.adc.is_none() {
            let device = self.device.take()?;
            self.adc = Some(crate::hal::Adc::new(device, self.resets));
        }

        // SAFETY: board pins are unique and the typed pins were dropped
        let pin = unsafe { take_pin(entry.pin)? };
        let pin = pin
            .try_into_function::<FunctionSioInput>()
            .ok()?
            .into_pull_type::<PullNone>();

        let mut converter = Rp2040Adc {
            _pin: AdcPin::new(pin).ok()?,
        };
        converter.select_channel(entry.channel).ok()?;

        Some(converter)
    }
}

/// Hands out PWM slices to analog outputs, one output per slice.
#[derive(Debug)]
pub struct PwmSlices {
    claimed: u8,
    clock: HertzU32,
}

impl PwmSlices {
    /// Brings the PWM block out of reset. `clock` is the system clock the
    /// slices count.
    pub fn new(pwm: pac::PWM, resets: &mut pac::RESETS, clock: HertzU32) -> Self {
        let _ = crate::hal::pwm::Slices::new(pwm, resets).free();

        Self { claimed: 0, clock }
    }

    /// Marks the slice of `gpio` as used elsewhere, e.g. by the spindle.
    pub fn reserve(&mut self, gpio: u8) {
        if gpio < NUM_GPIO {
            self.claimed |= 1 << pwm_slice(gpio);
        }
    }

    /// True if the slice driving `gpio` is taken.
    pub fn is_claimed(&self, gpio: u8) -> bool {
        self.claimed & (1 << pwm_slice(gpio)) != 0
    }
}

impl PwmAllocator for PwmSlices {
    type Timer = SliceChannel;

    fn claim(&mut self, port: PortId, pin: u8) -> Option<SliceChannel> {
        if port != BANK0 || pin >= NUM_GPIO || self.is_claimed(pin) {
            return None;
        }

        // SAFETY: board pins are unique and the typed pins were dropped
        let gpio = unsafe { take_pin(pin)? };
        let gpio = gpio
            .try_into_function::<FunctionPwm>()
            .ok()?
            .into_pull_type::<PullNone>();

        self.claimed |= 1 << pwm_slice(pin);

        let mut channel = SliceChannel {
            slice: pwm_slice(pin),
            channel: pwm_channel(pin),
            pin: gpio,
            clock: self.clock,
        };
        channel.set_output_enabled(false);

        Some(channel)
    }
}

/// One channel of a PWM slice, with the slice to itself.
pub struct SliceChannel {
    slice: u8,
    channel: u8,
    pin: PwmPin,
    clock: HertzU32,
}

impl SliceChannel {
    /// The slice driving this channel.
    pub fn slice(&self) -> u8 {
        self.slice
    }

    fn regs(&self) -> &pac::pwm::CH {
        // SAFETY: the slice was claimed for this channel only
        unsafe { (*pac::PWM::ptr()).ch(self.slice as usize) }
    }
}

impl PwmTimer for SliceChannel {
    const MAX_COUNT: u32 = 0xFFFF;
    const MAX_PRESCALER: u32 = 255;

    fn clock(&self) -> HertzU32 {
        self.clock
    }

    fn configure(&mut self, prescaler: u32, period: u32, invert: bool) {
        let ch = self.regs();
        let b = self.channel == 1;

        ch.csr().write(|w| w.en().clear_bit());
        ch.div()
            .write(|w| unsafe { w.int().bits(divider(prescaler)).frac().bits(0) });
        ch.top().write(|w| unsafe { w.top().bits(wrap(period)) });
        ch.ctr().write(|w| unsafe { w.ctr().bits(0) });
        ch.csr().write(|w| {
            if b {
                w.b_inv().bit(invert);
            } else {
                w.a_inv().bit(invert);
            }
            w.divmode().div().en().set_bit()
        });
    }

    fn set_compare(&mut self, value: u32) {
        let value = value.min(0xFFFF) as u16;

        if self.channel == 1 {
            self.regs().cc().modify(|_, w| unsafe { w.b().bits(value) });
        } else {
            self.regs().cc().modify(|_, w| unsafe { w.a().bits(value) });
        }
    }

    fn set_output_enabled(&mut self, enabled: bool) {
        self.pin.set_output_enable_override(if enabled {
            OutputEnableOverride::Normal
        } else {
            OutputEnableOverride::Disable
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_of_pin() {
        assert_eq!(pwm_slice(0), 0);
        assert_eq!(pwm_slice(1), 0);
        assert_eq!(pwm_slice(14), 7);
        assert_eq!(pwm_slice(15), 7);
        assert_eq!(pwm_slice(16), 0);
        assert_eq!(pwm_slice(24), 4);
        assert_eq!(pwm_slice(28), 6);
        assert_eq!(pwm_slice(29), 6);
    }

    #[test]
    fn channel_of_pin() {
        assert_eq!(pwm_channel(14), 0);
        assert_eq!(pwm_channel(15), 1);
        assert_eq!(pwm_channel(29), 1);
    }

    #[test]
    fn divider_range() {
        assert_eq!(divider(1), 1);
        assert_eq!(divider(255), 255);
        assert_eq!(divider(0), 255);
        assert_eq!(divider(300), 255);
    }

    #[test]
    fn wrap_is_period_minus_one() {
        assert_eq!(wrap(25_000), 24_999);
        assert_eq!(wrap(1), 0);
        assert_eq!(wrap(0x1_0000), 0xFFFF);
        assert_eq!(wrap(0x2_0000), 0xFFFF);
        assert_eq!(wrap(0), 0);
    }

    #[test]
    fn timer_limits_fit_registers() {
        assert!(wrap(SliceChannel::MAX_COUNT) as u32 + 1 == SliceChannel::MAX_COUNT);
        assert_eq!(divider(SliceChannel::MAX_PRESCALER) as u32, SliceChannel::MAX_PRESCALER);
    }
}
