//! grblHAL board support for RP2040 based CNC controllers
//!
//! Pin maps of the supported boards, the RP2040 ADC channel map, clock
//! bring-up and the RP2040 side of the auxiliary I/O ports. The port logic
//! itself lives in [`grblhal_ports`].
//!
//! ```ignore
//! static ABORT: AbortFlag = AbortFlag::new();
//!
//! #[entry]
//! fn main() -> ! {
//!     let pac = pac::Peripherals::take().unwrap();
//!     let board = grblhal_rp2040::boot(pac, Core::new(), &ABORT);
//!
//!     grbl_enter(board.ports)
//! }
//! ```

#![deny(missing_docs)]
#![no_std]

pub extern crate rp2040_hal as hal;

#[cfg(feature = "rt")]
extern crate cortex_m_rt;
#[cfg(feature = "rt")]
pub use cortex_m_rt::entry;

/// The linker will place this boot block at the start of our program image. We
/// need this to help the ROM bootloader get our code up and running.
#[cfg(feature = "boot2")]
#[link_section = ".boot2"]
#[no_mangle]
#[used]
pub static BOOT2_FIRMWARE: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;

pub use hal::pac;

pub mod adc_map;
pub mod board;
pub mod clocks;
pub mod driver;
pub mod ports;

pub use board::{BoardConfig, BOARD};
pub use driver::{board_init, boot, AuxPeripherals, Board, BoardPorts};
pub use grblhal_ports;
