#![no_std]
//! AX5043 Radio Driver
//!
//! This crate provides a type-safe interface for the ON Semiconductor
//! AX5043 sub-GHz radio transceiver. The AX5043 is a highly integrated,
//! narrow-band CMOS transceiver for license-free ISM band applications.
//!
//! # Features
//! - Frequency range: 54-525 MHz (divided VCO) and 525-1050 MHz (direct)
//! - Modulation support: (A)FSK with HDLC, raw and wM-Bus framing
//! - Crystal or TCXO clock sources with automatic divider resolution
//! - Closed-loop VCO autoranging with bounded polling
//! - Packet transmit/receive through the 256-byte chunked FIFO
//!
//! # Architecture
//! The driver is organized into several modules:
//!
//! - [`device`]: Byte-transport boundary
//!   - Wraps the host-injected SPI interface
//!   - One register or FIFO access per atomic bus exchange
//!
//! - [`registers`]: Register definitions for direct hardware access
//!   - [`registers::system`]: Identity, power and oscillator registers
//!   - [`registers::synth`]: PLL, frequency word and ranging registers
//!   - [`registers::modem`]: Modulation, datarate and AFC registers
//!   - [`registers::fifo`]: FIFO, packet flag and chunk definitions
//!
//! - [`config`]: Host configuration and clock resolution
//! - [`modulation`]: Modulation descriptors and parameter resolution
//! - [`synth`]: Frequency conversion, divider selection, autoranging
//! - [`radio`]: The init/TX/RX lifecycle state machine
//!
//! # Usage
//! The main entry point is the [`Ax5043`] struct, which owns the SPI
//! interface, the host [`Config`] and the receive callback.
//!
//! Operation follows a specific sequence:
//!
//! 1. Populate a [`Config`] (clock source, synthesiser frequencies)
//! 2. Create the radio with [`Ax5043::new`] (or
//!    [`Ax5043::with_tcxo`] when a TCXO enable pin exists)
//! 3. Call [`Ax5043::init`] to verify chip presence
//! 4. Build a [`Modulation`] descriptor for the link
//! 5. Enter a mode with [`Ax5043::tx_on`] / [`Ax5043::rx_on`]
//! 6. Move packets with [`Ax5043::tx_packet`] /
//!    [`Ax5043::poll_receive`]; [`Ax5043::stop`] returns to idle
//!
//! # Important Notes
//! - One radio value per physical chip; the host must serialize all calls
//! - All operations are synchronous and blocking
//! - Mode entry failures back the chip out to standby and leave the
//!   lifecycle state unchanged, so a corrected retry is always safe
//! - Derived configuration (clock divider, dividers, VCO ranges, AFC
//!   window) is written back into the host-owned config, never copied
//!
//! # Example
//! ```no_run
//! use embedded_hal::spi::SpiDevice;
//! use ax5043::{Ax5043, ClockSource, Config, Error, Modulation};
//!
//! fn beacon<SPI: SpiDevice>(spi: SPI) -> Result<(), Error> {
//!     let mut config = Config::new(
//!         ClockSource::Crystal {
//!             load_capacitance: 17.0,
//!         },
//!         16_000_000,
//!         50,
//!     );
//!     config.synth_a.set_frequency(433_920_000);
//!
//!     let mut radio = Ax5043::new(spi, config, |_frame, _flags| {});
//!     radio.init()?;
//!
//!     let mut modulation = Modulation::fsk(9600, 0.5);
//!     modulation.power = 0.5;
//!     radio.tx_on(&mut modulation)?;
//!     radio.tx_packet(b"hello")?;
//!     radio.stop()
//! }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod modulation;
pub mod radio;
pub mod registers;
pub mod synth;

pub use config::{ClockConfig, ClockSource, Config, NoTcxo, RfDiv, SynthSel, Synthesiser};
pub use device::Device;
pub use error::Error;
pub use modulation::{Modulation, Resolved, SchemeParams};
pub use radio::{Ax5043, State, MAX_PACKET_LEN};
pub use registers::*;
