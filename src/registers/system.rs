//! System-related registers
//!
//! This module contains registers for chip identity and system-level
//! configuration including:
//! - Silicon revision and scratch (chip-presence) checks
//! - Power mode sequencing
//! - Power status monitoring
//! - Crystal oscillator load capacitance and tuning
//!
//! These registers control fundamental power and clocking behavior of the
//! device. Proper configuration is essential for reliable operation.

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Silicon revision register (address: 0x000)
///
/// Reads back the silicon revision of the device. Used during
/// initialisation to confirm that a supported chip is attached before any
/// further configuration is attempted.
#[register(0x0000u16)]
#[derive(Debug, Clone, Copy, ReadableRegister)]
pub struct Revision {
    /// Raw revision byte
    pub value: u8,
}

impl Revision {
    /// Revision reported by production silicon
    pub const PRODUCTION: u8 = 0x51;
}

/// Scratch register (address: 0x001)
///
/// General purpose read/write byte with a fixed reset value. Reading the
/// reset sentinel back is the cheapest way to confirm a responsive chip is
/// present on the bus before trusting any other register contents.
#[register(0x0001u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct Scratch {
    /// Scratch byte
    pub value: u8,
}

impl Scratch {
    /// Reset value of the scratch register
    pub const SENTINEL: u8 = 0xC5;
}

/// Error type for power mode conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidPowerMode(pub u8);

/// Operating power mode
///
/// Selects which blocks of the chip are powered. Register programming is
/// only reliable from `Standby` upwards; the synthesiser must be running
/// (`SynthTx`/`SynthRx` or the full modes) before ranging or channel use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerMode {
    /// All blocks off, register file retained
    #[default]
    Powerdown = 0x0,
    /// Register file lost, lowest current draw
    DeepSleep = 0x1,
    /// Crystal oscillator and reference running
    Standby = 0x5,
    /// Standby plus FIFO powered
    FifoOn = 0x7,
    /// Synthesiser running, receiver off
    SynthRx = 0x8,
    /// Full receive mode
    FullRx = 0x9,
    /// Wake-on-radio receive
    WorRx = 0xB,
    /// Synthesiser running, transmitter off
    SynthTx = 0xC,
    /// Full transmit mode
    FullTx = 0xD,
}

impl PowerMode {
    /// Convert a raw mode nibble to a PowerMode
    pub fn from_nibble(value: u8) -> Result<Self, InvalidPowerMode> {
        match value & 0x0F {
            0x0 => Ok(Self::Powerdown),
            0x1 => Ok(Self::DeepSleep),
            0x5 => Ok(Self::Standby),
            0x7 => Ok(Self::FifoOn),
            0x8 => Ok(Self::SynthRx),
            0x9 => Ok(Self::FullRx),
            0xB => Ok(Self::WorRx),
            0xC => Ok(Self::SynthTx),
            0xD => Ok(Self::FullTx),
            invalid => Err(InvalidPowerMode(invalid)),
        }
    }
}

/// Power mode register (address: 0x002)
///
/// Sequences the chip through its power modes and carries the reset bit.
///
/// # Important Notes
/// - Setting `reset` while writing any mode performs a register file reset;
///   clear it on the next write to release the chip
/// - `xo_enable` keeps the crystal oscillator running across mode changes
/// - `ref_enable` keeps the internal reference powered; both are required
///   before the synthesiser can be started
#[register(0x0002u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct PwrMode {
    /// Selected power mode
    pub mode: PowerMode,
    /// Keep the crystal oscillator enabled
    pub xo_enable: bool,
    /// Keep the internal reference enabled
    pub ref_enable: bool,
    /// Chip reset bit
    pub reset: bool,
}

impl PwrMode {
    const XOEN: u8 = 0x40;
    const REFEN: u8 = 0x20;
    const RST: u8 = 0x80;
}

impl Default for PwrMode {
    fn default() -> Self {
        Self {
            mode: PowerMode::Powerdown,
            xo_enable: false,
            ref_enable: false,
            reset: false,
        }
    }
}

impl FromByteArray for PwrMode {
    type Error = InvalidPowerMode;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            mode: PowerMode::from_nibble(bytes[0])?,
            xo_enable: bytes[0] & Self::XOEN != 0,
            ref_enable: bytes[0] & Self::REFEN != 0,
            reset: bytes[0] & Self::RST != 0,
        })
    }
}

impl ToByteArray for PwrMode {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let mut byte = self.mode as u8;
        if self.xo_enable {
            byte |= Self::XOEN;
        }
        if self.ref_enable {
            byte |= Self::REFEN;
        }
        if self.reset {
            byte |= Self::RST;
        }
        Ok([byte])
    }
}

bitflags::bitflags! {
    /// Power status flags, as read from [`PowStat`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PowerStatus: u8 {
        /// IO voltage good
        const VIO = 1 << 0;
        /// Modem domain brownout
        const BROWNOUT_MODEM = 1 << 1;
        /// Analog domain brownout
        const BROWNOUT_ANALOG = 1 << 2;
        /// Modem domain voltage good
        const VMODEM = 1 << 3;
        /// Analog domain voltage good
        const VANA = 1 << 4;
        /// Reference voltage good
        const VREF = 1 << 5;
        /// Reference powered
        const REF = 1 << 6;
        /// Summary: all monitored rails good
        const SUM = 1 << 7;
    }
}

/// Power status register (address: 0x003)
///
/// Live view of the internal supply monitors.
#[register(0x0003u16)]
#[derive(Debug, Clone, Copy, ReadableRegister)]
pub struct PowStat {
    /// Current power status flags
    pub status: PowerStatus,
}

impl FromByteArray for PowStat {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            status: PowerStatus::from_bits_truncate(bytes[0]),
        })
    }
}

/// Crystal load capacitance register (address: 0x184)
///
/// Programs the internal tuning capacitance applied to the crystal pins.
///
/// # Encoding
/// - 0x00 = minimum capacitance (3 pF)
/// - otherwise capacitance = (value + 16) / 2 pF, up to 39.5 pF in
///   0.5 pF steps
///
/// # Important Notes
/// - Must be 0x00 when an external clock or TCXO drives the clock input
#[register(0x0184u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct XtalCap {
    /// Encoded tuning capacitance
    pub value: u8,
}

/// Oscillator tuning register (address: 0xF35)
///
/// Selects the internal reference path according to the crystal division
/// factor in use. The value is keyed purely off whether the external clock
/// is divided before it reaches the reference.
#[register(0x0F35u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub enum PerfF35 {
    /// External clock used undivided (below the divider threshold)
    XtalDiv1,
    /// External clock divided by two
    XtalDiv2,
}

/// Error type for oscillator tuning conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTuning(pub u8);

impl FromByteArray for PerfF35 {
    type Error = InvalidTuning;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        match bytes[0] {
            0x10 => Ok(Self::XtalDiv1),
            0x11 => Ok(Self::XtalDiv2),
            invalid => Err(InvalidTuning(invalid)),
        }
    }
}

impl ToByteArray for PerfF35 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([match self {
            Self::XtalDiv1 => 0x10,
            Self::XtalDiv2 => 0x11,
        }])
    }
}

impl FromByteArray for Revision {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { value: bytes[0] })
    }
}

impl FromByteArray for Scratch {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { value: bytes[0] })
    }
}

impl ToByteArray for Scratch {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.value])
    }
}

impl FromByteArray for XtalCap {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: bytes[0] & 0x3F,
        })
    }
}

impl ToByteArray for XtalCap {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.value & 0x3F])
    }
}
