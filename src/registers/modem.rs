//! Modem configuration registers
//!
//! This module contains registers deriving the air interface from the
//! resolved modulation parameters:
//! - Modulation scheme, bit encoding and framing mode
//! - Receiver decimation and data rate recovery
//! - AFC carrier offset limits
//! - Transmit rate, deviation, AFSK tone generation and output power
//!
//! The receiver-side values are computed by the modulation resolver from
//! the requested link bitrate; writing inconsistent decimation/datarate
//! pairs silently degrades the link rather than failing.

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Error type for modulation mode conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidModulationMode(pub u8);

/// Modulation scheme selector, as written to [`ModulationReg`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModulationMode {
    /// Plain amplitude shift keying
    Ask = 0x0,
    /// Coherent amplitude shift keying
    AskCoherent = 0x1,
    /// Phase shift keying
    Psk = 0x4,
    /// Offset quadrature phase shift keying
    Oqpsk = 0x6,
    /// Minimum shift keying
    Msk = 0x7,
    /// Frequency shift keying
    Fsk = 0x8,
    /// Four level frequency shift keying
    Fsk4 = 0x9,
    /// Audio frequency shift keying
    Afsk = 0xA,
    /// Analog frequency modulation
    Fm = 0xB,
}

impl ModulationMode {
    /// Convert a raw register value to a ModulationMode
    pub fn from_byte(value: u8) -> Result<Self, InvalidModulationMode> {
        match value & 0x0F {
            0x0 => Ok(Self::Ask),
            0x1 => Ok(Self::AskCoherent),
            0x4 => Ok(Self::Psk),
            0x6 => Ok(Self::Oqpsk),
            0x7 => Ok(Self::Msk),
            0x8 => Ok(Self::Fsk),
            0x9 => Ok(Self::Fsk4),
            0xA => Ok(Self::Afsk),
            0xB => Ok(Self::Fm),
            invalid => Err(InvalidModulationMode(invalid)),
        }
    }
}

/// Modulation register (address: 0x010)
#[register(0x0010u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct ModulationReg {
    /// Selected scheme
    pub mode: ModulationMode,
}

impl FromByteArray for ModulationReg {
    type Error = InvalidModulationMode;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            mode: ModulationMode::from_byte(bytes[0])?,
        })
    }
}

impl ToByteArray for ModulationReg {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.mode as u8])
    }
}

bitflags::bitflags! {
    /// Bit encoding options, as written to [`Encoding`]
    ///
    /// The flags combine freely; the associated constants cover the
    /// combinations in common use.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EncodingFlags: u8 {
        /// Invert data
        const INV = 1 << 0;
        /// Differential encoding
        const DIFF = 1 << 1;
        /// Scrambler enabled
        const SCRAM = 1 << 2;
        /// Manchester encoding
        const MANCH = 1 << 3;
        /// Disable the sync pattern
        const NOSYNC = 1 << 4;
    }
}

impl EncodingFlags {
    /// Non-return-to-zero, no transformation
    pub const NRZ: Self = Self::empty();
    /// NRZI (differential) encoding
    pub const NRZI: Self = Self::DIFF;
    /// NRZI with the scrambler, the usual choice for HDLC framing
    pub const NRZI_SCRAMBLED: Self = Self::DIFF.union(Self::SCRAM);
}

/// Encoding register (address: 0x011)
#[register(0x0011u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct Encoding {
    /// Active encoding flags
    pub flags: EncodingFlags,
}

impl FromByteArray for Encoding {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            flags: EncodingFlags::from_bits_truncate(bytes[0]),
        })
    }
}

impl ToByteArray for Encoding {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.flags.bits()])
    }
}

/// Packet framing mode, bits [3:1] of [`FramingReg`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameMode {
    /// No framing, raw bit stream
    Raw = 0x0,
    /// Raw stream with soft bit output
    RawSoftBits = 0x1,
    /// HDLC framing with bit stuffing
    #[default]
    Hdlc = 0x2,
    /// Raw stream with pattern match
    RawPatternMatch = 0x3,
    /// Wireless M-Bus framing
    WMBus = 0x4,
    /// Wireless M-Bus 4-to-6 coded framing
    WMBus4to6 = 0x5,
}

/// Frame check sequence mode, bits [6:4] of [`FramingReg`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CrcMode {
    /// No frame check sequence
    None = 0x0,
    /// CCITT CRC-16 (HDLC standard)
    #[default]
    Ccitt = 0x1,
    /// CRC-16 (IBM polynomial)
    Crc16 = 0x2,
    /// DNP 16-bit CRC
    Dnp = 0x3,
    /// 32-bit CRC
    Crc32 = 0x6,
}

/// Framing register (address: 0x012)
#[register(0x0012u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct FramingReg {
    /// Framing mode
    pub frame: FrameMode,
    /// Frame check sequence mode
    pub crc: CrcMode,
}

impl FromByteArray for FramingReg {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        let frame = match (bytes[0] >> 1) & 0x07 {
            0x0 => FrameMode::Raw,
            0x1 => FrameMode::RawSoftBits,
            0x2 => FrameMode::Hdlc,
            0x3 => FrameMode::RawPatternMatch,
            0x4 => FrameMode::WMBus,
            _ => FrameMode::WMBus4to6,
        };
        let crc = match (bytes[0] >> 4) & 0x07 {
            0x0 => CrcMode::None,
            0x1 => CrcMode::Ccitt,
            0x2 => CrcMode::Crc16,
            0x3 => CrcMode::Dnp,
            _ => CrcMode::Crc32,
        };
        Ok(Self { frame, crc })
    }
}

impl ToByteArray for FramingReg {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.frame as u8) << 1) | ((self.crc as u8) << 4)])
    }
}

/// Forward error correction register (address: 0x018)
///
/// Enables the convolutional encoder/Viterbi decoder pair. FEC halves the
/// effective data rate and requires HDLC framing.
#[register(0x0018u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct Fec {
    /// Convolutional FEC enabled
    pub enabled: bool,
}

impl FromByteArray for Fec {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            enabled: bytes[0] & 0x01 != 0,
        })
    }
}

impl ToByteArray for Fec {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([if self.enabled { 0x01 } else { 0x00 }])
    }
}

/// Decimation register (address: 0x102)
///
/// Divides the baseband sample chain by the 7-bit factor:
/// `f_baseband = f_xtal / (2^4 · DECIMATION · f_xtaldiv)`.
#[register(0x0102u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct Decimation {
    /// Decimation factor, 1..=127
    pub value: u8,
}

impl FromByteArray for Decimation {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: bytes[0] & 0x7F,
        })
    }
}

impl ToByteArray for Decimation {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.value & 0x7F])
    }
}

/// Receiver data rate register (address: 0x103)
///
/// 24-bit value recovering the bit clock from the decimated baseband:
/// `RXDATARATE = 2^7 · f_xtal / (f_xtaldiv · BITRATE · DECIMATION)`.
#[register(0x0103u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct RxDataRate {
    /// Data rate word
    pub value: u32,
}

/// Maximum data rate offset register (address: 0x106)
///
/// Bound on receiver bit clock drift. Zero disables data rate tracking,
/// appropriate when both ends run from budgeted reference clocks.
#[register(0x0106u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct MaxDrOffset {
    /// Offset word
    pub value: u32,
}

/// Maximum RF offset register (address: 0x109)
///
/// Limit for the automatic frequency control loop, as a fraction of the
/// external clock: `MAXRFOFFSET = Δf · 2^24 / f_xtal`, 20 bits wide.
///
/// # Important Notes
/// - Larger limits widen AFC capture but increase false lock risk and
///   lengthen the time to achieve lock
/// - `correction` applies the tracked offset at the first LO
#[register(0x0109u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct MaxRfOffset {
    /// Offset word, 20 bits
    pub value: u32,
    /// Correct the tracked offset at the first LO
    pub correction: bool,
}

impl MaxRfOffset {
    const FREQOFFSCORR: u32 = 1 << 23;

    /// Largest representable offset word
    pub const MAX: u32 = 0x0F_FFFF;
}

impl FromByteArray for MaxRfOffset {
    type Error = Infallible;
    type Array = [u8; 3];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        let raw = u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]);
        Ok(Self {
            value: raw & Self::MAX,
            correction: raw & Self::FREQOFFSCORR != 0,
        })
    }
}

impl ToByteArray for MaxRfOffset {
    type Error = Infallible;
    type Array = [u8; 3];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let mut raw = self.value & Self::MAX;
        if self.correction {
            raw |= Self::FREQOFFSCORR;
        }
        let bytes = raw.to_be_bytes();
        Ok([bytes[1], bytes[2], bytes[3]])
    }
}

/// AFSK space tone register (address: 0x110)
///
/// Space tone frequency as `f_space · 2^18 / f_xtal`.
#[register(0x0110u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct AfskSpace {
    /// Tone word
    pub value: u16,
}

/// AFSK mark tone register (address: 0x112)
///
/// Mark tone frequency as `f_mark · 2^18 / f_xtal`.
#[register(0x0112u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct AfskMark {
    /// Tone word
    pub value: u16,
}

/// Transmit deviation register (address: 0x161)
///
/// Peak frequency deviation as `f_deviation · 2^24 / f_xtal`, 24 bits.
#[register(0x0161u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct FskDev {
    /// Deviation word
    pub value: u32,
}

/// Transmit bit rate register (address: 0x165)
///
/// Bit rate as `BITRATE · 2^24 / f_xtal`, 24 bits.
#[register(0x0165u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct TxRate {
    /// Rate word
    pub value: u32,
}

/// Output power coefficient register (address: 0x16A)
///
/// Linear output power scaling: 0x000 mutes the PA, 0xFFF is full power.
/// Only the B coefficient is used when predistortion is off.
#[register(0x016Au16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct TxPwrCoeffB {
    /// Power coefficient, 12 bits
    pub value: u16,
}

impl TxPwrCoeffB {
    /// Full-scale coefficient
    pub const FULL_SCALE: u16 = 0x0FFF;
}

impl FromByteArray for RxDataRate {
    type Error = Infallible;
    type Array = [u8; 3];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]),
        })
    }
}

impl ToByteArray for RxDataRate {
    type Error = Infallible;
    type Array = [u8; 3];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let bytes = self.value.to_be_bytes();
        Ok([bytes[1], bytes[2], bytes[3]])
    }
}

impl FromByteArray for MaxDrOffset {
    type Error = Infallible;
    type Array = [u8; 3];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]),
        })
    }
}

impl ToByteArray for MaxDrOffset {
    type Error = Infallible;
    type Array = [u8; 3];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let bytes = self.value.to_be_bytes();
        Ok([bytes[1], bytes[2], bytes[3]])
    }
}

impl FromByteArray for AfskSpace {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: u16::from_be_bytes(bytes),
        })
    }
}

impl ToByteArray for AfskSpace {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.value.to_be_bytes())
    }
}

impl FromByteArray for AfskMark {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: u16::from_be_bytes(bytes),
        })
    }
}

impl ToByteArray for AfskMark {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.value.to_be_bytes())
    }
}

impl FromByteArray for FskDev {
    type Error = Infallible;
    type Array = [u8; 3];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]),
        })
    }
}

impl ToByteArray for FskDev {
    type Error = Infallible;
    type Array = [u8; 3];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let bytes = self.value.to_be_bytes();
        Ok([bytes[1], bytes[2], bytes[3]])
    }
}

impl FromByteArray for TxRate {
    type Error = Infallible;
    type Array = [u8; 3];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]),
        })
    }
}

impl ToByteArray for TxRate {
    type Error = Infallible;
    type Array = [u8; 3];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let bytes = self.value.to_be_bytes();
        Ok([bytes[1], bytes[2], bytes[3]])
    }
}

impl FromByteArray for TxPwrCoeffB {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: u16::from_be_bytes(bytes) & Self::FULL_SCALE,
        })
    }
}

impl ToByteArray for TxPwrCoeffB {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok((self.value & Self::FULL_SCALE).to_be_bytes())
    }
}
