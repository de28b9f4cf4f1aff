//! Frequency synthesiser registers
//!
//! This module contains registers for the two fractional-N synthesisers and
//! their shared PLL:
//! - Loop filter and charge pump configuration
//! - VCO selection and the RF output divider
//! - Frequency words for synthesiser A and B
//! - VCO autoranging control and status
//!
//! # Important Notes
//! - The frequency words may only be changed while the synthesiser for that
//!   channel is stopped
//! - Ranging must be re-run whenever the frequency word moves by more than
//!   one step or the VCO topology changes

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Loop filter bandwidth selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoopFilter {
    /// External loop filter components
    External = 0x0,
    /// Internal filter, base bandwidth
    #[default]
    Internalx1 = 0x1,
    /// Internal filter, double bandwidth
    Internalx2 = 0x2,
    /// Internal filter, five times bandwidth
    Internalx5 = 0x3,
}

/// PLL loop register (address: 0x030)
///
/// Configures the loop filter and which frequency word drives the
/// synthesiser.
#[register(0x0030u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct PllLoop {
    /// Loop filter bandwidth
    pub filter: LoopFilter,
    /// Bypass the external filter pin
    pub direct: bool,
    /// Drive the synthesiser from the B frequency word instead of A
    pub freq_b: bool,
}

impl PllLoop {
    const DIRECT: u8 = 0x08;
    const FREQSEL: u8 = 0x80;
}

impl Default for PllLoop {
    fn default() -> Self {
        Self {
            filter: LoopFilter::Internalx1,
            direct: true,
            freq_b: false,
        }
    }
}

impl FromByteArray for PllLoop {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        let filter = match bytes[0] & 0x03 {
            0x0 => LoopFilter::External,
            0x1 => LoopFilter::Internalx1,
            0x2 => LoopFilter::Internalx2,
            _ => LoopFilter::Internalx5,
        };
        Ok(Self {
            filter,
            direct: bytes[0] & Self::DIRECT != 0,
            freq_b: bytes[0] & Self::FREQSEL != 0,
        })
    }
}

impl ToByteArray for PllLoop {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let mut byte = self.filter as u8;
        if self.direct {
            byte |= Self::DIRECT;
        }
        if self.freq_b {
            byte |= Self::FREQSEL;
        }
        Ok([byte])
    }
}

/// PLL charge pump current register (address: 0x031)
///
/// Charge pump current in 8.5 µA steps. The reset value suits the widest
/// loop bandwidth; narrow loop filters want this reduced.
#[register(0x0031u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct PllCpi {
    /// Charge pump current code
    pub value: u8,
}

impl Default for PllCpi {
    fn default() -> Self {
        Self { value: 0xC8 }
    }
}

impl FromByteArray for PllCpi {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { value: bytes[0] })
    }
}

impl ToByteArray for PllCpi {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.value])
    }
}

/// VCO selection, mirroring the chip's three oscillator topologies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VcoSelect {
    /// Fully internal VCO
    #[default]
    Internal,
    /// Internal VCO with external inductor
    Inductor,
    /// External VCO, internal one bypassed
    External,
}

/// PLL VCO divider register (address: 0x032)
///
/// Selects the VCO topology and whether the RF output divider is engaged.
/// With the divider engaged the VCO runs at twice the carrier, halving the
/// tunable span but covering the lower bands.
#[register(0x0032u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct PllVcoDiv {
    /// Divide the VCO output by two
    pub rf_div: bool,
    /// VCO topology
    pub vco: VcoSelect,
}

impl PllVcoDiv {
    const RFDIV: u8 = 0x04;
    const VCOSEL: u8 = 0x10;
    const VCO2INT: u8 = 0x20;
}

impl FromByteArray for PllVcoDiv {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        let vco = if bytes[0] & Self::VCOSEL == 0 {
            VcoSelect::Internal
        } else if bytes[0] & Self::VCO2INT != 0 {
            VcoSelect::Inductor
        } else {
            VcoSelect::External
        };
        Ok(Self {
            rf_div: bytes[0] & Self::RFDIV != 0,
            vco,
        })
    }
}

impl ToByteArray for PllVcoDiv {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let mut byte = 0;
        if self.rf_div {
            byte |= Self::RFDIV;
        }
        match self.vco {
            VcoSelect::Internal => {}
            VcoSelect::Inductor => byte |= Self::VCOSEL | Self::VCO2INT,
            VcoSelect::External => byte |= Self::VCOSEL,
        }
        Ok([byte])
    }
}

/// PLL ranging clock register (address: 0x035)
///
/// Sets the clock used by the built-in VCO ranging state machine to
/// `f_xtal / 2^(8 + divider_exp)`. The ranging clock must stay well below
/// the loop filter bandwidth for the ranging comparisons to settle.
#[register(0x0035u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct PllRngClk {
    /// Additional power-of-two exponent beyond the fixed 2^8, 0..=7
    pub divider_exp: u8,
}

impl FromByteArray for PllRngClk {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            divider_exp: bytes[0] & 0x07,
        })
    }
}

impl ToByteArray for PllRngClk {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.divider_exp & 0x07])
    }
}

/// Shared layout of the two ranging registers
///
/// The 4-bit VCO range nibble is both the starting point written before
/// ranging and the result read back afterwards. Writing `start` triggers a
/// ranging cycle; the chip clears it when the cycle completes and raises
/// `error` if no usable range was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ranging {
    /// VCO range nibble (start value on write, result on read)
    pub vco_range: u8,
    /// Ranging cycle in progress / trigger
    pub start: bool,
    /// Ranging terminated without finding a valid range
    pub error: bool,
}

impl Ranging {
    const RNG_START: u8 = 0x10;
    const RNG_ERR: u8 = 0x20;

    /// Mid-scale starting range for a cold ranging run
    pub const MID_SCALE: u8 = 0x08;

    /// Begin a ranging cycle from the given range nibble
    pub fn begin(vco_range: u8) -> Self {
        Self {
            vco_range,
            start: true,
            error: false,
        }
    }

    fn decode(byte: u8) -> Self {
        Self {
            vco_range: byte & 0x0F,
            start: byte & Self::RNG_START != 0,
            error: byte & Self::RNG_ERR != 0,
        }
    }

    fn encode(self) -> u8 {
        let mut byte = self.vco_range & 0x0F;
        if self.start {
            byte |= Self::RNG_START;
        }
        if self.error {
            byte |= Self::RNG_ERR;
        }
        byte
    }
}

/// Synthesiser A ranging register (address: 0x033)
#[register(0x0033u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct PllRangingA {
    /// Ranging state
    pub ranging: Ranging,
}

/// Synthesiser B ranging register (address: 0x03B)
#[register(0x003Bu16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct PllRangingB {
    /// Ranging state
    pub ranging: Ranging,
}

impl FromByteArray for PllRangingA {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            ranging: Ranging::decode(bytes[0]),
        })
    }
}

impl ToByteArray for PllRangingA {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.ranging.encode()])
    }
}

impl FromByteArray for PllRangingB {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            ranging: Ranging::decode(bytes[0]),
        })
    }
}

impl ToByteArray for PllRangingB {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.ranging.encode()])
    }
}

/// Synthesiser A frequency word (address: 0x034)
///
/// Carrier frequency as a 32-bit fraction of the external clock:
/// `FREQA = f_carrier · 2^24 / f_xtal`.
#[register(0x0034u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct FreqA {
    /// Frequency word
    pub value: u32,
}

/// Synthesiser B frequency word (address: 0x03C)
///
/// Same encoding as [`FreqA`], selected via [`PllLoop::freq_b`].
#[register(0x003Cu16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct FreqB {
    /// Frequency word
    pub value: u32,
}

impl FromByteArray for FreqA {
    type Error = Infallible;
    type Array = [u8; 4];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: u32::from_be_bytes(bytes),
        })
    }
}

impl ToByteArray for FreqA {
    type Error = Infallible;
    type Array = [u8; 4];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.value.to_be_bytes())
    }
}

impl FromByteArray for FreqB {
    type Error = Infallible;
    type Array = [u8; 4];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: u32::from_be_bytes(bytes),
        })
    }
}

impl ToByteArray for FreqB {
    type Error = Infallible;
    type Array = [u8; 4];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.value.to_be_bytes())
    }
}
