//! Host configuration and clock resolution
//!
//! This module contains the configuration aggregate the host populates
//! before [`init`](crate::Ax5043::init) and the clock model that turns a
//! crystal or TCXO description into the resolved reference the frequency
//! math runs on.
//!
//! The configuration follows a "resolve once, reuse" pattern: derived
//! values (`clock`, `pll_range_hz`, synthesiser dividers and VCO ranges)
//! start out unset and are filled in by the driver during mode entry.
//! Anything left unset is derived; anything the host pre-sets is validated
//! and honored, never silently overridden.

use crate::error::Error;
use crate::registers::{PerfF35, PktStoreFlags, PowerMode, VcoSelect, XtalCap};

/// Largest clock source error the chip's AFC budget tolerates, in ppm
pub const MAX_CLOCK_ERROR_PPM: u32 = 100;

/// Lower edge of the internal reference window the crystal divider must
/// land in, in Hz
pub const REFERENCE_MIN_HZ: u32 = 12_400_000;

/// Upper edge of the internal reference window, in Hz
pub const REFERENCE_MAX_HZ: u32 = 24_800_000;

/// Supported crystal load capacitance range, in pF. The upper bound is
/// the largest value the 6-bit tuning field encodes.
pub const LOAD_CAPACITANCE_PF: core::ops::RangeInclusive<f32> = 3.0..=39.5;

/// External clock source description
///
/// The load capacitance only exists for crystals, so it lives inside the
/// crystal variant rather than as a field that is meaningless for TCXOs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// Crystal between the oscillator pins, tuned with the internal load
    /// capacitance
    Crystal {
        /// Load capacitance to apply, in pF
        load_capacitance: f32,
    },
    /// Temperature compensated oscillator AC-coupled into the clock input
    Tcxo,
}

/// Resolved external clock parameters
///
/// Produced once by [`ClockConfig::resolve`] and then treated as immutable;
/// every downstream frequency computation keys off `f_xtal` and the derived
/// division factor. Replacing the clock source means re-resolving.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// Clock source kind
    pub source: ClockSource,
    /// External clock frequency, Hz
    pub f_xtal: u32,
    /// Maximum clock source error, ppm
    pub error_ppm: u32,
    /// Derived crystal division factor (1 or 2)
    pub xtal_div: u8,
    /// Encoded load capacitance register value
    pub xtal_cap: u8,
}

impl ClockConfig {
    /// Resolves a clock source description into the derived parameters.
    ///
    /// The division factor is the largest of {1, 2} that lands the internal
    /// reference `f_xtal / div` inside the supported window
    /// [[`REFERENCE_MIN_HZ`], [`REFERENCE_MAX_HZ`]]; when both dividers
    /// qualify the larger one wins (lower internal frequency, lower power).
    ///
    /// # Errors
    /// * `InvalidClockConfig` - zero frequency, ppm error above
    ///   [`MAX_CLOCK_ERROR_PPM`], crystal load capacitance outside
    ///   [`LOAD_CAPACITANCE_PF`], or no divider reaching the reference
    ///   window
    pub fn resolve(source: ClockSource, f_xtal: u32, error_ppm: u32) -> Result<Self, Error> {
        if f_xtal == 0 || error_ppm > MAX_CLOCK_ERROR_PPM {
            return Err(Error::InvalidClockConfig);
        }

        let xtal_div = [2u8, 1]
            .into_iter()
            .find(|&div| {
                let f_ref = f_xtal / div as u32;
                (REFERENCE_MIN_HZ..=REFERENCE_MAX_HZ).contains(&f_ref)
            })
            .ok_or(Error::InvalidClockConfig)?;

        let xtal_cap = match source {
            // DS Table 6: external clocks want the tuning capacitance at
            // its minimum
            ClockSource::Tcxo => 0,
            ClockSource::Crystal { load_capacitance } => {
                if !LOAD_CAPACITANCE_PF.contains(&load_capacitance) {
                    return Err(Error::InvalidClockConfig);
                }
                let half_pf = (load_capacitance * 2.0 + 0.5) as u8;
                half_pf.saturating_sub(16)
            }
        };

        Ok(Self {
            source,
            f_xtal,
            error_ppm,
            xtal_div,
            xtal_cap,
        })
    }

    /// Internal reference frequency after the crystal divider, Hz
    pub fn f_ref(&self) -> u32 {
        self.f_xtal / self.xtal_div as u32
    }

    pub(crate) fn xtal_cap_reg(&self) -> XtalCap {
        XtalCap {
            value: self.xtal_cap,
        }
    }

    pub(crate) fn tuning(&self) -> PerfF35 {
        if self.xtal_div == 1 {
            PerfF35::XtalDiv1
        } else {
            PerfF35::XtalDiv2
        }
    }
}

/// Divider at the output of the VCO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RfDiv {
    /// VCO output used directly (upper band)
    Div0,
    /// VCO output divided by two (lower band)
    Div1,
}

/// Achieved VCO range together with the conditions it was ranged under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct RangedVco {
    /// Range nibble the chip settled on
    pub range: u8,
    /// Frequency word that was ranged
    pub word: u32,
    /// VCO topology that was ranged
    pub vco: VcoSelect,
}

/// One of the two physical synthesisers.
///
/// The host sets the target frequency and may pre-set the output divider;
/// the register word and VCO range are derived state owned by the driver.
/// The cached range survives retunes of at most one synthesiser step and
/// is invalidated by anything larger, forcing a fresh autoranging run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Synthesiser {
    frequency: u32,
    /// Output divider, derived from the frequency when unset
    pub rf_div: Option<RfDiv>,
    pub(crate) register: Option<u32>,
    pub(crate) ranged: Option<RangedVco>,
}

impl Synthesiser {
    /// Creates a synthesiser targeting the given carrier frequency in Hz.
    pub fn new(frequency: u32) -> Self {
        Self {
            frequency,
            rf_div: None,
            register: None,
            ranged: None,
        }
    }

    /// Target carrier frequency, Hz
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Retunes the synthesiser to a new carrier frequency.
    ///
    /// The derived register word is discarded; whether the cached VCO
    /// range survives is decided against the new word when the frequency
    /// is next committed.
    pub fn set_frequency(&mut self, frequency: u32) {
        self.frequency = frequency;
        self.register = None;
    }

    /// Achieved VCO range, if autoranging has run for the current
    /// frequency and topology
    pub fn vco_range(&self) -> Option<u8> {
        self.ranged.map(|r| r.range)
    }

    /// Frequency word last committed to the chip, if any
    pub fn register_value(&self) -> Option<u32> {
        self.register
    }
}

/// Selects which synthesiser an operation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SynthSel {
    /// Synthesiser A
    #[default]
    A,
    /// Synthesiser B
    B,
}

/// Radio configuration aggregate
///
/// The host populates the input fields before `init`; the driver fills in
/// the derived fields (`clock`, `pll_range_hz`, `power_mode`) as modes are
/// entered. One value exists per physical chip and the host must serialize
/// all operations against it.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Chip power mode, tracked as the driver sequences it
    pub power_mode: PowerMode,
    /// Synthesiser A
    pub synth_a: Synthesiser,
    /// Synthesiser B
    pub synth_b: Synthesiser,
    /// Which synthesiser drives the PLL
    pub active_synth: SynthSel,
    /// VCO topology, board-dependent
    pub vco: VcoSelect,
    /// External clock source kind
    pub clock_source: ClockSource,
    /// External clock frequency, Hz
    pub f_xtal: u32,
    /// Maximum clock source error, ppm
    pub error_ppm: u32,
    /// Resolved clock parameters, derived on first mode entry
    pub clock: Option<ClockConfig>,
    /// Status chunks stored alongside received frames
    pub pkt_store_flags: PktStoreFlags,
    /// PLL ranging clock frequency, Hz; derived when unset
    pub pll_range_hz: Option<u32>,
}

impl Config {
    /// Creates a configuration for the given clock source.
    ///
    /// Synthesiser frequencies start at zero and must be set before a mode
    /// is entered.
    pub fn new(clock_source: ClockSource, f_xtal: u32, error_ppm: u32) -> Self {
        Self {
            power_mode: PowerMode::Powerdown,
            synth_a: Synthesiser::new(0),
            synth_b: Synthesiser::new(0),
            active_synth: SynthSel::A,
            vco: VcoSelect::Internal,
            clock_source,
            f_xtal,
            error_ppm,
            clock: None,
            pkt_store_flags: PktStoreFlags::empty(),
            pll_range_hz: None,
        }
    }

    pub(crate) fn active_synth_mut(&mut self) -> &mut Synthesiser {
        match self.active_synth {
            SynthSel::A => &mut self.synth_a,
            SynthSel::B => &mut self.synth_b,
        }
    }
}

/// Placeholder TCXO enable pin for hosts whose clock source is a crystal.
///
/// Implements `OutputPin` as a no-op so crystal-based radios do not need a
/// real pin type to name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTcxo;

impl embedded_hal::digital::ErrorType for NoTcxo {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for NoTcxo {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
