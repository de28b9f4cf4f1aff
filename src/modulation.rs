//! Modulation descriptor and parameter resolution
//!
//! This module maps a user-facing modulation description (scheme, bitrate,
//! encoding, framing, power) onto the chip's timing registers. The hard
//! part is the receiver chain: the external clock is first decimated to a
//! baseband sample rate, then a fractional divider recovers the bit clock
//! from it. Both values have to be derived together so the effective rate
//! lands on the requested bitrate.
//!
//! Resolution derives:
//! - `DECIMATION`: the largest power of two (≤ 64, the register's
//!   power-of-two capacity) keeping the baseband rate
//!   `f_ref / (16·DECIMATION)` at or above [`OVERSAMPLING`] times the
//!   bitrate
//! - `RXDATARATE = round(2^7 · f_ref / (DECIMATION · bitrate))`; the
//!   construction keeps this ≥ 2^13, so the rounding error on the
//!   effective bitrate stays below 0.007 %, well inside the documented
//!   0.1 % tolerance
//! - the AFC carrier delta, derived as `bitrate · DECIMATION /`
//!   [`CARRIER_DELTA_DIVISOR`] when the host did not override it: slower,
//!   more decimated links get a wider window
//!   relative to their bitrate, since the AFC has more symbols to converge
//!   over; larger values trade faster lock acquisition for a wider
//!   false-lock risk
//!
//! Scheme-specific parameters live in a tagged variant, so AFSK tone
//! fields cannot be read for an FSK link or vice versa.

use crate::config::ClockConfig;
use crate::error::Error;
use crate::registers::{
    AfskMark, AfskSpace, CrcMode, EncodingFlags, FrameMode, FskDev, MaxRfOffset, ModulationMode,
    TxPwrCoeffB, TxRate,
};

/// Minimum baseband oversampling relative to the bitrate
pub const OVERSAMPLING: u32 = 4;

/// Largest decimation factor the resolver will select
pub const DECIMATION_MAX: u32 = 64;

/// AFSK detector sample rate target, in samples per bit
pub const AFSK_SAMPLES_PER_BIT: u32 = 4;

/// Divisor in the derived AFC carrier delta, `bitrate·DECIMATION / this`.
/// Tunable: smaller values widen the default AFC window.
pub const CARRIER_DELTA_DIVISOR: u32 = 16;

/// Largest representable RXDATARATE word
pub const RX_DATA_RATE_MAX: u32 = 0x00FF_FFFF;

/// Scheme-specific modulation parameters
///
/// The active scheme is the variant itself; there is no separate scheme
/// tag to fall out of sync with these fields.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchemeParams {
    /// Frequency shift keying
    Fsk {
        /// Modulation index `h = 2·deviation / bitrate`, must be positive
        modulation_index: f32,
    },
    /// Audio frequency shift keying
    Afsk {
        /// Peak carrier deviation, Hz
        deviation: u32,
        /// Mark tone frequency, Hz
        mark: u32,
        /// Space tone frequency, Hz
        space: u32,
    },
}

/// Values derived by [`Modulation::resolve`]
///
/// Owned exclusively by the resolver; absent until resolution has run for
/// the descriptor's current bitrate/scheme combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Resolved {
    /// Baseband decimation factor
    pub decimation: u8,
    /// Receiver data rate word
    pub rx_data_rate: u32,
    /// AFC carrier delta limit, Hz
    pub max_delta_carrier: u32,
}

/// Modulation descriptor
///
/// Built by the host, resolved by the driver on mode entry. The derived
/// block is cached inside the descriptor, so re-entering a mode with an
/// unchanged descriptor does not repeat the derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct Modulation {
    /// Link bitrate, Hz
    pub bitrate: u32,
    /// Scheme-specific parameters
    pub params: SchemeParams,
    /// Bit encoding applied below framing
    pub encoding: EncodingFlags,
    /// Packet framing mode
    pub framing: FrameMode,
    /// Frame check sequence
    pub crc: CrcMode,
    /// Convolutional FEC enabled
    pub fec: bool,
    /// Transmit output power as a fraction of full scale, (0, 1]
    pub power: f32,
    /// AFC carrier delta override, Hz; derived when `None`
    pub max_delta_carrier: Option<u32>,
    resolved: Option<Resolved>,
}

impl Modulation {
    /// Creates an FSK descriptor with HDLC framing and scrambled NRZI
    /// encoding.
    pub fn fsk(bitrate: u32, modulation_index: f32) -> Self {
        Self {
            bitrate,
            params: SchemeParams::Fsk { modulation_index },
            encoding: EncodingFlags::NRZI_SCRAMBLED,
            framing: FrameMode::Hdlc,
            crc: CrcMode::Ccitt,
            fec: false,
            power: 1.0,
            max_delta_carrier: None,
            resolved: None,
        }
    }

    /// Creates an AFSK descriptor with HDLC framing and plain NRZ
    /// encoding.
    pub fn afsk(bitrate: u32, deviation: u32, mark: u32, space: u32) -> Self {
        Self {
            bitrate,
            params: SchemeParams::Afsk {
                deviation,
                mark,
                space,
            },
            encoding: EncodingFlags::NRZ,
            framing: FrameMode::Hdlc,
            crc: CrcMode::Ccitt,
            fec: false,
            power: 1.0,
            max_delta_carrier: None,
            resolved: None,
        }
    }

    /// The derived register values, if resolution has run
    pub fn resolved(&self) -> Option<&Resolved> {
        self.resolved.as_ref()
    }

    /// Scheme selector for the modulation register
    pub fn mode(&self) -> ModulationMode {
        match self.params {
            SchemeParams::Fsk { .. } => ModulationMode::Fsk,
            SchemeParams::Afsk { .. } => ModulationMode::Afsk,
        }
    }

    /// Resolves the descriptor against a clock configuration.
    ///
    /// `pll_range_hz` is the PLL ranging clock frequency; the AFC window
    /// must stay within half of it, since autoranging only guarantees VCO
    /// validity at that granularity.
    ///
    /// # Errors
    /// * `UnsupportedBitrate` - bitrate zero, above `f_ref / 64`, or so low
    ///   the datarate word overflows at maximum decimation
    /// * `InvalidModulationIndex` - FSK index not positive
    /// * `InvalidToneFrequencies` - AFSK tones zero, equal, or above the
    ///   decimated audio Nyquist limit
    /// * `InvalidTxPower` - power outside (0, 1]
    /// * `InvalidCarrierDelta` - delta exceeding the AFC register or the
    ///   ranging resolution
    pub fn resolve(
        &mut self,
        clock: &ClockConfig,
        pll_range_hz: u32,
    ) -> Result<&Resolved, Error> {
        let f_ref = clock.f_ref();

        if self.bitrate == 0 {
            return Err(Error::UnsupportedBitrate);
        }
        if !(self.power > 0.0 && self.power <= 1.0) {
            return Err(Error::InvalidTxPower);
        }
        match self.params {
            SchemeParams::Fsk { modulation_index } => {
                if !(modulation_index > 0.0) {
                    return Err(Error::InvalidModulationIndex);
                }
            }
            SchemeParams::Afsk { mark, space, .. } => {
                if mark == 0 || space == 0 || mark == space {
                    return Err(Error::InvalidToneFrequencies);
                }
            }
        }

        // Largest power of two keeping the baseband oversampled
        let ceiling =
            (f_ref as u64 / (16 * OVERSAMPLING as u64 * self.bitrate as u64)) as u32;
        if ceiling == 0 {
            return Err(Error::UnsupportedBitrate);
        }
        let decimation = prev_power_of_two(ceiling.min(DECIMATION_MAX));

        let rx_data_rate = div_round(
            128 * f_ref as u64,
            decimation as u64 * self.bitrate as u64,
        ) as u32;
        if rx_data_rate > RX_DATA_RATE_MAX {
            return Err(Error::UnsupportedBitrate);
        }

        if let SchemeParams::Afsk { mark, space, .. } = self.params {
            // The detector decimates the baseband a second time toward
            // AFSK_SAMPLES_PER_BIT samples per bit; tones must satisfy
            // Nyquist at that final audio rate
            let f_baseband = f_ref / (16 * decimation);
            let audio_div = (f_baseband / (AFSK_SAMPLES_PER_BIT * self.bitrate)).max(1);
            let f_audio = f_baseband / audio_div;
            if mark >= f_audio / 2 || space >= f_audio / 2 {
                return Err(Error::InvalidToneFrequencies);
            }
        }

        let max_delta_carrier = match self.max_delta_carrier {
            Some(delta) => delta,
            None => {
                (self.bitrate as u64 * decimation as u64 / CARRIER_DELTA_DIVISOR as u64) as u32
            }
        };
        let offset_word = div_round(
            (max_delta_carrier as u64) << 24,
            clock.f_xtal as u64,
        );
        if offset_word > MaxRfOffset::MAX as u64
            || max_delta_carrier as u64 * 2 > pll_range_hz as u64
        {
            return Err(Error::InvalidCarrierDelta);
        }

        Ok(&*self.resolved.insert(Resolved {
            decimation: decimation as u8,
            rx_data_rate,
            max_delta_carrier,
        }))
    }

    pub(crate) fn tx_rate_reg(&self, f_xtal: u32) -> TxRate {
        TxRate {
            value: div_round((self.bitrate as u64) << 24, f_xtal as u64) as u32,
        }
    }

    pub(crate) fn deviation_reg(&self, f_xtal: u32) -> FskDev {
        let deviation_hz = match self.params {
            SchemeParams::Fsk { modulation_index } => {
                modulation_index as f64 * self.bitrate as f64 / 2.0
            }
            SchemeParams::Afsk { deviation, .. } => deviation as f64,
        };
        FskDev {
            value: (deviation_hz * (1u64 << 24) as f64 / f_xtal as f64 + 0.5) as u32,
        }
    }

    pub(crate) fn afsk_tone_regs(&self, f_xtal: u32) -> Option<(AfskMark, AfskSpace)> {
        match self.params {
            SchemeParams::Afsk { mark, space, .. } => Some((
                AfskMark {
                    value: div_round((mark as u64) << 18, f_xtal as u64) as u16,
                },
                AfskSpace {
                    value: div_round((space as u64) << 18, f_xtal as u64) as u16,
                },
            )),
            SchemeParams::Fsk { .. } => None,
        }
    }

    pub(crate) fn power_reg(&self) -> TxPwrCoeffB {
        TxPwrCoeffB {
            value: (self.power as f64 * TxPwrCoeffB::FULL_SCALE as f64 + 0.5) as u16,
        }
    }
}

impl Resolved {
    pub(crate) fn max_rf_offset_reg(&self, f_xtal: u32) -> MaxRfOffset {
        MaxRfOffset {
            value: div_round((self.max_delta_carrier as u64) << 24, f_xtal as u64) as u32,
            correction: true,
        }
    }
}

fn prev_power_of_two(value: u32) -> u32 {
    debug_assert!(value > 0);
    1 << (31 - value.leading_zeros())
}

fn div_round(num: u64, den: u64) -> u64 {
    (num + den / 2) / den
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClockSource;

    const PLL_RANGE_HZ: u32 = 62_500;

    fn clock() -> ClockConfig {
        ClockConfig::resolve(ClockSource::Tcxo, 16_000_000, 10).unwrap()
    }

    fn effective_bitrate(f_ref: u32, resolved: &Resolved) -> f64 {
        128.0 * f_ref as f64 / (resolved.decimation as f64 * resolved.rx_data_rate as f64)
    }

    #[test]
    fn fsk_9600_resolves_expected_registers() {
        let mut modulation = Modulation::fsk(9600, 0.5);
        let resolved = modulation.resolve(&clock(), PLL_RANGE_HZ).unwrap();
        assert_eq!(resolved.decimation, 16);
        assert_eq!(resolved.rx_data_rate, 13333);
        assert_eq!(resolved.max_delta_carrier, 9600);
    }

    #[test]
    fn derived_fields_absent_until_resolution() {
        let mut modulation = Modulation::fsk(9600, 0.5);
        assert!(modulation.resolved().is_none());
        modulation.resolve(&clock(), PLL_RANGE_HZ).unwrap();
        assert!(modulation.resolved().is_some());
    }

    #[test]
    fn effective_rate_within_documented_tolerance() {
        let clock = clock();
        for bitrate in [300u32, 1200, 2400, 4800, 9600, 38_400, 96_000, 250_000] {
            let mut modulation = Modulation::fsk(bitrate, 0.5);
            let resolved = modulation.resolve(&clock, PLL_RANGE_HZ).unwrap();
            let effective = effective_bitrate(clock.f_ref(), resolved);
            let error = (effective - bitrate as f64).abs() / bitrate as f64;
            assert!(
                error <= 0.001,
                "bitrate {bitrate}: effective {effective}, error {error}"
            );
        }
    }

    #[test]
    fn baseband_stays_oversampled() {
        let clock = clock();
        for bitrate in [300u32, 9600, 125_000, 250_000] {
            let mut modulation = Modulation::fsk(bitrate, 0.5);
            let resolved = modulation.resolve(&clock, PLL_RANGE_HZ).unwrap();
            let f_baseband = clock.f_ref() / (16 * resolved.decimation as u32);
            assert!(f_baseband >= OVERSAMPLING * bitrate);
        }
    }

    #[test]
    fn unrepresentable_bitrates_rejected() {
        let clock = clock();
        for bitrate in [0u32, 1, 260_000] {
            let mut modulation = Modulation::fsk(bitrate, 0.5);
            assert_eq!(
                modulation.resolve(&clock, PLL_RANGE_HZ).unwrap_err(),
                Error::UnsupportedBitrate,
                "bitrate {bitrate}"
            );
        }
    }

    #[test]
    fn fsk_rejects_non_positive_index() {
        for index in [0.0, -0.5] {
            let mut modulation = Modulation::fsk(9600, index);
            assert_eq!(
                modulation.resolve(&clock(), PLL_RANGE_HZ).unwrap_err(),
                Error::InvalidModulationIndex
            );
        }
    }

    #[test]
    fn afsk_1200_bell202_tones_accepted() {
        let mut modulation = Modulation::afsk(1200, 3000, 1200, 2200);
        let resolved = modulation.resolve(&clock(), PLL_RANGE_HZ).unwrap();
        assert_eq!(resolved.decimation, 64);
    }

    #[test]
    fn afsk_undersampled_tones_rejected() {
        // At 300 bit/s the audio chain lands near 1.2 kHz; neither
        // Bell 202 tone fits below Nyquist
        let mut modulation = Modulation::afsk(300, 3000, 1200, 2200);
        assert_eq!(
            modulation.resolve(&clock(), PLL_RANGE_HZ).unwrap_err(),
            Error::InvalidToneFrequencies
        );
    }

    #[test]
    fn afsk_degenerate_tones_rejected() {
        for (mark, space) in [(1200, 1200), (0, 2200), (1200, 0)] {
            let mut modulation = Modulation::afsk(1200, 3000, mark, space);
            assert_eq!(
                modulation.resolve(&clock(), PLL_RANGE_HZ).unwrap_err(),
                Error::InvalidToneFrequencies
            );
        }
    }

    #[test]
    fn power_out_of_range_rejected() {
        for power in [0.0, -0.1, 1.5] {
            let mut modulation = Modulation::fsk(9600, 0.5);
            modulation.power = power;
            assert_eq!(
                modulation.resolve(&clock(), PLL_RANGE_HZ).unwrap_err(),
                Error::InvalidTxPower
            );
        }
    }

    #[test]
    fn carrier_delta_override_honored() {
        let mut modulation = Modulation::fsk(9600, 0.5);
        modulation.max_delta_carrier = Some(5000);
        let resolved = modulation.resolve(&clock(), PLL_RANGE_HZ).unwrap();
        assert_eq!(resolved.max_delta_carrier, 5000);
    }

    #[test]
    fn excessive_carrier_delta_rejected() {
        let mut modulation = Modulation::fsk(9600, 0.5);
        modulation.max_delta_carrier = Some(PLL_RANGE_HZ);
        assert_eq!(
            modulation.resolve(&clock(), PLL_RANGE_HZ).unwrap_err(),
            Error::InvalidCarrierDelta
        );
    }

    #[test]
    fn tx_side_register_words() {
        let modulation = Modulation::fsk(9600, 0.5);
        // 9600 · 2^24 / 16 MHz
        assert_eq!(modulation.tx_rate_reg(16_000_000).value, 10_066);
        // deviation h·bitrate/2 = 2400 Hz
        assert_eq!(modulation.deviation_reg(16_000_000).value, 2_517);

        let afsk = Modulation::afsk(1200, 3000, 1200, 2200);
        let (mark, space) = afsk.afsk_tone_regs(16_000_000).unwrap();
        // tone · 2^18 / 16 MHz
        assert_eq!(mark.value, 20);
        assert_eq!(space.value, 36);

        let mut half_power = Modulation::fsk(9600, 0.5);
        half_power.power = 0.5;
        assert_eq!(half_power.power_reg().value, 0x800);
    }
}
