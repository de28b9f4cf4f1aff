//! Frequency synthesiser engine
//!
//! This module turns target carrier frequencies into fractional-N register
//! words, selects the RF output divider, and runs the chip's built-in VCO
//! autoranging.
//!
//! The frequency word is a pure fixed-point fraction of the external
//! clock, `FREQ = f_carrier · 2^24 / f_xtal`, computed in integer
//! arithmetic and rounded half-to-even so the committed carrier never sits
//! more than half a synthesiser step (`f_xtal / 2^24` Hz) from the target.
//!
//! Autoranging is a closed-loop search the chip performs itself: the
//! driver programs a starting range nibble, sets the start bit, and polls
//! until the chip clears it. The achieved range is cached per synthesiser
//! and reused until the frequency word moves by more than one step or the
//! VCO topology changes. The polling loop is bounded; a chip that never
//! reports completion surfaces as [`Error::AutorangeTimeout`] rather than
//! a hang.

use crate::config::{ClockConfig, RangedVco, RfDiv, SynthSel, Synthesiser};
use crate::device::Device;
use crate::error::Error;
use crate::registers::{
    FreqA, FreqB, PllCpi, PllLoop, PllRangingA, PllRangingB, PllVcoDiv, Ranging, VcoSelect,
};

/// Upper bound on ranging status polls before the cycle is declared hung
pub const AUTORANGE_POLL_LIMIT: u32 = 1000;

/// Tunable span with the RF divider engaged, Hz
pub const DIV1_SPAN: core::ops::RangeInclusive<u32> = 54_000_000..=525_000_000;

/// Tunable span with the VCO output used directly, Hz
pub const DIV0_SPAN: core::ops::RangeInclusive<u32> = 525_000_000..=1_050_000_000;

/// Divide rounding half-to-even, keeping the worst-case bias of repeated
/// conversions at zero.
fn div_round_half_even(num: u64, den: u64) -> u64 {
    let quotient = num / den;
    let remainder = num % den;
    match (remainder * 2).cmp(&den) {
        core::cmp::Ordering::Less => quotient,
        core::cmp::Ordering::Greater => quotient + 1,
        core::cmp::Ordering::Equal => {
            if quotient % 2 == 0 {
                quotient
            } else {
                quotient + 1
            }
        }
    }
}

/// Converts a carrier frequency to the synthesiser register word.
///
/// Callers are expected to have validated the frequency against
/// [`select_divider`] first; the conversion itself is total for any carrier
/// in the tunable spans.
pub fn frequency_to_register(carrier_hz: u32, f_xtal: u32) -> u32 {
    div_round_half_even((carrier_hz as u64) << 24, f_xtal as u64) as u32
}

/// Converts a synthesiser register word back to the carrier frequency it
/// produces.
pub fn register_to_frequency(word: u32, f_xtal: u32) -> u32 {
    div_round_half_even(word as u64 * f_xtal as u64, 1 << 24) as u32
}

/// Chooses the RF output divider for a carrier frequency.
///
/// # Errors
/// * `FrequencyOutOfRange` - carrier outside both divider spans
pub fn select_divider(carrier_hz: u32) -> Result<RfDiv, Error> {
    if DIV1_SPAN.contains(&carrier_hz) {
        Ok(RfDiv::Div1)
    } else if DIV0_SPAN.contains(&carrier_hz) {
        Ok(RfDiv::Div0)
    } else {
        Err(Error::FrequencyOutOfRange)
    }
}

/// Tunable span of a divider selection, Hz
pub fn divider_span(div: RfDiv) -> core::ops::RangeInclusive<u32> {
    match div {
        RfDiv::Div0 => DIV0_SPAN,
        RfDiv::Div1 => DIV1_SPAN,
    }
}

fn read_ranging<SPI>(device: &mut Device<SPI>, sel: SynthSel) -> Result<Ranging, Error>
where
    SPI: embedded_hal::spi::SpiDevice,
{
    Ok(match sel {
        SynthSel::A => device.read_register::<PllRangingA>()?.ranging,
        SynthSel::B => device.read_register::<PllRangingB>()?.ranging,
    })
}

fn write_ranging<SPI>(device: &mut Device<SPI>, sel: SynthSel, value: Ranging) -> Result<(), Error>
where
    SPI: embedded_hal::spi::SpiDevice,
{
    match sel {
        SynthSel::A => device.write_register(PllRangingA { ranging: value })?,
        SynthSel::B => device.write_register(PllRangingB { ranging: value })?,
    }
    Ok(())
}

/// Runs one autoranging cycle and returns the achieved range nibble.
///
/// # Errors
/// * `AutorangeTimeout` - the chip never cleared the start bit within
///   [`AUTORANGE_POLL_LIMIT`] polls
/// * `AutorangeFailed` - the cycle completed with the error bit set
fn autorange<SPI>(device: &mut Device<SPI>, sel: SynthSel, start_range: u8) -> Result<u8, Error>
where
    SPI: embedded_hal::spi::SpiDevice,
{
    write_ranging(device, sel, Ranging::begin(start_range))?;

    for _ in 0..AUTORANGE_POLL_LIMIT {
        let status = read_ranging(device, sel)?;
        if status.start {
            continue;
        }
        if status.error {
            return Err(Error::AutorangeFailed(status.vco_range));
        }
        log::debug!("autorange settled on range {}", status.vco_range);
        return Ok(status.vco_range);
    }

    Err(Error::AutorangeTimeout)
}

/// Commits one synthesiser to the chip: divider, VCO topology, loop
/// defaults, frequency word, and a ranging run when no valid cached range
/// exists.
///
/// A host-preset divider is revalidated against its span and honored. The
/// cached VCO range survives only retunes of at most one register step
/// under an unchanged topology; otherwise ranging re-runs, warm-started
/// from the previous range when one exists.
pub(crate) fn commit<SPI>(
    device: &mut Device<SPI>,
    synth: &mut Synthesiser,
    sel: SynthSel,
    vco: VcoSelect,
    clock: &ClockConfig,
) -> Result<(), Error>
where
    SPI: embedded_hal::spi::SpiDevice,
{
    let carrier = synth.frequency();

    let rf_div = match synth.rf_div {
        Some(preset) => {
            if !divider_span(preset).contains(&carrier) {
                return Err(Error::FrequencyOutOfRange);
            }
            preset
        }
        None => {
            let derived = select_divider(carrier)?;
            synth.rf_div = Some(derived);
            derived
        }
    };

    let word = frequency_to_register(carrier, clock.f_xtal);

    device.write_register(PllVcoDiv {
        rf_div: rf_div == RfDiv::Div1,
        vco,
    })?;
    device.write_register(PllLoop {
        freq_b: sel == SynthSel::B,
        ..Default::default()
    })?;
    device.write_register(PllCpi::default())?;
    match sel {
        SynthSel::A => device.write_register(FreqA { value: word })?,
        SynthSel::B => device.write_register(FreqB { value: word })?,
    }
    synth.register = Some(word);

    // A retune beyond one step or a topology change voids the cached range
    let warm_start = match synth.ranged {
        Some(prior) if prior.vco == vco && prior.word.abs_diff(word) <= 1 => return Ok(()),
        Some(prior) => {
            synth.ranged = None;
            prior.range
        }
        None => Ranging::MID_SCALE,
    };

    let range = autorange(device, sel, warm_start)?;
    synth.ranged = Some(RangedVco { range, word, vco });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const F_XTAL: u32 = 16_000_000;

    #[test]
    fn round_trip_stays_within_one_step() {
        // One synthesiser step is f_xtal / 2^24, just under 1 Hz here
        let mut carrier = *DIV1_SPAN.start();
        while carrier <= *DIV0_SPAN.end() {
            let word = frequency_to_register(carrier, F_XTAL);
            let recovered = register_to_frequency(word, F_XTAL);
            assert!(
                recovered.abs_diff(carrier) <= 1,
                "{carrier} Hz round-tripped to {recovered} Hz"
            );
            carrier += 7_919_333;
        }
    }

    #[test]
    fn conversion_rounds_half_to_even() {
        // With f_xtal = 2^25 the word is carrier / 2, making odd carriers
        // exact ties
        let f_xtal = 1 << 25;
        assert_eq!(frequency_to_register(3, f_xtal), 2);
        assert_eq!(frequency_to_register(5, f_xtal), 2);
        assert_eq!(frequency_to_register(7, f_xtal), 4);
    }

    #[test]
    fn known_word_for_reference_carrier() {
        // 433.92 MHz against a 16 MHz clock: 27.12 · 2^24, rounded
        let word = frequency_to_register(433_920_000, F_XTAL);
        assert_eq!(word, 0x1B1E_B852);
    }

    #[test]
    fn divider_selection_by_band() {
        assert_eq!(select_divider(433_920_000).unwrap(), RfDiv::Div1);
        assert_eq!(select_divider(868_000_000).unwrap(), RfDiv::Div0);
        assert_eq!(select_divider(54_000_000).unwrap(), RfDiv::Div1);
        assert_eq!(select_divider(1_050_000_000).unwrap(), RfDiv::Div0);
    }

    #[test]
    fn out_of_span_frequencies_rejected() {
        assert_eq!(
            select_divider(27_000_000).unwrap_err(),
            Error::FrequencyOutOfRange
        );
        assert_eq!(
            select_divider(1_100_000_000).unwrap_err(),
            Error::FrequencyOutOfRange
        );
    }
}
