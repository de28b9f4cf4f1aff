//! Tests for the radio lifecycle state machine
//!
//! Drives initialisation, mode entry, autoranging and packet transmit
//! against the scripted mock transport.

mod common;

use ax5043::{Ax5043, ClockSource, Config, Error, Modulation, State, MAX_PACKET_LEN};
use common::*;

fn test_config() -> Config {
    let mut config = Config::new(ClockSource::Tcxo, 16_000_000, 10);
    config.synth_a.set_frequency(433_920_000);
    config
}

fn radio(chip: &SharedChip) -> Ax5043<SharedChip, ax5043::NoTcxo, impl FnMut(&[u8], ax5043::RxDataFlags)> {
    Ax5043::new(chip.clone(), test_config(), |_, _| {})
}

// ============================================================================
// Initialisation Tests
// ============================================================================

#[test]
fn init_succeeds_and_goes_idle() {
    let chip = SharedChip::new();
    let mut radio = radio(&chip);

    radio.init().unwrap();
    assert_eq!(radio.state(), State::Idle);

    // reset asserted first, then standby committed
    let chip = chip.chip();
    assert!(chip.writes_to(REG_PWRMODE) >= 2);
    let (_, first) = chip
        .writes
        .iter()
        .find(|(addr, _)| *addr == REG_PWRMODE)
        .unwrap();
    assert_eq!(first[0] & 0x80, 0x80);
    assert_eq!(chip.last_write(REG_PWRMODE).unwrap(), [0x65]);
}

#[test]
fn init_dead_bus_reports_port_failure() {
    let chip = SharedChip::new();
    chip.chip().fail_all = true;
    let mut radio = radio(&chip);

    assert_eq!(radio.init().unwrap_err(), Error::PortFailed);
    assert_eq!(radio.state(), State::Uninitialized);
}

#[test]
fn init_wrong_scratch_rejected() {
    let chip = SharedChip::new();
    chip.chip().regs.insert(0x0001, vec![0x00]);
    let mut radio = radio(&chip);

    assert_eq!(radio.init().unwrap_err(), Error::BadScratch(0x00));
    assert_eq!(radio.state(), State::Uninitialized);
}

#[test]
fn init_wrong_revision_rejected() {
    let chip = SharedChip::new();
    chip.chip().regs.insert(0x0000, vec![0x21]);
    let mut radio = radio(&chip);

    assert_eq!(radio.init().unwrap_err(), Error::BadRevision(0x21));
    assert_eq!(radio.state(), State::Uninitialized);
}

// ============================================================================
// State Machine Tests
// ============================================================================

#[test]
fn tx_packet_before_any_tx_on_rejected() {
    let chip = SharedChip::new();
    let mut radio = radio(&chip);

    // before init
    assert_eq!(
        radio.tx_packet(b"hello").unwrap_err(),
        Error::NotTransmitting
    );
    assert_eq!(radio.state(), State::Uninitialized);

    // after init but still idle
    radio.init().unwrap();
    assert_eq!(
        radio.tx_packet(b"hello").unwrap_err(),
        Error::NotTransmitting
    );
    assert_eq!(radio.state(), State::Idle);
}

#[test]
fn mode_entry_requires_init() {
    let chip = SharedChip::new();
    let mut radio = radio(&chip);
    let mut modulation = Modulation::fsk(9600, 0.5);

    assert_eq!(
        radio.tx_on(&mut modulation).unwrap_err(),
        Error::Uninitialized
    );
}

#[test]
fn tx_to_rx_must_pass_through_idle() {
    let chip = SharedChip::new();
    let mut radio = radio(&chip);
    let mut modulation = Modulation::fsk(9600, 0.5);

    radio.init().unwrap();
    radio.tx_on(&mut modulation).unwrap();
    assert_eq!(radio.state(), State::TransmitActive);

    // direct switch fails cleanly, transmit stays armed
    assert_eq!(radio.rx_on(&mut modulation).unwrap_err(), Error::NotIdle);
    assert_eq!(radio.state(), State::TransmitActive);

    radio.stop().unwrap();
    assert_eq!(radio.state(), State::Idle);

    radio.rx_on(&mut modulation).unwrap();
    assert_eq!(radio.state(), State::ReceiveActive);
}

#[test]
fn stop_is_a_no_op_when_idle() {
    let chip = SharedChip::new();
    let mut radio = radio(&chip);

    assert_eq!(radio.stop().unwrap_err(), Error::Uninitialized);
    radio.init().unwrap();
    radio.stop().unwrap();
    assert_eq!(radio.state(), State::Idle);
}

// ============================================================================
// Transmit Path Tests
// ============================================================================

#[test]
fn end_to_end_fsk_transmit() {
    let chip = SharedChip::new();
    let mut radio = radio(&chip);

    radio.init().unwrap();

    let mut modulation = Modulation::fsk(9600, 0.5);
    modulation.power = 0.5;
    radio.tx_on(&mut modulation).unwrap();
    assert_eq!(radio.state(), State::TransmitActive);

    {
        let chip = chip.chip();
        assert_eq!(chip.last_write(REG_DECIMATION).unwrap(), [16]);
        // 13333 = 0x003415
        assert_eq!(chip.last_write(REG_RXDATARATE).unwrap(), [0x00, 0x34, 0x15]);
        assert_eq!(chip.last_write(REG_PWRMODE).unwrap(), [0x6D]);
    }

    let payload = [0xA5u8; 32];
    radio.tx_packet(&payload).unwrap();

    let chip = chip.chip();
    // exactly one exchange carried the framed payload
    assert_eq!(chip.fifo_write_exchanges, 1);
    assert_eq!(chip.fifo_commits, 1);
    let mut expected = vec![0xE1, 33, 0x03];
    expected.extend_from_slice(&payload);
    assert_eq!(chip.fifo_written, expected);
}

#[test]
fn oversized_packet_rejected_without_state_change() {
    let chip = SharedChip::new();
    let mut radio = radio(&chip);
    let mut modulation = Modulation::fsk(9600, 0.5);

    radio.init().unwrap();
    radio.tx_on(&mut modulation).unwrap();

    let oversized = [0u8; MAX_PACKET_LEN + 1];
    assert_eq!(
        radio.tx_packet(&oversized).unwrap_err(),
        Error::PacketTooLong {
            length: MAX_PACKET_LEN + 1,
            max: MAX_PACKET_LEN,
        }
    );
    assert_eq!(radio.state(), State::TransmitActive);
    assert_eq!(chip.chip().fifo_write_exchanges, 0);
}

// ============================================================================
// Autoranging Tests
// ============================================================================

#[test]
fn autorange_runs_once_and_is_idempotent() {
    let chip = SharedChip::new();
    let mut radio = radio(&chip);
    let mut modulation = Modulation::fsk(9600, 0.5);

    radio.init().unwrap();
    radio.tx_on(&mut modulation).unwrap();
    assert_eq!(radio.config().synth_a.vco_range(), Some(5));
    assert_eq!(chip.chip().writes_to(REG_PLLRANGING_A), 1);

    radio.stop().unwrap();
    radio.tx_on(&mut modulation).unwrap();

    // unchanged frequency: cached range reused, no second ranging cycle
    assert_eq!(chip.chip().writes_to(REG_PLLRANGING_A), 1);
    assert_eq!(radio.config().synth_a.vco_range(), Some(5));
}

#[test]
fn retune_beyond_one_step_reruns_ranging() {
    let chip = SharedChip::new();
    let mut radio = radio(&chip);
    let mut modulation = Modulation::fsk(9600, 0.5);

    radio.init().unwrap();
    radio.tx_on(&mut modulation).unwrap();
    radio.stop().unwrap();

    radio.config_mut().synth_a.set_frequency(434_920_000);
    radio.tx_on(&mut modulation).unwrap();

    assert_eq!(chip.chip().writes_to(REG_PLLRANGING_A), 2);
}

#[test]
fn autorange_timeout_leaves_idle() {
    let chip = SharedChip::new();
    chip.chip().ranging_never_completes = true;
    let mut radio = radio(&chip);
    let mut modulation = Modulation::fsk(9600, 0.5);

    radio.init().unwrap();
    assert_eq!(
        radio.tx_on(&mut modulation).unwrap_err(),
        Error::AutorangeTimeout
    );
    assert_eq!(radio.state(), State::Idle);
    // backed out to standby
    assert_eq!(chip.chip().last_write(REG_PWRMODE).unwrap(), [0x65]);
}

#[test]
fn autorange_error_reports_failed_range() {
    let chip = SharedChip::new();
    chip.chip().ranging_error = true;
    let mut radio = radio(&chip);
    let mut modulation = Modulation::fsk(9600, 0.5);

    radio.init().unwrap();
    assert_eq!(
        radio.tx_on(&mut modulation).unwrap_err(),
        Error::AutorangeFailed(5)
    );
    assert_eq!(radio.state(), State::Idle);
    assert_eq!(radio.config().synth_a.vco_range(), None);
}

// ============================================================================
// Resolution Failure Tests
// ============================================================================

#[test]
fn frequency_out_of_range_leaves_idle() {
    let chip = SharedChip::new();
    let mut config = test_config();
    config.synth_a.set_frequency(2_000_000_000);
    let mut radio = Ax5043::new(chip.clone(), config, |_, _| {});
    let mut modulation = Modulation::fsk(9600, 0.5);

    radio.init().unwrap();
    assert_eq!(
        radio.tx_on(&mut modulation).unwrap_err(),
        Error::FrequencyOutOfRange
    );
    assert_eq!(radio.state(), State::Idle);
}

#[test]
fn clock_is_resolved_once_and_cached() {
    let chip = SharedChip::new();
    let mut radio = radio(&chip);
    let mut modulation = Modulation::fsk(9600, 0.5);

    radio.init().unwrap();
    assert!(radio.config().clock.is_none());

    radio.tx_on(&mut modulation).unwrap();
    let clock = radio.config().clock.unwrap();
    assert_eq!(clock.xtal_div, 1);
    assert_eq!(radio.config().pll_range_hz, Some(62_500));
}

// ============================================================================
// TCXO Hook Tests
// ============================================================================

#[test]
fn tcxo_pin_follows_the_lifecycle() {
    let chip = SharedChip::new();
    let pin = MockPin::new();
    let mut radio = Ax5043::with_tcxo(chip.clone(), test_config(), pin.clone(), |_, _| {});
    let mut modulation = Modulation::fsk(9600, 0.5);

    radio.init().unwrap();
    assert_eq!(pin.level(), None);

    radio.tx_on(&mut modulation).unwrap();
    assert_eq!(pin.level(), Some(true));

    radio.stop().unwrap();
    assert_eq!(pin.level(), Some(false));
}

#[test]
fn tcxo_pin_released_when_mode_entry_fails() {
    let chip = SharedChip::new();
    chip.chip().ranging_never_completes = true;
    let pin = MockPin::new();
    let mut radio = Ax5043::with_tcxo(chip.clone(), test_config(), pin.clone(), |_, _| {});
    let mut modulation = Modulation::fsk(9600, 0.5);

    radio.init().unwrap();
    assert!(radio.tx_on(&mut modulation).is_err());
    assert_eq!(pin.level(), Some(false));
}
