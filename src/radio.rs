//! Radio lifecycle state machine
//!
//! This module sequences the chip through initialisation, transmit and
//! receive, owning the legal-transition table:
//!
//! ```text
//! Uninitialized --init--> Idle --tx_on--> TransmitActive
//!                          ^  \--rx_on--> ReceiveActive
//!                          |______stop________/
//! ```
//!
//! `tx_packet` is legal only while transmitting; receive delivery happens
//! only while receiving. Moving between the two active modes requires an
//! explicit [`stop`](Ax5043::stop) through `Idle`, so TX and RX register
//! sets are never armed at the same time.
//!
//! Mode entry resolves everything first (clock, modulation, synthesiser)
//! and then commits registers in a fixed order: clock, synthesiser
//! (including autoranging), modulation, power. A failure anywhere backs
//! the chip out to standby and leaves the lifecycle state untouched, so
//! the caller can fix the condition and retry.
//!
//! # Caller contract
//! One radio value exists per physical chip. No two operations may run
//! concurrently against it; the host serializes calls (mutex or a single
//! owning thread). All calls are synchronous and blocking, with the only
//! bounded-retry loop inside autoranging.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;

use crate::config::{ClockConfig, Config, NoTcxo, SynthSel};
use crate::device::Device;
use crate::error::Error;
use crate::modulation::Modulation;
use crate::registers::{
    chunk, Decimation, Encoding, Fec, FifoCmd, FifoCount, FramingReg, MaxDrOffset, ModulationReg,
    PktAcceptFlagsReg, PktStoreFlagsReg, PowerMode, PwrMode, Revision, RxDataFlags, RxDataRate,
    Scratch, FIFO_MAX_PAYLOAD,
};
use crate::registers::{PllRngClk, TxDataFlags};
use crate::synth;

/// Largest payload accepted by [`Ax5043::tx_packet`]
pub const MAX_PACKET_LEN: usize = FIFO_MAX_PAYLOAD;

/// Upper bound on the PLL ranging clock when it is derived, Hz
pub const PLL_RANGING_CLOCK_MAX_HZ: u32 = 100_000;

/// Radio lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Chip presence not yet verified
    #[default]
    Uninitialized,
    /// Initialised, no mode active
    Idle,
    /// Transmitter armed
    TransmitActive,
    /// Receiver armed, callback delivery live
    ReceiveActive,
}

/// An AX5043 radio.
///
/// Wraps the SPI transport, the host-owned [`Config`], an optional TCXO
/// enable pin and the receive callback. Derived configuration is written
/// back into the config in place as modes are entered; the driver keeps no
/// second copy.
pub struct Ax5043<SPI, TCXO, RX> {
    device: Device<SPI>,
    config: Config,
    tcxo: Option<TCXO>,
    rx_callback: RX,
    state: State,
}

impl<SPI, RX> Ax5043<SPI, NoTcxo, RX>
where
    SPI: SpiDevice,
    RX: FnMut(&[u8], RxDataFlags),
{
    /// Creates a radio with no TCXO enable hook (crystal clock sources).
    pub fn new(spi: SPI, config: Config, rx_callback: RX) -> Self {
        Self {
            device: Device::new(spi),
            config,
            tcxo: None,
            rx_callback,
            state: State::Uninitialized,
        }
    }
}

impl<SPI, TCXO, RX> Ax5043<SPI, TCXO, RX>
where
    SPI: SpiDevice,
    TCXO: OutputPin,
    RX: FnMut(&[u8], RxDataFlags),
{
    /// Creates a radio whose TCXO is powered through the given enable pin.
    ///
    /// The pin is raised before any operation that runs the synthesiser
    /// and lowered again by [`stop`](Self::stop).
    pub fn with_tcxo(spi: SPI, config: Config, tcxo: TCXO, rx_callback: RX) -> Self {
        Self {
            device: Device::new(spi),
            config,
            tcxo: Some(tcxo),
            rx_callback,
            state: State::Uninitialized,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> State {
        self.state
    }

    /// The host configuration, including fields derived so far
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable access to the host configuration.
    ///
    /// Changing clock or synthesiser inputs takes effect on the next mode
    /// entry.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Releases the underlying SPI device.
    pub fn release(self) -> SPI {
        self.device.release()
    }

    /// Verifies chip presence and brings the radio to `Idle`.
    ///
    /// The sequence is: scratch sentinel (chip presence), silicon revision
    /// (supported part), then a reset and standby power-mode commit with
    /// readback verification. Modulation and synthesiser state is left
    /// untouched; it resolves lazily when a mode is entered.
    ///
    /// # Errors
    /// * `PortFailed` - the first transport exchange failed
    /// * `BadScratch` - no chip answered with the scratch sentinel
    /// * `BadRevision` - unsupported silicon revision
    /// * `SetSpiFailed` - the power-mode commit did not read back
    pub fn init(&mut self) -> Result<(), Error> {
        let scratch: Scratch = self
            .device
            .read_register()
            .map_err(|_| Error::PortFailed)?;
        if scratch.value != Scratch::SENTINEL {
            return Err(Error::BadScratch(scratch.value));
        }

        let revision: Revision = self.device.read_register()?;
        if revision.value != Revision::PRODUCTION {
            return Err(Error::BadRevision(revision.value));
        }

        let standby = PwrMode {
            mode: PowerMode::Standby,
            xo_enable: true,
            ref_enable: true,
            reset: false,
        };
        self.device
            .write_register(PwrMode {
                reset: true,
                ..standby
            })
            .map_err(|_| Error::SetSpiFailed)?;
        self.device
            .write_register(standby)
            .map_err(|_| Error::SetSpiFailed)?;
        let readback: PwrMode = self
            .device
            .read_register()
            .map_err(|_| Error::SetSpiFailed)?;
        if readback.mode != PowerMode::Standby {
            return Err(Error::SetSpiFailed);
        }

        self.config.power_mode = PowerMode::Standby;
        self.state = State::Idle;
        log::debug!("ax5043 initialised, revision 0x{:02x}", revision.value);
        Ok(())
    }

    /// Arms the transmitter.
    ///
    /// Resolves the clock (once), the modulation descriptor and the active
    /// synthesiser, commits all registers, then enters full TX. On any
    /// failure the chip is backed out to standby and the state stays
    /// `Idle`.
    pub fn tx_on(&mut self, modulation: &mut Modulation) -> Result<(), Error> {
        self.enter_mode(modulation, false)
    }

    /// Arms the receiver.
    ///
    /// Symmetric to [`tx_on`](Self::tx_on); additionally programs the
    /// packet store flags and arms receive-callback delivery.
    pub fn rx_on(&mut self, modulation: &mut Modulation) -> Result<(), Error> {
        self.enter_mode(modulation, true)
    }

    /// Stops an active mode and returns to `Idle`.
    ///
    /// A no-op when already idle. Lowers the TCXO enable hook after the
    /// chip is back in standby.
    pub fn stop(&mut self) -> Result<(), Error> {
        match self.state {
            State::Uninitialized => Err(Error::Uninitialized),
            State::Idle => Ok(()),
            State::TransmitActive | State::ReceiveActive => {
                self.device.write_register(PwrMode {
                    mode: PowerMode::Standby,
                    xo_enable: true,
                    ref_enable: true,
                    reset: false,
                })?;
                self.config.power_mode = PowerMode::Standby;
                if let Some(tcxo) = self.tcxo.as_mut() {
                    tcxo.set_low().map_err(|_| Error::TcxoFailed)?;
                }
                self.state = State::Idle;
                log::debug!("ax5043 stopped, idle");
                Ok(())
            }
        }
    }

    /// Frames and transmits one packet.
    ///
    /// The payload goes out as a single DATA chunk (start and end flags
    /// set) in one FIFO exchange, followed by a commit. The call blocks
    /// until both exchanges complete; once the bytes are handed to the
    /// transport they are committed and cannot be cancelled.
    ///
    /// # Errors
    /// * `NotTransmitting` - the radio is not in `TransmitActive`
    /// * `PacketTooLong` - payload above [`MAX_PACKET_LEN`]
    ///
    /// Failures leave the lifecycle state unchanged.
    pub fn tx_packet(&mut self, packet: &[u8]) -> Result<(), Error> {
        if self.state != State::TransmitActive {
            return Err(Error::NotTransmitting);
        }
        if packet.len() > MAX_PACKET_LEN {
            return Err(Error::PacketTooLong {
                length: packet.len(),
                max: MAX_PACKET_LEN,
            });
        }

        let mut frame = [0u8; MAX_PACKET_LEN + 3];
        frame[0] = chunk::DATA;
        frame[1] = packet.len() as u8 + 1;
        frame[2] = (TxDataFlags::PKTSTART | TxDataFlags::PKTEND).bits();
        frame[3..3 + packet.len()].copy_from_slice(packet);

        self.device.write_fifo(&frame[..packet.len() + 3])?;
        self.device.write_register(FifoCmd::Commit)?;
        log::trace!("tx_packet committed {} bytes", packet.len());
        Ok(())
    }

    /// Services the receive FIFO.
    ///
    /// Drains at most one chunk per call. A DATA chunk is delivered to the
    /// receive callback exactly once, in arrival order, together with its
    /// per-frame status flags; status chunks are skipped by their header
    /// size code. Returns whether a frame was delivered.
    ///
    /// The host drives this from whatever context services the chip
    /// (interrupt line or polling loop); the callback runs synchronously
    /// inside the call and nothing is buffered beyond it.
    ///
    /// # Errors
    /// * `NotReceiving` - the radio is not in `ReceiveActive`
    pub fn poll_receive(&mut self) -> Result<bool, Error> {
        if self.state != State::ReceiveActive {
            return Err(Error::NotReceiving);
        }

        let count: FifoCount = self.device.read_register()?;
        if count.value == 0 {
            return Ok(false);
        }

        let mut header = [0u8; 1];
        self.device.read_fifo(&mut header)?;

        match chunk::fixed_size(header[0]) {
            Some(0) => Ok(false),
            Some(skip) => {
                let mut discard = [0u8; 3];
                self.device.read_fifo(&mut discard[..skip])?;
                Ok(false)
            }
            None => {
                let mut length = [0u8; 1];
                self.device.read_fifo(&mut length)?;
                let length = length[0] as usize;
                if length == 0 {
                    return Ok(false);
                }

                let mut buf = [0u8; 256];
                self.device.read_fifo(&mut buf[..length])?;
                if header[0] != chunk::DATA {
                    return Ok(false);
                }

                let flags = RxDataFlags::from_bits_truncate(buf[0]);
                (self.rx_callback)(&buf[1..length], flags);
                Ok(true)
            }
        }
    }

    fn enter_mode(&mut self, modulation: &mut Modulation, receive: bool) -> Result<(), Error> {
        match self.state {
            State::Uninitialized => return Err(Error::Uninitialized),
            State::TransmitActive | State::ReceiveActive => return Err(Error::NotIdle),
            State::Idle => {}
        }

        if let Some(tcxo) = self.tcxo.as_mut() {
            tcxo.set_high().map_err(|_| Error::TcxoFailed)?;
        }

        if let Err(err) = self.program_mode(modulation, receive) {
            // Back out so no partially programmed mode is left armed
            let _ = self.device.write_register(PwrMode {
                mode: PowerMode::Standby,
                xo_enable: true,
                ref_enable: true,
                reset: false,
            });
            if let Some(tcxo) = self.tcxo.as_mut() {
                let _ = tcxo.set_low();
            }
            return Err(err);
        }

        self.state = if receive {
            State::ReceiveActive
        } else {
            State::TransmitActive
        };
        log::debug!(
            "ax5043 {} active",
            if receive { "receive" } else { "transmit" }
        );
        Ok(())
    }

    fn program_mode(&mut self, modulation: &mut Modulation, receive: bool) -> Result<(), Error> {
        let Self { device, config, .. } = self;

        let clock = match config.clock {
            Some(clock) => clock,
            None => {
                let clock =
                    ClockConfig::resolve(config.clock_source, config.f_xtal, config.error_ppm)?;
                config.clock = Some(clock);
                clock
            }
        };
        let pll_range_hz = match config.pll_range_hz {
            Some(hz) => hz,
            None => {
                let hz = ranging_clock(clock.f_xtal);
                config.pll_range_hz = Some(hz);
                hz
            }
        };
        let resolved = *modulation.resolve(&clock, pll_range_hz)?;

        // Commit order: clock, synthesiser, modulation, power
        let standby = PwrMode {
            mode: PowerMode::Standby,
            xo_enable: true,
            ref_enable: true,
            reset: false,
        };
        device.write_register(standby)?;
        device.write_register(clock.xtal_cap_reg())?;
        device.write_register(clock.tuning())?;
        device.write_register(PllRngClk {
            divider_exp: ranging_clock_exp(clock.f_xtal),
        })?;

        let sel = config.active_synth;
        let vco = config.vco;
        let synth_state = match sel {
            SynthSel::A => &mut config.synth_a,
            SynthSel::B => &mut config.synth_b,
        };
        synth::commit(device, synth_state, sel, vco, &clock)?;

        device.write_register(ModulationReg {
            mode: modulation.mode(),
        })?;
        device.write_register(Encoding {
            flags: modulation.encoding,
        })?;
        device.write_register(FramingReg {
            frame: modulation.framing,
            crc: modulation.crc,
        })?;
        device.write_register(Fec {
            enabled: modulation.fec,
        })?;
        device.write_register(Decimation {
            value: resolved.decimation,
        })?;
        device.write_register(RxDataRate {
            value: resolved.rx_data_rate,
        })?;
        // Data rate tracking off; both ends run budgeted references
        device.write_register(MaxDrOffset { value: 0 })?;
        device.write_register(resolved.max_rf_offset_reg(clock.f_xtal))?;
        device.write_register(modulation.deviation_reg(clock.f_xtal))?;
        if let Some((mark, space)) = modulation.afsk_tone_regs(clock.f_xtal) {
            device.write_register(mark)?;
            device.write_register(space)?;
        }
        device.write_register(modulation.tx_rate_reg(clock.f_xtal))?;

        device.write_register(modulation.power_reg())?;

        if receive {
            device.write_register(PktStoreFlagsReg {
                flags: config.pkt_store_flags,
            })?;
            device.write_register(PktAcceptFlagsReg::default())?;
        }

        let mode = if receive {
            PowerMode::FullRx
        } else {
            PowerMode::FullTx
        };
        device.write_register(PwrMode { mode, ..standby })?;
        config.power_mode = mode;
        Ok(())
    }
}

fn ranging_clock_exp(f_xtal: u32) -> u8 {
    // Smallest extra exponent keeping f_xtal / 2^(8+n) at or below the cap
    let mut exp = 0u8;
    while exp < 7 && (f_xtal >> (8 + exp)) > PLL_RANGING_CLOCK_MAX_HZ {
        exp += 1;
    }
    exp
}

fn ranging_clock(f_xtal: u32) -> u32 {
    f_xtal >> (8 + ranging_clock_exp(f_xtal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranging_clock_respects_cap() {
        assert_eq!(ranging_clock(16_000_000), 62_500);
        assert_eq!(ranging_clock(48_000_000), 93_750);
        assert!(ranging_clock(50_000_000) <= PLL_RANGING_CLOCK_MAX_HZ);
    }
}
