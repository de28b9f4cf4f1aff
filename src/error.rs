//! Error types for the AX5043 driver
//!
//! Every fallible operation returns [`Error`] directly; nothing is retried
//! internally and no failure is logged away. Configuration mistakes
//! (invalid clock, modulation or frequency parameters) surface immediately
//! and can be corrected and retried by the caller. Hardware-presence
//! failures (`PortFailed`, `BadScratch`, `BadRevision`, `SetSpiFailed`)
//! leave the radio unusable until it is re-initialised. Autoranging
//! failures may warrant a caller-driven retry with adjusted parameters.

use regiface::errors::Error as RegifaceError;

/// The error type for all radio operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A transport exchange failed
    PortFailed,
    /// The scratch register did not read back its reset sentinel; no chip
    /// is responding at this bus address
    BadScratch(u8),
    /// The silicon revision register read back an unsupported revision
    BadRevision(u8),
    /// The power-mode commit during initialisation failed its readback
    SetSpiFailed,
    /// Clock source parameters outside the supported range (zero
    /// frequency, excessive ppm error, load capacitance or reference
    /// frequency outside the chip's windows)
    InvalidClockConfig,
    /// Carrier frequency outside the tunable span of the selected divider
    FrequencyOutOfRange,
    /// The VCO ranging cycle did not report completion within the poll
    /// budget
    AutorangeTimeout,
    /// The VCO ranging cycle completed but found no usable range; the
    /// payload is the range nibble the chip stopped at
    AutorangeFailed(u8),
    /// The requested bitrate cannot be represented by the
    /// decimation/datarate registers for the resolved clock
    UnsupportedBitrate,
    /// AFSK tone frequencies violate the decimated audio Nyquist limit or
    /// are not distinct
    InvalidToneFrequencies,
    /// FSK modulation index must be positive
    InvalidModulationIndex,
    /// Transmit power must lie in (0, 1]
    InvalidTxPower,
    /// Maximum carrier delta does not fit the AFC limit register or
    /// exceeds the PLL ranging resolution
    InvalidCarrierDelta,
    /// TCXO enable hook failed
    TcxoFailed,
    /// Operation requires a successfully initialised radio
    Uninitialized,
    /// Mode entry requires the radio to be idle; stop the active mode
    /// first
    NotIdle,
    /// `tx_packet` is only legal while transmitting
    NotTransmitting,
    /// Receive polling is only legal while receiving
    NotReceiving,
    /// Packet exceeds the largest frame the FIFO can hold
    PacketTooLong {
        /// Requested payload length
        length: usize,
        /// Largest supported payload
        max: usize,
    },
}

impl From<RegifaceError> for Error {
    fn from(_: RegifaceError) -> Self {
        Error::PortFailed
    }
}
