//! FIFO and packet handling registers
//!
//! This module contains registers for moving packet data through the
//! 256-byte FIFO and controlling what the packet engine stores alongside
//! received frames:
//! - FIFO status, commands and fill counters
//! - Packet store and accept flag masks
//! - FIFO chunk header constants and per-frame status flags
//!
//! Data moves through the FIFO in self-describing chunks. The top three
//! bits of each chunk header encode its payload size; variable-size chunks
//! (like DATA) carry an explicit length byte.

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// FIFO data port address, accessed as a byte stream rather than a typed
/// register
pub const FIFO_DATA_ADDR: u16 = 0x0029;

/// Maximum payload of a single DATA chunk: the 256-byte FIFO minus the
/// three chunk header bytes (command, length, flags)
pub const FIFO_MAX_PAYLOAD: usize = 253;

bitflags::bitflags! {
    /// FIFO status flags, as read from [`FifoStat`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FifoStatus: u8 {
        /// FIFO empty
        const EMPTY = 1 << 0;
        /// FIFO full
        const FULL = 1 << 1;
        /// Underrun occurred
        const UNDER = 1 << 2;
        /// Overrun occurred
        const OVER = 1 << 3;
        /// Count threshold crossed
        const CNT_THR = 1 << 4;
        /// Free threshold crossed
        const FREE_THR = 1 << 5;
        /// Auto commit enabled
        const AUTO_COMMIT = 1 << 6;
    }
}

/// FIFO status register (address: 0x028, read)
#[register(0x0028u16)]
#[derive(Debug, Clone, Copy, ReadableRegister)]
pub struct FifoStat {
    /// Current status flags
    pub status: FifoStatus,
}

impl FromByteArray for FifoStat {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            status: FifoStatus::from_bits_truncate(bytes[0]),
        })
    }
}

/// FIFO command register (address: 0x028, write)
///
/// Writing the same address a status read uses issues a FIFO command
/// instead.
///
/// # Important Notes
/// - Written chunks are invisible to the transmitter until `Commit`
/// - `Rollback` discards everything written since the last commit
#[register(0x0028u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, WritableRegister)]
pub enum FifoCmd {
    /// No operation
    NoOp = 0x00,
    /// Clear error flags
    ClearError = 0x02,
    /// Discard all FIFO contents
    ClearData = 0x03,
    /// Commit written chunks for transmission
    Commit = 0x04,
    /// Discard uncommitted chunks
    Rollback = 0x05,
}

impl ToByteArray for FifoCmd {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self as u8])
    }
}

/// FIFO count register (address: 0x02A)
///
/// Number of committed bytes waiting to be read.
#[register(0x002Au16)]
#[derive(Debug, Clone, Copy, ReadableRegister, Default)]
pub struct FifoCount {
    /// Committed byte count
    pub value: u16,
}

impl FromByteArray for FifoCount {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: u16::from_be_bytes(bytes),
        })
    }
}

/// FIFO free register (address: 0x02C)
///
/// Number of bytes that can be written without overflowing.
#[register(0x002Cu16)]
#[derive(Debug, Clone, Copy, ReadableRegister, Default)]
pub struct FifoFree {
    /// Free byte count
    pub value: u16,
}

impl FromByteArray for FifoFree {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: u16::from_be_bytes(bytes),
        })
    }
}

bitflags::bitflags! {
    /// Packet store flags, as written to [`PktStoreFlagsReg`]
    ///
    /// Each set flag makes the packet engine append the corresponding
    /// status chunk to the FIFO alongside received frames.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PktStoreFlags: u8 {
        /// Store the reception timestamp
        const TIMER = 1 << 0;
        /// Store the tracked frequency offset
        const FREQ_OFFSET = 1 << 1;
        /// Store the tracked RF frequency offset
        const RF_OFFSET = 1 << 2;
        /// Store the tracked data rate offset
        const DATARATE = 1 << 3;
        /// Store the packet RSSI
        const RSSI = 1 << 4;
        /// Store the received CRC bytes
        const CRC_BYTES = 1 << 5;
        /// Store per-antenna RSSI
        const ANTENNA_RSSI = 1 << 6;
    }
}

/// Packet store flags register (address: 0x232)
#[register(0x0232u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct PktStoreFlagsReg {
    /// Active store flags
    pub flags: PktStoreFlags,
}

impl FromByteArray for PktStoreFlagsReg {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            flags: PktStoreFlags::from_bits_truncate(bytes[0]),
        })
    }
}

impl ToByteArray for PktStoreFlagsReg {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.flags.bits()])
    }
}

bitflags::bitflags! {
    /// Packet accept flags, as written to [`PktAcceptFlagsReg`]
    ///
    /// Each set flag lets the corresponding class of damaged or oversized
    /// frame through to the FIFO instead of being dropped.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PktAcceptFlags: u8 {
        /// Accept frames with a non-integral byte count
        const RESIDUE = 1 << 0;
        /// Accept aborted frames
        const ABORTED = 1 << 1;
        /// Accept frames with failed CRC
        const CRC_FAILED = 1 << 2;
        /// Accept frames failing address match
        const ADDR_FAILED = 1 << 3;
        /// Accept oversized frames
        const OVERSIZED = 1 << 4;
        /// Accept packets spanning multiple FIFO chunks
        const MULTI_CHUNK = 1 << 5;
    }
}

/// Packet accept flags register (address: 0x233)
#[register(0x0233u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct PktAcceptFlagsReg {
    /// Active accept flags
    pub flags: PktAcceptFlags,
}

impl FromByteArray for PktAcceptFlagsReg {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            flags: PktAcceptFlags::from_bits_truncate(bytes[0]),
        })
    }
}

impl ToByteArray for PktAcceptFlagsReg {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.flags.bits()])
    }
}

/// FIFO chunk header bytes
///
/// The top three bits of each header encode the chunk payload size:
/// 0b000..=0b011 map to zero through three bytes, 0b111 marks a
/// variable-size chunk whose next byte is the payload length.
pub mod chunk {
    /// Variable-size data chunk (TX payload or received frame segment)
    pub const DATA: u8 = 0xE1;
    /// Received signal strength, one byte
    pub const RSSI: u8 = 0x31;
    /// Tracked frequency offset, two bytes
    pub const FREQ_OFFSET: u8 = 0x52;
    /// Per-antenna RSSI, two bytes
    pub const ANTENNA_RSSI: u8 = 0x55;
    /// Reception timestamp, three bytes
    pub const TIMER: u8 = 0x70;
    /// Tracked RF frequency offset, three bytes
    pub const RF_OFFSET: u8 = 0x73;
    /// Tracked data rate offset, three bytes
    pub const DATARATE: u8 = 0x74;

    /// Fixed payload size encoded in a chunk header, or `None` for
    /// variable-size chunks
    pub fn fixed_size(header: u8) -> Option<usize> {
        match header >> 5 {
            0b111 => None,
            size @ 0..=0b011 => Some(size as usize),
            _ => Some(0),
        }
    }
}

bitflags::bitflags! {
    /// Flags byte leading a transmitted DATA chunk
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TxDataFlags: u8 {
        /// First chunk of a packet
        const PKTSTART = 1 << 0;
        /// Last chunk of a packet
        const PKTEND = 1 << 1;
        /// Last byte is a partial byte
        const RESIDUE = 1 << 2;
        /// Suppress CRC generation for this packet
        const NOCRC = 1 << 3;
        /// Bypass the framing engine
        const RAW = 1 << 4;
        /// Bypass encoder and framing
        const UNENC = 1 << 5;
    }
}

bitflags::bitflags! {
    /// Flags byte leading a received DATA chunk
    ///
    /// Delivered to the receive callback together with the frame payload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct RxDataFlags: u8 {
        /// First chunk of a packet
        const PKTSTART = 1 << 0;
        /// Last chunk of a packet
        const PKTEND = 1 << 1;
        /// Frame ended on a partial byte
        const RESIDUE = 1 << 2;
        /// Frame check sequence did not match
        const CRC_FAILED = 1 << 3;
        /// Frame failed address match
        const ADDR_FAILED = 1 << 4;
        /// Frame exceeded the size limit
        const OVERSIZED = 1 << 5;
        /// Frame was aborted mid-air
        const ABORTED = 1 << 6;
    }
}
