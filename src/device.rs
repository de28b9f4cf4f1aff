//! AX5043 Radio Device Interface
//!
//! This module provides the byte-transport boundary of the driver. It wraps
//! the host-injected SPI interface and provides methods for:
//! - Reading and writing device registers
//! - Streaming bytes through the packet FIFO
//!
//! The AX5043 is addressed with its long access format: every transfer
//! starts with two address bytes (`0x7m aa` for reads, `0xFm aa` for
//! writes, where `m:aa` is the 12-bit register address) followed by the
//! value bytes. Each register or FIFO access is issued as a single SPI
//! transaction, so the host transport sees one atomic full-duplex exchange
//! per access and no assumptions are made about bus timing between
//! exchanges.
//!
//! # Example
//! ```no_run
//! use embedded_hal::spi::SpiDevice;
//! use ax5043::{Device, Error, Revision};
//!
//! fn check_presence<SPI: SpiDevice>(spi: SPI) -> Result<u8, Error> {
//!     let mut device = Device::new(spi);
//!
//!     // Read a register
//!     let rev: Revision = device.read_register()?;
//!
//!     Ok(rev.value)
//! }
//! ```

use core::convert::Infallible;

use regiface::{
    errors::Error as RegifaceError, ByteArray, FromByteArray, ReadableRegister, ToByteArray,
    WritableRegister,
};

use crate::registers::FIFO_DATA_ADDR;

const LONG_ACCESS_READ: u8 = 0x70;
const LONG_ACCESS_WRITE: u8 = 0xF0;

/// Main device interface for the AX5043 radio.
///
/// This struct wraps an SPI interface and provides methods to interact with
/// the radio. All operations are synchronous, blocking calls: a register
/// access either completes on a single transport exchange or fails.
pub struct Device<SPI> {
    spi: SPI,
}

impl<SPI> Device<SPI> {
    /// Creates a new Device instance wrapping the provided SPI interface.
    ///
    /// # Arguments
    /// * `spi` - An SPI interface implementing the required embedded-hal traits
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Releases the underlying SPI device.
    ///
    /// This method consumes the Device instance and returns the wrapped SPI interface.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> Device<SPI>
where
    SPI: embedded_hal::spi::SpiDevice,
{
    fn header(addr: u16, write: bool) -> [u8; 2] {
        let prefix = if write {
            LONG_ACCESS_WRITE
        } else {
            LONG_ACCESS_READ
        };
        [prefix | ((addr >> 8) as u8 & 0x0F), addr as u8]
    }

    /// Reads a register value from the device.
    ///
    /// # Type Parameters
    /// * `R` - Register type implementing ReadableRegister with u16 ID
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    /// * `RegifaceError::DeserializationError` - Failed to parse register value
    pub fn read_register<R>(&mut self) -> Result<R, RegifaceError>
    where
        R: ReadableRegister<IdType = u16>,
    {
        let header = Self::header(R::id(), false);

        let mut raw_value = R::Array::new();

        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(header.as_slice()),
                embedded_hal::spi::Operation::Read(raw_value.as_mut()),
            ])
            .map_err(|_| RegifaceError::BusError)?;

        R::from_bytes(raw_value).map_err(|_| RegifaceError::DeserializationError)
    }

    /// Writes a value to a device register.
    ///
    /// # Type Parameters
    /// * `R` - Register type implementing WritableRegister with u16 ID
    ///
    /// # Arguments
    /// * `register` - The register value to write
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    pub fn write_register<R>(&mut self, register: R) -> Result<(), RegifaceError>
    where
        R: WritableRegister<IdType = u16, Error = Infallible>,
    {
        let header = Self::header(R::id(), true);

        let raw_value = register.to_bytes().unwrap();

        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(header.as_slice()),
                embedded_hal::spi::Operation::Write(raw_value.as_ref()),
            ])
            .map_err(|_| RegifaceError::BusError)
    }

    /// Streams bytes into the packet FIFO.
    ///
    /// The FIFO data port does not auto-increment; repeated access pushes
    /// successive bytes, so a whole chunk goes out as one exchange.
    ///
    /// # Arguments
    /// * `bytes` - Chunk bytes, including the chunk header
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    pub fn write_fifo(&mut self, bytes: &[u8]) -> Result<(), RegifaceError> {
        let header = Self::header(FIFO_DATA_ADDR, true);

        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(header.as_slice()),
                embedded_hal::spi::Operation::Write(bytes),
            ])
            .map_err(|_| RegifaceError::BusError)
    }

    /// Streams bytes out of the packet FIFO.
    ///
    /// # Arguments
    /// * `bytes` - Buffer to fill with FIFO bytes
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    pub fn read_fifo(&mut self, bytes: &mut [u8]) -> Result<(), RegifaceError> {
        let header = Self::header(FIFO_DATA_ADDR, false);

        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(header.as_slice()),
                embedded_hal::spi::Operation::Read(bytes),
            ])
            .map_err(|_| RegifaceError::BusError)
    }
}
