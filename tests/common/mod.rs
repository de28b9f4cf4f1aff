//! Shared test harness: a scripted mock SPI transport standing in for the
//! chip.
//!
//! The mock decodes the long-format address header of every exchange,
//! keeps a register map for readback, records all writes, and emulates the
//! stateful corners the driver depends on: the ranging state machine
//! behind PLLRANGINGA/B, the FIFO data port and the FIFO count register.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use embedded_hal::spi::{Error as SpiErrorTrait, ErrorKind, ErrorType, Operation, SpiDevice};

pub const REG_PWRMODE: u16 = 0x0002;
pub const REG_FIFOSTAT: u16 = 0x0028;
pub const REG_FIFODATA: u16 = 0x0029;
pub const REG_FIFOCOUNT: u16 = 0x002A;
pub const REG_PLLRANGING_A: u16 = 0x0033;
pub const REG_FREQ_A: u16 = 0x0034;
pub const REG_DECIMATION: u16 = 0x0102;
pub const REG_RXDATARATE: u16 = 0x0103;
pub const REG_PKTSTOREFLAGS: u16 = 0x0232;

#[derive(Debug)]
pub struct MockError;

impl SpiErrorTrait for MockError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Scripted chip model behind the mock transport.
pub struct MockChip {
    pub regs: HashMap<u16, Vec<u8>>,
    /// Every register write in order: (address, bytes)
    pub writes: Vec<(u16, Vec<u8>)>,
    /// Total transactions seen
    pub exchanges: usize,
    /// Fail every exchange (dead bus)
    pub fail_all: bool,

    /// Ranging polls before the start bit clears
    pub ranging_polls_until_done: u32,
    /// Ranging cycle ends with the error bit set
    pub ranging_error: bool,
    /// Start bit never clears
    pub ranging_never_completes: bool,
    /// Range nibble the chip settles on
    pub range_result: u8,
    rng_active: bool,
    rng_polls_left: u32,
    rng_value: u8,

    /// Bytes the FIFO will return to reads
    pub fifo_rx: VecDeque<u8>,
    /// Bytes streamed into the FIFO, across all exchanges
    pub fifo_written: Vec<u8>,
    /// Number of FIFO commit commands seen
    pub fifo_commits: usize,
    /// Number of exchanges that streamed bytes into the FIFO
    pub fifo_write_exchanges: usize,
}

impl MockChip {
    pub fn new() -> Self {
        let mut regs = HashMap::new();
        regs.insert(0x0000, vec![0x51]); // REVISION
        regs.insert(0x0001, vec![0xC5]); // SCRATCH
        Self {
            regs,
            writes: Vec::new(),
            exchanges: 0,
            fail_all: false,
            ranging_polls_until_done: 3,
            ranging_error: false,
            ranging_never_completes: false,
            range_result: 0x05,
            rng_active: false,
            rng_polls_left: 0,
            rng_value: 0,
            fifo_rx: VecDeque::new(),
            fifo_written: Vec::new(),
            fifo_commits: 0,
            fifo_write_exchanges: 0,
        }
    }

    /// Queue a received DATA chunk (flags + payload) in the FIFO.
    pub fn push_rx_frame(&mut self, flags: u8, payload: &[u8]) {
        self.fifo_rx.push_back(0xE1);
        self.fifo_rx.push_back(payload.len() as u8 + 1);
        self.fifo_rx.push_back(flags);
        self.fifo_rx.extend(payload.iter().copied());
    }

    /// Queue a fixed-size status chunk in the FIFO.
    pub fn push_rx_status(&mut self, header: u8, payload: &[u8]) {
        self.fifo_rx.push_back(header);
        self.fifo_rx.extend(payload.iter().copied());
    }

    /// Number of writes that touched the given register.
    pub fn writes_to(&self, addr: u16) -> usize {
        self.writes.iter().filter(|(a, _)| *a == addr).count()
    }

    /// Bytes of the most recent write to the given register.
    pub fn last_write(&self, addr: u16) -> Option<&[u8]> {
        self.writes
            .iter()
            .rev()
            .find(|(a, _)| *a == addr)
            .map(|(_, bytes)| bytes.as_slice())
    }

    fn handle_write(&mut self, addr: u16, data: Vec<u8>) {
        self.writes.push((addr, data.clone()));
        match addr {
            REG_FIFODATA => {
                self.fifo_written.extend_from_slice(&data);
                self.fifo_write_exchanges += 1;
            }
            REG_FIFOSTAT => {
                if data.first() == Some(&0x04) {
                    self.fifo_commits += 1;
                }
            }
            REG_PLLRANGING_A | 0x003B => {
                if data.first().map_or(false, |b| b & 0x10 != 0) {
                    self.rng_active = true;
                    self.rng_value = data[0] & 0x0F;
                    self.rng_polls_left = self.ranging_polls_until_done;
                }
                self.regs.insert(addr, data);
            }
            _ => {
                self.regs.insert(addr, data);
            }
        }
    }

    fn handle_read(&mut self, addr: u16, buf: &mut [u8]) {
        match addr {
            REG_FIFODATA => {
                for byte in buf.iter_mut() {
                    *byte = self.fifo_rx.pop_front().unwrap_or(0);
                }
            }
            REG_FIFOCOUNT => {
                let count = self.fifo_rx.len() as u16;
                buf.copy_from_slice(&count.to_be_bytes());
            }
            REG_PLLRANGING_A | 0x003B if self.rng_active => {
                if self.ranging_never_completes {
                    buf[0] = 0x10 | self.rng_value;
                    return;
                }
                self.rng_polls_left = self.rng_polls_left.saturating_sub(1);
                if self.rng_polls_left == 0 {
                    self.rng_active = false;
                    let mut byte = self.range_result & 0x0F;
                    if self.ranging_error {
                        byte |= 0x20;
                    }
                    self.regs.insert(addr, vec![byte]);
                    buf[0] = byte;
                } else {
                    buf[0] = 0x10 | self.rng_value;
                }
            }
            _ => {
                let stored = self.regs.get(&addr);
                for (i, byte) in buf.iter_mut().enumerate() {
                    *byte = stored.and_then(|v| v.get(i)).copied().unwrap_or(0);
                }
            }
        }
    }
}

/// Cloneable handle implementing `SpiDevice`, so tests keep a view into
/// the chip while the radio owns its copy.
#[derive(Clone)]
pub struct SharedChip(pub Rc<RefCell<MockChip>>);

impl SharedChip {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(MockChip::new())))
    }

    pub fn chip(&self) -> std::cell::RefMut<'_, MockChip> {
        self.0.borrow_mut()
    }
}

impl ErrorType for SharedChip {
    type Error = MockError;
}

impl SpiDevice for SharedChip {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut chip = self.0.borrow_mut();
        if chip.fail_all {
            return Err(MockError);
        }
        chip.exchanges += 1;

        let (addr, is_write) = match operations.first() {
            Some(Operation::Write(header)) if header.len() == 2 => (
                ((header[0] & 0x0F) as u16) << 8 | header[1] as u16,
                header[0] & 0x80 != 0,
            ),
            _ => panic!("exchange did not start with an address header"),
        };

        if is_write {
            let mut data = Vec::new();
            for op in operations[1..].iter() {
                if let Operation::Write(bytes) = op {
                    data.extend_from_slice(bytes);
                }
            }
            chip.handle_write(addr, data);
        } else {
            for op in operations[1..].iter_mut() {
                if let Operation::Read(buf) = op {
                    chip.handle_read(addr, buf);
                }
            }
        }
        Ok(())
    }
}

/// A recording TCXO enable pin.
#[derive(Clone, Default)]
pub struct MockPin(pub Rc<RefCell<Vec<bool>>>);

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> Option<bool> {
        self.0.borrow().last().copied()
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().push(true);
        Ok(())
    }
}
