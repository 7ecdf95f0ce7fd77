//! Status register access layer
//!
//! Every function here is a thin command sequence over [`SpiMaster`]. Nothing
//! is cached: each call goes to the chip.

use crate::bus::SpiMaster;
use crate::chip::ChipId;
use crate::error::{Error, Result};
use crate::spi::{opcodes, SpiCommand};

use super::{StatusBits, StatusRegisterSet};

/// Delay between BUSY polls after a status write
pub const BUSY_POLL_US: u32 = 1_000;

/// One of the three status registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusRegister {
    /// SR1: BUSY, WEL, block protect, SRP0
    Status1,
    /// SR2: SRP1, QE
    Status2,
    /// SR3: vendor settings
    Status3,
}

impl StatusRegister {
    /// Opcode to read this register
    pub const fn read_opcode(self) -> u8 {
        match self {
            Self::Status1 => opcodes::RDSR,
            Self::Status2 => opcodes::RDSR2,
            Self::Status3 => opcodes::RDSR3,
        }
    }

    /// Opcode to write this register on its own
    pub const fn write_opcode(self) -> u8 {
        match self {
            Self::Status1 => opcodes::WRSR,
            Self::Status2 => opcodes::WRSR2,
            Self::Status3 => opcodes::WRSR3,
        }
    }

    /// Bit position of this register in [`StatusBits`]
    pub const fn shift(self) -> u32 {
        match self {
            Self::Status1 => 0,
            Self::Status2 => 8,
            Self::Status3 => 16,
        }
    }

    /// Short name for logs
    pub const fn name(self) -> &'static str {
        match self {
            Self::Status1 => "SR1",
            Self::Status2 => "SR2",
            Self::Status3 => "SR3",
        }
    }
}

impl core::fmt::Display for StatusRegister {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// How a status write is enabled, and therefore whether it survives a power
/// cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Persistence {
    /// Enabled with 0x50, lost on power cycle
    #[default]
    Volatile,
    /// Enabled with WREN (0x06), kept across power cycles
    NonVolatile,
}

impl Persistence {
    /// The write-enable opcode for this persistence
    pub const fn enable_opcode(self) -> u8 {
        match self {
            Self::Volatile => opcodes::EWSR,
            Self::NonVolatile => opcodes::WREN,
        }
    }

    /// Short name for logs
    pub const fn name(self) -> &'static str {
        match self {
            Self::Volatile => "volatile",
            Self::NonVolatile => "non-volatile",
        }
    }
}

impl core::fmt::Display for Persistence {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Width of a status write transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WriteWidth {
    /// One register, one data byte
    #[default]
    Bits8,
    /// SR1 and SR2 in a single WRSR with two data bytes
    Bits16,
}

impl WriteWidth {
    /// Short name for logs
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bits8 => "8-bit",
            Self::Bits16 => "16-bit",
        }
    }
}

/// Read one status register
pub fn read_status<M: SpiMaster + ?Sized>(master: &mut M, reg: StatusRegister) -> Result<u8> {
    let mut buf = [0u8; 1];
    let mut cmd = SpiCommand::read_reg(reg.read_opcode(), &mut buf);
    master.execute(&mut cmd)?;
    Ok(buf[0])
}

/// Read SR1 and SR2 as a combined bit view
pub fn read_status12<M: SpiMaster + ?Sized>(master: &mut M) -> Result<StatusBits> {
    let sr1 = read_status(master, StatusRegister::Status1)?;
    let sr2 = read_status(master, StatusRegister::Status2)?;
    Ok(StatusBits::from_registers(sr1, sr2, 0))
}

/// Read all three status registers
pub fn read_status_set<M: SpiMaster + ?Sized>(master: &mut M) -> Result<StatusRegisterSet> {
    Ok(StatusRegisterSet {
        sr1: read_status(master, StatusRegister::Status1)?,
        sr2: read_status(master, StatusRegister::Status2)?,
        sr3: read_status(master, StatusRegister::Status3)?,
    })
}

/// Send the write-enable opcode matching `persistence`
pub fn write_enable<M: SpiMaster + ?Sized>(master: &mut M, persistence: Persistence) -> Result<()> {
    let mut cmd = SpiCommand::simple(persistence.enable_opcode());
    master.execute(&mut cmd)
}

/// Send the Write Disable command
///
/// Clears WEL. Safe to issue at any time.
pub fn write_disable<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::WRDI);
    master.execute(&mut cmd)
}

/// True when SR1 reports the write enable latch set
pub fn is_write_latch_set<M: SpiMaster + ?Sized>(master: &mut M) -> Result<bool> {
    let sr1 = read_status(master, StatusRegister::Status1)?;
    Ok(sr1 & opcodes::SR1_WEL != 0)
}

/// True when SR1 reports a write in progress
pub fn is_busy<M: SpiMaster + ?Sized>(master: &mut M) -> Result<bool> {
    let sr1 = read_status(master, StatusRegister::Status1)?;
    Ok(sr1 & opcodes::SR1_WIP != 0)
}

/// Poll BUSY until it clears
///
/// There is no timeout. A chip that never clears BUSY blocks the caller;
/// nothing else can use the flash in that state anyway.
pub fn wait_ready<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    while is_busy(master)? {
        master.delay_us(BUSY_POLL_US);
    }
    Ok(())
}

/// Write a status register
///
/// Enables the write according to `persistence`, sends the value, waits for
/// BUSY to clear and then always sends WRDI, whether or not the chip took
/// the value. A chip that silently ignores the write is not an error here;
/// callers find out by reading the register back.
///
/// With [`WriteWidth::Bits8`] only the low byte of `value` is sent. With
/// [`WriteWidth::Bits16`] the low byte goes to SR1 and the high byte to SR2;
/// that form only exists for [`StatusRegister::Status1`].
pub fn write_status<M: SpiMaster + ?Sized>(
    master: &mut M,
    reg: StatusRegister,
    value: u16,
    persistence: Persistence,
    width: WriteWidth,
) -> Result<()> {
    if width == WriteWidth::Bits16 {
        if reg != StatusRegister::Status1 {
            return Err(Error::InvalidWriteWidth);
        }
        if StatusBits::from_bits_retain(value as u32).has_lock_pattern() {
            return Err(Error::LockPatternRefused);
        }
    }

    log::debug!(
        "write {} = 0x{:04X} ({}, {})",
        reg,
        value,
        width.name(),
        persistence
    );

    let written = write_status_inner(master, reg, value, persistence, width);
    let disabled = write_disable(master);
    written.and(disabled)
}

fn write_status_inner<M: SpiMaster + ?Sized>(
    master: &mut M,
    reg: StatusRegister,
    value: u16,
    persistence: Persistence,
    width: WriteWidth,
) -> Result<()> {
    write_enable(master, persistence)?;
    let data = value.to_le_bytes();
    let data = match width {
        WriteWidth::Bits8 => &data[..1],
        WriteWidth::Bits16 => &data[..],
    };
    let mut cmd = SpiCommand::write_reg(reg.write_opcode(), data);
    master.execute(&mut cmd)?;
    wait_ready(master)
}

/// Read the JEDEC identifier (RDID)
pub fn read_chip_id<M: SpiMaster + ?Sized>(master: &mut M) -> Result<ChipId> {
    let mut buf = [0u8; 3];
    let mut cmd = SpiCommand::read_reg(opcodes::RDID, &mut buf);
    master.execute(&mut cmd)?;
    Ok(ChipId::from_jedec_bytes(buf))
}
