//! Error types for pinreclaim-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

use crate::protocol::StatusBits;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // SPI errors
    /// SPI transfer failed
    SpiTransferFailed,
    /// SPI transaction did not complete (bus suspended or unresponsive)
    SpiTimeout,
    /// Opcode is not supported by the bus controller
    OpcodeNotSupported,

    // Status register errors
    /// A 16-bit status write was requested for a register other than SR1
    InvalidWriteWidth,
    /// A status register write did not take visible effect
    VerifyFailed,
    /// A computed write target would set SRP1:SRP0 = 1:1
    LockPatternRefused,
    /// SRP1:SRP0 = 1:1 was read back from the chip
    LockPatternObserved,
    /// The chip's register layout is unknown, so there are no protect bits
    /// to drive
    NoWriteProtectBits,
    /// Protection bits refused to clear (strict residual policy)
    ResidualProtection(StatusBits),

    // Bus configuration errors
    /// The flash bus is wired for QIO/QOUT, so IO2/IO3 are in use
    UnsupportedBusMode,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpiTransferFailed => write!(f, "SPI transfer failed"),
            Self::SpiTimeout => write!(f, "SPI transaction did not complete"),
            Self::OpcodeNotSupported => write!(f, "SPI opcode not supported by bus controller"),
            Self::InvalidWriteWidth => {
                write!(f, "16-bit status writes are only valid for status register 1")
            }
            Self::VerifyFailed => write!(f, "status register write did not take effect"),
            Self::LockPatternRefused => {
                write!(f, "refusing to write SRP1:SRP0 = 1:1 (permanent lock)")
            }
            Self::LockPatternObserved => {
                write!(f, "status register reads back SRP1:SRP0 = 1:1 (locked)")
            }
            Self::NoWriteProtectBits => write!(f, "no known write-protect bits for this chip"),
            Self::ResidualProtection(bits) => {
                write!(f, "protection bits refused to change: 0x{:06X}", bits.bits())
            }
            Self::UnsupportedBusMode => {
                write!(f, "flash bus is in a quad mode, IO2/IO3 are not available")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
