//! Bits that refused to change

use core::fmt;

use crate::error::{Error, Result};
use crate::protocol::StatusBits;

/// Status bits that did not take their expected value
///
/// BUSY and WEL are never part of a residual. Whether a non-empty residual
/// is a failure is the caller's call; [`into_result`](Self::into_result)
/// applies the strict policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Residual(StatusBits);

impl Residual {
    /// Wrap a residual mask
    pub fn new(bits: StatusBits) -> Self {
        Self(bits.without_transient())
    }

    /// True when every bit took its expected value
    pub fn is_clean(&self) -> bool {
        self.0.is_empty()
    }

    /// The offending bits
    pub fn bits(&self) -> StatusBits {
        self.0
    }

    /// Strict policy: any residual is an error
    pub fn into_result(self) -> Result<()> {
        if self.is_clean() {
            Ok(())
        } else {
            Err(Error::ResidualProtection(self.0))
        }
    }
}

impl fmt::Display for Residual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            f.write_str("clean")
        } else {
            write!(f, "0x{:04X}", self.0.sr12())
        }
    }
}
