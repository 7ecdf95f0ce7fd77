//! Protocol implementations
//!
//! This module contains the status register access layer: the JEDEC
//! command sequences for reading, writing and write-disabling the flash
//! status registers, and the bit definitions shared by the rest of the
//! crate.

mod bits;
mod status;

pub use bits::*;
pub use status::*;
