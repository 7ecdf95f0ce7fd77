//! pinreclaim-dummy - In-memory flash and pin emulator for testing
//!
//! [`EmulatedFlash`] answers the status register commands the reclaim
//! engine sends, with the write-acceptance quirks of real parts: chips that
//! only take the legacy 16-bit write, chips that only take 8-bit writes,
//! XMC parts that clear SR3 on an SR2 write, bit-6 vendors without SR2, and
//! so on. [`EmulatedPin`] models GPIO9 and GPIO10; the flash watches those
//! pins and honours `/WP` and `/HOLD` until the enable bit is set.
//!
//! Chips are described by [`ChipProfile`]. A catalogue of the known
//! variants is built in; with `std` more can be loaded from RON files.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod catalogue;
mod flash;
mod pin;
mod profile;

#[cfg(test)]
mod scenarios;

pub use catalogue::*;
pub use flash::*;
pub use pin::*;
pub use profile::*;
