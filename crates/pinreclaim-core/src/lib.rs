//! pinreclaim-core - Free the SPI flash /WP and /HOLD pins for GPIO use
//!
//! A microcontroller that boots from an SPI NOR flash in DIO or DOUT mode
//! still has the flash's `/WP` and `/HOLD` pins wired to two GPIOs. Setting
//! the flash's Quad Enable (QE) bit disables those pin functions so the
//! GPIOs can be repurposed. Vendors disagree on where the QE bit lives and
//! how it may be written, so this crate identifies the chip, applies a
//! vendor strategy with verification and a single fallback, and only then
//! hands the pins over.
//!
//! The crate is `no_std` and never allocates.
//!
//! # Features
//!
//! - `std` - `std::error::Error` for [`Error`]
//! - `early-reclaim` - keep [`boot::RECLAIM_RESULT`] in a `.noinit` section
//! - `debug-output` - step-by-step narration through `log`
//! - `iram` - place the interrupt-masked short-circuit test in IRAM
//! - `vendor-*` - compile individual vendor strategies in or out
//!
//! # Example
//!
//! ```ignore
//! use pinreclaim_core::gpio::FlashPins;
//! use pinreclaim_core::reclaim::{ReclaimConfig, Reclaimer};
//!
//! let pins = FlashPins::new(gpio10, gpio9);
//! let mut reclaimer = Reclaimer::new(spi0, pins, ReclaimConfig::default());
//! if reclaimer.reclaim() {
//!     // GPIO9 and GPIO10 are now plain inputs
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(feature = "std", test))]
extern crate std;

#[macro_use]
mod macros;

pub mod boot;
pub mod bus;
pub mod chip;
pub mod error;
pub mod gpio;
pub mod harness;
pub mod irq;
pub mod protocol;
pub mod quad;
pub mod reclaim;
pub mod sfdp;
pub mod spi;
pub mod wp;

pub use error::{Error, Result};
