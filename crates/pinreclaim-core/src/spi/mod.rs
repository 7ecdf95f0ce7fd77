//! SPI types and command structures
//!
//! This module provides types for representing SPI transactions, the
//! flash controller's wiring mode, and the JEDEC opcodes this crate uses.

mod address;
mod command;
mod flash_mode;
pub mod opcodes;

pub use address::AddressWidth;
pub use command::SpiCommand;
pub use flash_mode::FlashMode;
pub use opcodes::*;
