//! Flash bus abstraction
//!
//! This module defines the trait the reclaim engine uses to talk to the
//! flash chip through the microcontroller's SPI flash controller.

mod traits;

pub use traits::*;
