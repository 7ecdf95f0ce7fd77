//! Quad Enable negotiation
//!
//! Setting the Quad Enable bit turns the flash's `/WP` and `/HOLD` pins into
//! IO2 and IO3, which the chip then ignores while the bus is in DIO or DOUT
//! mode. Where the bit lives, how wide the write must be and which
//! side effects the write has differ per vendor:
//!
//! - [`strategy`] holds one [`QuadEnableStrategy`] per known behaviour
//! - [`table`] maps a chip identifier to a strategy
//! - [`engine`] runs a strategy: snapshot, write, verify, restore

pub mod engine;
pub mod strategy;
pub mod table;

pub use engine::*;
pub use strategy::*;
pub use table::*;
