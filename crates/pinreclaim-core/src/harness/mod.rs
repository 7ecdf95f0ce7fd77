//! Electrical verification of a reclaim
//!
//! Register read-backs only show what the chip stores. These tests check
//! what the chip does with the pins:
//!
//! - [`short_circuit_test`]: the pad follows the driven level
//! - [`wp_output_test`]: a status write with `/WP` LOW still succeeds
//! - [`hold_output_test`]: the bus keeps working with `/HOLD` LOW
//! - [`input_test`]: both pins read as inputs without disturbing the bus
//!
//! A chip that honours `/HOLD` stalls the bus, and on the target a stalled
//! instruction fetch ends in a watchdog reset. The hold test therefore calls
//! a marker before and after the risky step so an external harness can
//! correlate results across reboots.

mod output;
mod pin;

pub use output::*;
pub use pin::*;

use core::fmt;

use crate::bus::SpiMaster;
use crate::error::Result;
use crate::gpio::{FlashPin, FlashPins, PinRole};
use crate::protocol::{Persistence, WriteWidth};
use crate::quad::QeBit;

/// Grace period with `/HOLD` LOW before the bus read
pub const DEFAULT_HOLD_GRACE_US: u32 = 100_000;

/// Harness settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessConfig {
    /// How long `/HOLD` is held LOW before the bus read
    pub hold_grace_us: u32,
    /// Persistence of the BP0 toggle writes
    pub persistence: Persistence,
    /// Width of the BP0 toggle writes
    pub width: WriteWidth,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            hold_grace_us: DEFAULT_HOLD_GRACE_US,
            persistence: Persistence::Volatile,
            width: WriteWidth::Bits8,
        }
    }
}

impl HarnessConfig {
    /// Set the hold grace period
    pub fn with_hold_grace_us(mut self, us: u32) -> Self {
        self.hold_grace_us = us;
        self
    }

    /// Set the write persistence
    pub fn with_persistence(mut self, persistence: Persistence) -> Self {
        self.persistence = persistence;
        self
    }

    /// Set the write width
    pub fn with_width(mut self, width: WriteWidth) -> Self {
        self.width = width;
        self
    }
}

/// Results of a full harness run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessReport {
    /// Register layout the tests used
    pub layout: QeBit,
    /// Short test on GPIO10
    pub wp_short: PinTestResult,
    /// Short test on GPIO9
    pub hold_short: PinTestResult,
    /// `/WP` output test
    pub wp_output: OutputTestResult,
    /// `/HOLD` output test
    pub hold_output: HoldTestResult,
    /// Input read-back
    pub input: InputTestResult,
}

impl HarnessReport {
    /// True when every test passed
    pub fn passed(&self) -> bool {
        self.wp_short.passed()
            && self.hold_short.passed()
            && self.wp_output.verdict() == OutputVerdict::Pass
            && self.hold_output.verdict() == HoldVerdict::Pass
            && self.input.passed()
    }
}

impl fmt::Display for HarnessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "layout:      {}", self.layout)?;
        writeln!(f, "short:       {}", self.wp_short)?;
        writeln!(f, "short:       {}", self.hold_short)?;
        writeln!(f, "/WP output:  {}", self.wp_output)?;
        writeln!(f, "/HOLD:       {}", self.hold_output)?;
        write!(f, "input:       {}", self.input)
    }
}

/// Run every test in order: short tests, `/WP`, `/HOLD`, inputs
///
/// The short tests run first because the others are meaningless on a
/// shorted pin. Pins end as inputs.
pub fn run<M, W, H>(
    master: &mut M,
    pins: &mut FlashPins<W, H>,
    layout: QeBit,
    config: &HarnessConfig,
    marker: &mut dyn FnMut(HoldStage),
) -> Result<HarnessReport>
where
    M: SpiMaster + ?Sized,
    W: FlashPin,
    H: FlashPin,
{
    let wp_short = short_circuit_test(&mut pins.wp, PinRole::WriteProtect);
    let hold_short = short_circuit_test(&mut pins.hold, PinRole::Hold);
    if !wp_short.passed() || !hold_short.passed() {
        log::warn!("pin short detected, output tests may be unreliable");
    }

    let wp_output = wp_output_test(master, &mut pins.wp, layout, config.persistence, config.width)?;
    let hold_output = hold_output_test(master, &mut pins.hold, layout, config.hold_grace_us, marker)?;
    let input = input_test(master, &mut pins.wp, &mut pins.hold, layout)?;

    Ok(HarnessReport {
        layout,
        wp_short,
        hold_short,
        wp_output,
        hold_output,
        input,
    })
}
