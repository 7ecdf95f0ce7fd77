//! `/WP` and `/HOLD` output tests

use core::fmt;

use crate::bus::SpiMaster;
use crate::error::{Error, Result};
use crate::gpio::{FlashPin, Level, PinMode};
use crate::protocol::{self, Persistence, StatusBits, StatusRegister, WriteWidth};
use crate::quad::{read_quad_enable, QeBit};

/// What the `/WP` test concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputVerdict {
    /// Writes succeed with `/WP` HIGH and LOW: the pin is free
    Pass,
    /// Writes succeed only with `/WP` HIGH: the chip still honours `/WP`
    Discrepancy,
    /// The write failed even with `/WP` HIGH, so the LOW result means nothing
    Inconclusive,
}

/// Outcome of the `/WP` output test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputTestResult {
    /// Layout the test ran against
    pub qe_bit: QeBit,
    /// Enable bit before the test
    pub qe: bool,
    /// SRP0 before the test
    pub srp0: bool,
    /// SRP1 before the test (always false on the SR1 layout)
    pub srp1: bool,
    /// BP0 toggled with `/WP` driven HIGH
    pub high: bool,
    /// BP0 toggled with `/WP` driven LOW
    pub low: bool,
}

impl OutputTestResult {
    /// Classify the HIGH/LOW pair
    pub fn verdict(&self) -> OutputVerdict {
        match (self.high, self.low) {
            (true, true) => OutputVerdict::Pass,
            (true, false) => OutputVerdict::Discrepancy,
            (false, _) => OutputVerdict::Inconclusive,
        }
    }
}

impl fmt::Display for OutputTestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.qe_bit, self.qe as u8)?;
        if self.qe_bit == QeBit::Sr2Bit1 {
            write!(f, " SRP1:SRP0={}:{}", self.srp1 as u8, self.srp0 as u8)?;
        }
        write!(
            f,
            " write with /WP HIGH {}, LOW {} -> {:?}",
            if self.high { "ok" } else { "failed" },
            if self.low { "ok" } else { "failed" },
            self.verdict()
        )
    }
}

/// Check whether the chip still honours `/WP`
///
/// Drives GPIO10 HIGH and toggles BP0, which any unprotected chip accepts,
/// then drives it LOW and toggles BP0 again. The second write only succeeds
/// when the protect function is disabled. BP0 is cleared again after each
/// toggle. The pin goes back to the flash function at the end.
pub fn wp_output_test<M, P>(
    master: &mut M,
    wp_pin: &mut P,
    layout: QeBit,
    persistence: Persistence,
    width: WriteWidth,
) -> Result<OutputTestResult>
where
    M: SpiMaster + ?Sized,
    P: FlashPin + ?Sized,
{
    wp_pin.set_level(Level::High);
    wp_pin.set_mode(PinMode::Output);
    let result = wp_output_inner(master, wp_pin, layout, persistence, width);
    wp_pin.set_mode(PinMode::Function);

    let result = result?;
    diag!("  /WP test: {}", result);
    Ok(result)
}

fn wp_output_inner<M, P>(
    master: &mut M,
    wp_pin: &mut P,
    layout: QeBit,
    persistence: Persistence,
    width: WriteWidth,
) -> Result<OutputTestResult>
where
    M: SpiMaster + ?Sized,
    P: FlashPin + ?Sized,
{
    protocol::write_disable(master)?;
    let qe = read_quad_enable(master, layout)?;
    let bits = protocol::read_status12(master)?;
    let srp1 = layout == QeBit::Sr2Bit1 && bits.contains(StatusBits::SRP1);

    let high = toggle_bp0(master, layout, persistence, width)?;
    wp_pin.set_level(Level::Low);
    let low = toggle_bp0(master, layout, persistence, width)?;
    wp_pin.set_level(Level::High);

    Ok(OutputTestResult {
        qe_bit: layout,
        qe,
        srp0: bits.contains(StatusBits::SRP0),
        srp1,
        high,
        low,
    })
}

/// Set BP0, check it stuck, clear it again
///
/// Only the enable bit, SRP0 and BP0 are carried in the written value.
fn toggle_bp0<M: SpiMaster + ?Sized>(
    master: &mut M,
    layout: QeBit,
    persistence: Persistence,
    width: WriteWidth,
) -> Result<bool> {
    protocol::write_disable(master)?;
    let current = protocol::read_status12(master)?;

    let keep = match layout {
        QeBit::Sr2Bit1 => StatusBits::SRP0 | StatusBits::QE,
        QeBit::Sr1Bit6 => StatusBits::S6,
    };
    let width = match layout {
        QeBit::Sr2Bit1 => width,
        QeBit::Sr1Bit6 => WriteWidth::Bits8,
    };
    let with_bp0 = (current & keep) | StatusBits::BP0;
    // An 8-bit SR1 write leaves SR2 as it is
    let predicted = match width {
        WriteWidth::Bits16 => with_bp0,
        WriteWidth::Bits8 => (current - StatusBits::SR1) | (with_bp0 & StatusBits::SR1),
    };
    if layout.is_locked(predicted) {
        return Err(Error::LockPatternRefused);
    }

    write_sr1(master, with_bp0, persistence, width)?;
    let stuck = protocol::read_status(master, StatusRegister::Status1)? & StatusBits::BP0.sr1() != 0;
    write_sr1(master, with_bp0 - StatusBits::BP0, persistence, width)?;
    Ok(stuck)
}

fn write_sr1<M: SpiMaster + ?Sized>(
    master: &mut M,
    bits: StatusBits,
    persistence: Persistence,
    width: WriteWidth,
) -> Result<()> {
    let value = match width {
        WriteWidth::Bits16 => bits.sr12(),
        WriteWidth::Bits8 => bits.sr1() as u16,
    };
    protocol::write_status(master, StatusRegister::Status1, value, persistence, width)
}

/// Where the hold test is when it calls the marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldStage {
    /// About to drive `/HOLD` LOW; a reboot after this is a failure
    Armed,
    /// The bus read with `/HOLD` LOW completed
    Survived,
}

/// What the `/HOLD` test concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldVerdict {
    /// QE set and the bus survived
    Pass,
    /// QE clear but the bus survived; the part may have no hold function
    NoHoldFunction,
    /// The bus read failed with `/HOLD` LOW
    Fail,
}

/// Outcome of the `/HOLD` output test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldTestResult {
    /// Enable bit before the test
    pub qe: bool,
    /// The bus read completed with `/HOLD` LOW
    pub survived: bool,
}

impl HoldTestResult {
    /// Classify the result
    pub fn verdict(&self) -> HoldVerdict {
        match (self.survived, self.qe) {
            (false, _) => HoldVerdict::Fail,
            (true, true) => HoldVerdict::Pass,
            (true, false) => HoldVerdict::NoHoldFunction,
        }
    }
}

impl fmt::Display for HoldTestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QE={} bus {} with /HOLD LOW -> {:?}",
            self.qe as u8,
            if self.survived { "ok" } else { "suspended" },
            self.verdict()
        )
    }
}

/// Drive `/HOLD` LOW, wait, then use the bus once
///
/// On the target a chip that honours `/HOLD` never answers and the code
/// running from flash stalls until the watchdog fires, so reaching the end
/// is itself the pass signal. `marker` sees [`HoldStage::Armed`] before the
/// pin changes and [`HoldStage::Survived`] after the read succeeds. The pin
/// goes back to the flash function before returning.
pub fn hold_output_test<M, P>(
    master: &mut M,
    hold_pin: &mut P,
    layout: QeBit,
    grace_us: u32,
    marker: &mut dyn FnMut(HoldStage),
) -> Result<HoldTestResult>
where
    M: SpiMaster + ?Sized,
    P: FlashPin + ?Sized,
{
    protocol::write_disable(master)?;
    let qe = read_quad_enable(master, layout)?;

    marker(HoldStage::Armed);
    hold_pin.set_level(Level::Low);
    hold_pin.set_mode(PinMode::Output);
    master.delay_us(grace_us);
    let read = protocol::read_status(master, StatusRegister::Status1);
    hold_pin.set_level(Level::High);
    hold_pin.set_mode(PinMode::Function);

    let survived = match read {
        Ok(_) => {
            marker(HoldStage::Survived);
            true
        }
        Err(e) => {
            log::warn!("bus read with /HOLD LOW failed: {}", e);
            false
        }
    };

    let result = HoldTestResult { qe, survived };
    diag!("  /HOLD test: {}", result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(high: bool, low: bool) -> OutputTestResult {
        OutputTestResult {
            qe_bit: QeBit::Sr2Bit1,
            qe: true,
            srp0: false,
            srp1: false,
            high,
            low,
        }
    }

    #[test]
    fn test_output_verdicts() {
        assert_eq!(result(true, true).verdict(), OutputVerdict::Pass);
        assert_eq!(result(true, false).verdict(), OutputVerdict::Discrepancy);
        assert_eq!(result(false, true).verdict(), OutputVerdict::Inconclusive);
        assert_eq!(result(false, false).verdict(), OutputVerdict::Inconclusive);
    }

    #[test]
    fn test_hold_verdicts() {
        let pass = HoldTestResult {
            qe: true,
            survived: true,
        };
        let no_hold = HoldTestResult {
            qe: false,
            survived: true,
        };
        let fail = HoldTestResult {
            qe: true,
            survived: false,
        };
        assert_eq!(pass.verdict(), HoldVerdict::Pass);
        assert_eq!(no_hold.verdict(), HoldVerdict::NoHoldFunction);
        assert_eq!(fail.verdict(), HoldVerdict::Fail);
    }
}
