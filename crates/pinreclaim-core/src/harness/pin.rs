//! Pin-level tests

use core::fmt;

use crate::bus::SpiMaster;
use crate::error::Result;
use crate::gpio::{FlashPin, Level, PinMode, PinRole};
use crate::irq::masked;
use crate::protocol::{self, StatusRegister};
use crate::quad::{read_quad_enable, QeBit};

/// Outcome of a short-circuit test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinTestResult {
    /// Pin that was tested
    pub role: PinRole,
    /// Pad read HIGH while driven HIGH
    pub high: bool,
    /// Pad read LOW while driven LOW
    pub low: bool,
}

impl PinTestResult {
    /// True when the pad followed both levels
    pub fn passed(&self) -> bool {
        self.high && self.low
    }
}

impl fmt::Display for PinTestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.passed() { "ok" } else { "SHORTED" };
        write!(
            f,
            "{} {} (HIGH {}, LOW {})",
            self.role,
            verdict,
            if self.high { "ok" } else { "stuck" },
            if self.low { "ok" } else { "stuck" }
        )
    }
}

/// Drive the pin HIGH then LOW and check the pad follows
///
/// Runs with interrupts masked: while the pin is an output the flash may be
/// mid-transaction, and an instruction fetch racing with the pin change can
/// corrupt it. The pin's prior mode is restored before interrupts are
/// unmasked.
///
/// With the `iram` feature this function body lives in instruction RAM.
/// The attribute does not follow calls: the [`FlashPin`] methods and the
/// platform's `critical-section` acquire and release are placed wherever
/// their own crates put them. On targets where that is flash, the platform
/// must mark those in RAM as well, or inline them here.
#[inline(never)]
#[cfg_attr(feature = "iram", link_section = ".iram1.text.pinreclaim_short")]
pub fn short_circuit_test<P: FlashPin + ?Sized>(pin: &mut P, role: PinRole) -> PinTestResult {
    let prior = pin.mode();
    let (high, low) = masked(|| {
        pin.set_level(Level::High);
        pin.set_mode(PinMode::Output);
        let high = pin.level() == Level::High;
        pin.set_level(Level::Low);
        let low = pin.level() == Level::Low;
        pin.set_level(Level::High);
        pin.set_mode(prior);
        (high, low)
    });

    let result = PinTestResult { role, high, low };
    diag!("  Short test: {}", result);
    result
}

/// Outcome of the input read-back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputTestResult {
    /// Enable bit as read before switching the pins
    pub qe: bool,
    /// GPIO10 level
    pub wp_level: Level,
    /// GPIO9 level
    pub hold_level: Level,
    /// A status read succeeded with both pins as inputs
    pub bus_ok: bool,
}

impl InputTestResult {
    /// True when QE is set, `/HOLD` reads LOW and the bus still works
    ///
    /// A LOW `/HOLD` with QE clear that does not stall the bus means the
    /// part has no hold function at all, which says nothing about QE.
    pub fn passed(&self) -> bool {
        self.qe && self.hold_level == Level::Low && self.bus_ok
    }
}

impl fmt::Display for InputTestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QE={} GPIO9={} GPIO10={} bus {}",
            self.qe as u8,
            self.hold_level,
            self.wp_level,
            if self.bus_ok { "ok" } else { "stalled" }
        )
    }
}

/// Switch both pins to inputs, read them, then touch the bus once
pub fn input_test<M, W, H>(
    master: &mut M,
    wp_pin: &mut W,
    hold_pin: &mut H,
    layout: QeBit,
) -> Result<InputTestResult>
where
    M: SpiMaster + ?Sized,
    W: FlashPin + ?Sized,
    H: FlashPin + ?Sized,
{
    protocol::write_disable(master)?;
    let qe = read_quad_enable(master, layout)?;

    hold_pin.set_mode(PinMode::Input);
    wp_pin.set_mode(PinMode::Input);
    let hold_level = hold_pin.level();
    let wp_level = wp_pin.level();

    let bus_ok = protocol::read_status(master, StatusRegister::Status1).is_ok();

    let result = InputTestResult {
        qe,
        wp_level,
        hold_level,
        bus_ok,
    };
    diag!("  Input test: {}", result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pad stuck at a level regardless of the output latch
    struct MockPin {
        mode: PinMode,
        latch: Level,
        stuck: Option<Level>,
    }

    impl FlashPin for MockPin {
        fn set_mode(&mut self, mode: PinMode) {
            self.mode = mode;
        }

        fn mode(&self) -> PinMode {
            self.mode
        }

        fn set_level(&mut self, level: Level) {
            self.latch = level;
        }

        fn level(&self) -> Level {
            self.stuck.unwrap_or(self.latch)
        }
    }

    #[test]
    fn test_short_circuit_clean_pin() {
        let mut pin = MockPin {
            mode: PinMode::Function,
            latch: Level::Low,
            stuck: None,
        };
        let result = short_circuit_test(&mut pin, PinRole::WriteProtect);
        assert!(result.passed());
        assert_eq!(pin.mode, PinMode::Function);
    }

    #[test]
    fn test_short_circuit_stuck_low() {
        let mut pin = MockPin {
            mode: PinMode::Input,
            latch: Level::Low,
            stuck: Some(Level::Low),
        };
        let result = short_circuit_test(&mut pin, PinRole::Hold);
        assert!(!result.high);
        assert!(result.low);
        assert!(!result.passed());
        assert_eq!(pin.mode, PinMode::Input);
    }

    #[test]
    fn test_short_circuit_unmasks_on_return() {
        let mut pin = MockPin {
            mode: PinMode::Function,
            latch: Level::High,
            stuck: None,
        };
        short_circuit_test(&mut pin, PinRole::Hold);
        // Another thread can only enter once the section was released
        let entered = std::thread::spawn(|| critical_section::with(|_| true))
            .join()
            .unwrap();
        assert!(entered);
    }
}
