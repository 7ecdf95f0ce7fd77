//! Emulated GPIO9 and GPIO10

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use pinreclaim_core::gpio::{FlashPin, Level, PinMode};

#[derive(Debug)]
struct PinState {
    mode: PinMode,
    latch: Level,
    pull: Level,
    stuck: Option<Level>,
    modes_seen: Vec<PinMode>,
}

/// A pad shared between the GPIO side and the emulated flash
///
/// Clones refer to the same pad, so the flash can watch the line the
/// firmware drives.
#[derive(Debug, Clone)]
pub struct EmulatedPin {
    state: Rc<RefCell<PinState>>,
}

impl Default for EmulatedPin {
    fn default() -> Self {
        Self::new()
    }
}

impl EmulatedPin {
    /// Pad in flash function mode with a pull-up
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(PinState {
                mode: PinMode::Function,
                latch: Level::High,
                pull: Level::High,
                stuck: None,
                modes_seen: Vec::new(),
            })),
        }
    }

    /// Level the pad settles to as an input
    pub fn with_pull(self, pull: Level) -> Self {
        self.state.borrow_mut().pull = pull;
        self
    }

    /// Short the pad to a rail
    pub fn stuck_at(self, level: Level) -> Self {
        self.state.borrow_mut().stuck = Some(level);
        self
    }

    /// Level the flash sees on the line
    ///
    /// The flash controller holds its signals HIGH while the pin is in
    /// function mode.
    pub fn line_level(&self) -> Level {
        let state = self.state.borrow();
        if let Some(level) = state.stuck {
            return level;
        }
        match state.mode {
            PinMode::Output => state.latch,
            PinMode::Input => state.pull,
            PinMode::Function => Level::High,
        }
    }

    /// Every mode change, oldest first
    pub fn modes_seen(&self) -> Vec<PinMode> {
        self.state.borrow().modes_seen.clone()
    }
}

impl FlashPin for EmulatedPin {
    fn set_mode(&mut self, mode: PinMode) {
        let mut state = self.state.borrow_mut();
        state.mode = mode;
        state.modes_seen.push(mode);
    }

    fn mode(&self) -> PinMode {
        self.state.borrow().mode
    }

    fn set_level(&mut self, level: Level) {
        self.state.borrow_mut().latch = level;
    }

    fn level(&self) -> Level {
        self.line_level()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_pad() {
        let mut pin = EmulatedPin::new();
        let watcher = pin.clone();
        assert_eq!(watcher.line_level(), Level::High);

        pin.set_level(Level::Low);
        assert_eq!(watcher.line_level(), Level::High);
        pin.set_mode(PinMode::Output);
        assert_eq!(watcher.line_level(), Level::Low);
        assert_eq!(watcher.modes_seen(), [PinMode::Output]);
    }

    #[test]
    fn test_input_follows_pull() {
        let mut pin = EmulatedPin::new().with_pull(Level::Low);
        pin.set_mode(PinMode::Input);
        assert_eq!(pin.level(), Level::Low);
    }

    #[test]
    fn test_stuck_pad() {
        let mut pin = EmulatedPin::new().stuck_at(Level::Low);
        pin.set_mode(PinMode::Output);
        pin.set_level(Level::High);
        assert_eq!(pin.level(), Level::Low);
    }
}
