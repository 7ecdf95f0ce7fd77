//! The two flash control pins as GPIOs
//!
//! On the target `/HOLD` is GPIO9 and `/WP` is GPIO10. While the pin mux
//! selects the flash function the pins belong to the SPI controller; after a
//! successful reclaim they are ordinary GPIOs.

use core::fmt;

/// Logic level on a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Driven or read low
    Low,
    /// Driven or read high
    High,
}

impl Level {
    /// True for [`Level::High`]
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "LOW",
            Self::High => "HIGH",
        })
    }
}

/// Pin mux setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinMode {
    /// GPIO input
    Input,
    /// GPIO push-pull output
    Output,
    /// Owned by the SPI flash controller (`/WP` or `/HOLD`)
    Function,
}

/// A pin that can be switched between the flash function and GPIO
pub trait FlashPin {
    /// Change the pin mux
    fn set_mode(&mut self, mode: PinMode);

    /// Current pin mux
    fn mode(&self) -> PinMode;

    /// Set the output latch; takes effect on the pad in [`PinMode::Output`]
    fn set_level(&mut self, level: Level);

    /// Read the pad
    fn level(&self) -> Level;
}

impl<P: FlashPin + ?Sized> FlashPin for &mut P {
    fn set_mode(&mut self, mode: PinMode) {
        (**self).set_mode(mode)
    }

    fn mode(&self) -> PinMode {
        (**self).mode()
    }

    fn set_level(&mut self, level: Level) {
        (**self).set_level(level)
    }

    fn level(&self) -> Level {
        (**self).level()
    }
}

/// Which flash signal a pin carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinRole {
    /// `/WP`, IO2 in quad mode
    WriteProtect,
    /// `/HOLD`, IO3 in quad mode
    Hold,
}

impl PinRole {
    /// GPIO number on the target
    pub const fn gpio(self) -> u8 {
        match self {
            Self::WriteProtect => 10,
            Self::Hold => 9,
        }
    }

    /// Flash signal name
    pub const fn signal(self) -> &'static str {
        match self {
            Self::WriteProtect => "/WP",
            Self::Hold => "/HOLD",
        }
    }
}

impl fmt::Display for PinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{} ({})", self.gpio(), self.signal())
    }
}

/// The `/WP` and `/HOLD` pins together
#[derive(Debug)]
pub struct FlashPins<W, H> {
    /// GPIO10, `/WP`
    pub wp: W,
    /// GPIO9, `/HOLD`
    pub hold: H,
}

impl<W: FlashPin, H: FlashPin> FlashPins<W, H> {
    /// Pair up the two pins
    pub fn new(wp: W, hold: H) -> Self {
        Self { wp, hold }
    }

    /// Put both pins in `mode`
    pub fn set_mode(&mut self, mode: PinMode) {
        self.wp.set_mode(mode);
        self.hold.set_mode(mode);
    }

    /// Modes of (`/WP`, `/HOLD`)
    pub fn modes(&self) -> (PinMode, PinMode) {
        (self.wp.mode(), self.hold.mode())
    }

    /// Split back into the individual pins
    pub fn into_inner(self) -> (W, H) {
        (self.wp, self.hold)
    }
}
