//! Early-boot entry point
//!
//! On the target the reclaim runs before the runtime is up, from a hook the
//! startup code calls. The result is published in [`RECLAIM_RESULT`] for
//! the application to read later. With the `early-reclaim` feature the
//! cell lives in a `.noinit` section so the runtime's `.bss` clearing does
//! not wipe it.

use core::cell::Cell;

use critical_section::Mutex;

use crate::bus::SpiMaster;
use crate::gpio::{FlashPin, FlashPins};
use crate::reclaim::{ReclaimConfig, Reclaimer};

const AVAILABLE: u32 = 0x5049_4E31;
const UNAVAILABLE: u32 = 0x5049_4E30;

/// Outcome of the boot-time reclaim, shared between startup and application
///
/// Written once: the boot hook is the single writer and calls
/// [`publish`](Self::publish) exactly once, before the application starts.
/// Later calls in the same boot are refused and the first value stays. Everything after boot
/// only reads.
pub struct ReclaimResult(Mutex<Cell<u32>>);

impl ReclaimResult {
    /// Cell holding no result yet
    pub const fn new() -> Self {
        Self(Mutex::new(Cell::new(0)))
    }

    /// Record whether the pins were reclaimed
    ///
    /// Returns false, and leaves the cell alone, when a result was already
    /// published.
    pub fn publish(&self, available: bool) -> bool {
        let value = if available { AVAILABLE } else { UNAVAILABLE };
        critical_section::with(|cs| {
            let cell = self.0.borrow(cs);
            match cell.get() {
                AVAILABLE | UNAVAILABLE => false,
                _ => {
                    cell.set(value);
                    true
                }
            }
        })
    }

    /// Forget the result of a previous boot
    ///
    /// A `.noinit` cell keeps its value across a warm reset. The boot hook
    /// clears it before running the reclaim for this boot.
    fn clear(&self) {
        critical_section::with(|cs| self.0.borrow(cs).set(0));
    }

    /// The published result, or `None` if nothing was published
    ///
    /// An uninitialized `.noinit` cell holds neither marker and reads as
    /// `None`.
    pub fn get(&self) -> Option<bool> {
        match critical_section::with(|cs| self.0.borrow(cs).get()) {
            AVAILABLE => Some(true),
            UNAVAILABLE => Some(false),
            _ => None,
        }
    }

    /// True only when a reclaim published success
    pub fn pins_available(&self) -> bool {
        self.get() == Some(true)
    }
}

impl Default for ReclaimResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of [`reclaim_at_boot`]
#[cfg_attr(feature = "early-reclaim", link_section = ".noinit.pinreclaim")]
pub static RECLAIM_RESULT: ReclaimResult = ReclaimResult::new();

/// Run the reclaim once and publish the result in [`RECLAIM_RESULT`]
///
/// This is the one writer of [`RECLAIM_RESULT`] and must run once per boot,
/// before the application reads the result. Returns the published value.
pub fn reclaim_at_boot<M, W, H>(master: M, pins: FlashPins<W, H>, config: ReclaimConfig) -> bool
where
    M: SpiMaster,
    W: FlashPin,
    H: FlashPin,
{
    RECLAIM_RESULT.clear();
    let available = Reclaimer::new(master, pins, config).reclaim();
    RECLAIM_RESULT.publish(available);
    available
}
