//! GPIO reclaim orchestrator
//!
//! A short state machine, terminal on the first failure:
//!
//! ```text
//! Start -> DetectId -> CheckBusMode -> ClearStaleLatchIfSet -> VendorDispatch
//!       -> NegotiateEnableBit -> FinalizeWriteDisable -> HandoffPins -> Done
//! ```
//!
//! Every step re-reads the chip, so running the machine again after a
//! success or a failure is safe. A failed negotiation puts back any status
//! register that changed, and the pins are only touched on success.

mod config;
mod orchestrator;

pub use config::*;
pub use orchestrator::*;

use core::fmt;

use heapless::Vec;

use crate::chip::ChipId;
use crate::error::Error;
use crate::quad::{QeOutcome, VendorStrategy};
use crate::sfdp::SfdpRevInfo;

/// Steps of the reclaim state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclaimState {
    /// Nothing done yet
    Start,
    /// Reading the chip identifier
    DetectId,
    /// Checking that the bus leaves IO2/IO3 unused
    CheckBusMode,
    /// Clearing a write latch left by the boot ROM
    ClearStaleLatchIfSet,
    /// Choosing a vendor strategy
    VendorDispatch,
    /// Setting and verifying the enable bit
    NegotiateEnableBit,
    /// Final WRDI
    FinalizeWriteDisable,
    /// Switching GPIO9 and GPIO10 to inputs
    HandoffPins,
    /// Both pin functions are disabled
    Done,
    /// Terminal failure
    Failed(FailureReason),
}

/// Why a reclaim failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// A bus transaction failed
    Bus(Error),
    /// The identifier read as all zeros or all ones
    ChipNotFound,
    /// The flash bus is in QIO or QOUT, IO2/IO3 are in use
    UnsupportedBusMode,
    /// No strategy got the enable bit to read back set
    NegotiationFailed,
    /// The vendor hook returned false
    HookDeclined,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus error: {}", e),
            Self::ChipNotFound => write!(f, "no flash chip answered"),
            Self::UnsupportedBusMode => {
                write!(f, "GPIO9 and GPIO10 are not available in QIO or QOUT flash mode")
            }
            Self::NegotiationFailed => write!(f, "enable bit could not be set"),
            Self::HookDeclined => write!(f, "vendor hook reported failure"),
        }
    }
}

/// Capacity of [`ReclaimReport::trace`], enough for every state once
pub const TRACE_CAPACITY: usize = 10;

/// Everything a reclaim run found out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReclaimReport {
    /// Identifier, once read
    pub chip_id: Option<ChipId>,
    /// SFDP revision info, when enabled and present
    pub sfdp: Option<SfdpRevInfo>,
    /// Name of the matched vendor row, or "hook"
    pub vendor: Option<&'static str>,
    /// Strategy kind used; `None` when a hook handled the chip
    pub strategy: Option<VendorStrategy>,
    /// Negotiation outcome from the table path
    pub outcome: Option<QeOutcome>,
    /// A write latch was found set and cleared
    pub stale_latch_cleared: bool,
    /// Registers were written back after a failed negotiation
    pub rolled_back: bool,
    /// States visited, in order
    pub trace: Vec<ReclaimState, TRACE_CAPACITY>,
    /// Terminal state
    pub final_state: ReclaimState,
}

impl ReclaimReport {
    pub(crate) fn new() -> Self {
        let mut trace = Vec::new();
        let _ = trace.push(ReclaimState::Start);
        Self {
            chip_id: None,
            sfdp: None,
            vendor: None,
            strategy: None,
            outcome: None,
            stale_latch_cleared: false,
            rolled_back: false,
            trace,
            final_state: ReclaimState::Start,
        }
    }

    pub(crate) fn enter(&mut self, state: ReclaimState) {
        // The machine never visits more states than the trace holds
        let _ = self.trace.push(state);
        self.final_state = state;
    }

    /// True when the run ended in [`ReclaimState::Done`]
    pub fn succeeded(&self) -> bool {
        self.final_state == ReclaimState::Done
    }

    /// Failure reason, if the run failed
    pub fn failure(&self) -> Option<FailureReason> {
        match self.final_state {
            ReclaimState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for ReclaimReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(id) = self.chip_id {
            writeln!(f, "Flash Chip ID: {} ({})", id, id.vendor_name())?;
        }
        if let Some(sfdp) = &self.sfdp {
            writeln!(f, "{}", sfdp)?;
        }
        if self.stale_latch_cleared {
            writeln!(f, "WEL was left set by a previous write, cleared")?;
        }
        if let (Some(vendor), Some(strategy)) = (self.vendor, self.strategy) {
            writeln!(f, "Vendor: {} ({})", vendor, strategy)?;
        } else if let Some(vendor) = self.vendor {
            writeln!(f, "Vendor: {}", vendor)?;
        }
        if let Some(outcome) = &self.outcome {
            writeln!(
                f,
                "Status: SR1=0x{:02X} SR2=0x{:02X}",
                outcome.final_bits.sr1(),
                outcome.final_bits.sr2()
            )?;
        }
        if self.rolled_back {
            writeln!(f, "Status registers restored to their prior values")?;
        }
        match self.final_state {
            ReclaimState::Done => write!(f, "SPI0 signals '/WP' and '/HOLD' were disabled."),
            ReclaimState::Failed(reason) => {
                write!(f, "SPI0 signals '/WP' and '/HOLD' were NOT disabled: {}", reason)
            }
            state => write!(f, "stopped in {:?}", state),
        }
    }
}
