//! Reclaim settings

use crate::bus::SpiMaster;
use crate::protocol::Persistence;
use crate::quad::VendorTable;

/// Replacement for table dispatch and negotiation
///
/// Receives the bus and the raw identifier and returns true only when it
/// verified that the enable bit is set.
/// [`default_vendor_cases`](crate::quad::default_vendor_cases) is the
/// built-in handling with the same signature.
pub type VendorHook = fn(&mut dyn SpiMaster, u32) -> bool;

/// Run-time settings for a [`Reclaimer`](super::Reclaimer)
#[derive(Debug, Clone, Default)]
pub struct ReclaimConfig {
    /// Persistence for every vendor; `None` uses each table row's default
    pub persistence: Option<Persistence>,
    /// Replaces table dispatch and negotiation when set
    pub hook: Option<VendorHook>,
    /// Vendor table
    pub table: VendorTable,
    /// Read the SFDP revision info and put it in the report
    pub read_sfdp: bool,
}

impl ReclaimConfig {
    /// Built-in table, per-vendor persistence, no hook, no SFDP read
    pub fn new() -> Self {
        Self::default()
    }

    /// Force one persistence for every vendor
    pub fn with_persistence(mut self, persistence: Persistence) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Hand dispatch and negotiation to `hook`
    ///
    /// The reclaimer cannot see how the hook wrote. If the hook declines,
    /// registers are restored in the persistence set with
    /// [`with_persistence`](Self::with_persistence), or volatile when none
    /// was set. A hook that writes non-volatile bits should be paired with
    /// `with_persistence(Persistence::NonVolatile)`.
    pub fn with_hook(mut self, hook: VendorHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Use a different vendor table
    pub fn with_table(mut self, table: VendorTable) -> Self {
        self.table = table;
        self
    }

    /// Read SFDP revision info during the bus mode check
    pub fn with_sfdp(mut self, read_sfdp: bool) -> Self {
        self.read_sfdp = read_sfdp;
        self
    }
}
