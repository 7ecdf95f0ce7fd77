//! Vendor capability table
//!
//! An ordered list of [`VendorEntry`] values, first match wins. Integrators
//! add vendors by registering entries ahead of the built-ins instead of
//! touching the engine.
//!
//! The vendor byte is a JEDEC code from one of several manufacturer banks
//! and there is no way to read which bank a part belongs to, so a match on
//! the vendor byte alone may pick the wrong family. That is tolerated:
//! verification after the write catches a wrong strategy.

use core::fmt;

use heapless::Vec;

use crate::bus::SpiMaster;
use crate::chip::{manufacturer, ChipId};
use crate::error::Result;
use crate::protocol::Persistence;

use super::engine::attempt_set_quad_enable;
use super::strategy::*;

/// Maximum number of integrator-registered entries
pub const MAX_REGISTERED_VENDORS: usize = 8;

/// Additional identifier check for a vendor family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdGate {
    /// Bits of the raw identifier to compare
    pub mask: u32,
    /// Required value of the masked identifier
    pub value: u32,
}

impl IdGate {
    /// True when `id` passes the gate
    pub const fn accepts(&self, id: ChipId) -> bool {
        id.raw() & self.mask == self.value
    }
}

/// One row of the vendor table
#[derive(Clone, Copy)]
pub struct VendorEntry {
    /// Vendor byte matched against the low 8 bits of the identifier
    pub vendor: u8,
    /// Optional wider check; a failed gate rejects the part
    pub gate: Option<IdGate>,
    /// Procedure for this family
    pub strategy: &'static dyn QuadEnableStrategy,
    /// Persistence used unless the caller overrides it
    pub persistence: Persistence,
    /// Name for logs
    pub name: &'static str,
}

impl VendorEntry {
    /// Entry with volatile persistence and no gate
    pub const fn new(
        vendor: u8,
        name: &'static str,
        strategy: &'static dyn QuadEnableStrategy,
    ) -> Self {
        Self {
            vendor,
            gate: None,
            strategy,
            persistence: Persistence::Volatile,
            name,
        }
    }

    /// Require `id & mask == value` before accepting the family
    pub const fn with_gate(mut self, mask: u32, value: u32) -> Self {
        self.gate = Some(IdGate { mask, value });
        self
    }

    /// Use a different default persistence
    pub const fn with_persistence(mut self, persistence: Persistence) -> Self {
        self.persistence = persistence;
        self
    }

    /// Kind of the entry's strategy
    pub fn kind(&self) -> VendorStrategy {
        self.strategy.kind()
    }

    /// Run this entry's strategy once
    ///
    /// `persistence` overrides the entry's own default when given.
    pub fn negotiate(
        &self,
        master: &mut dyn SpiMaster,
        persistence: Option<Persistence>,
    ) -> Result<QeOutcome> {
        let persistence = persistence.unwrap_or(self.persistence);
        diag!(
            "  {} strategy {} ({})",
            self.name,
            self.strategy.kind(),
            persistence
        );
        attempt_set_quad_enable(master, self.strategy, persistence)
    }
}

impl fmt::Debug for VendorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendorEntry")
            .field("vendor", &format_args!("0x{:02X}", self.vendor))
            .field("gate", &self.gate)
            .field("strategy", &self.strategy.kind())
            .field("persistence", &self.persistence)
            .field("name", &self.name)
            .finish()
    }
}

/// Entry used when no row matches
pub const DEFAULT_ENTRY: VendorEntry = VendorEntry::new(0x00, "default", &DefaultFallback);

/// Entry substituted when a gated family rejects a sibling part
const REJECTED_ENTRY: VendorEntry = VendorEntry::new(0x00, "excluded", &RejectedSibling);

/// Built-in vendor rows, in match order
pub static BUILTIN_VENDORS: &[VendorEntry] = &[
    // 8-bit status writes only; the boot ROM's 16-bit write always fails
    #[cfg(feature = "vendor-gigadevice")]
    VendorEntry::new(manufacturer::GIGADEVICE, "GigaDevice", &Sr2Write8),
    // Rebadged GigaDevice (GigaDevice ID in SFDP)
    #[cfg(feature = "vendor-d8")]
    VendorEntry::new(manufacturer::GIGADEVICE_D8, "0xD8", &Sr2Write8),
    #[cfg(feature = "vendor-xmc")]
    VendorEntry::new(manufacturer::XMC, "XMC", &PreserveSr3),
    // ISSI/PMC has no volatile status bits
    #[cfg(feature = "vendor-s6")]
    VendorEntry::new(manufacturer::PMC, "ISSI/PMC", &Sr1Bit6Write8)
        .with_persistence(Persistence::NonVolatile),
    #[cfg(feature = "vendor-s6")]
    VendorEntry::new(manufacturer::MACRONIX, "Macronix", &Sr1Bit6Write8)
        .with_persistence(Persistence::NonVolatile),
    // EN25Q32A/B/C: WPDis at S6. Device 0x33 (EN25Q32) has no such bit.
    #[cfg(feature = "vendor-eon")]
    VendorEntry::new(manufacturer::EON, "EON", &MaskedIdGate).with_gate(0xFFFF, 0x301C),
];

/// Strategy kind for a vendor byte, from the built-in rows alone
///
/// Pure and deterministic. Gates are not evaluated here since they need the
/// full identifier; a gated family reports its accepted kind.
pub fn dispatch(vendor: u8) -> VendorStrategy {
    BUILTIN_VENDORS
        .iter()
        .find(|entry| entry.vendor == vendor)
        .map(VendorEntry::kind)
        .unwrap_or(VendorStrategy::DefaultFallback)
}

/// Ordered vendor table: registered rows first, then the built-ins
#[derive(Debug, Clone)]
pub struct VendorTable {
    registered: Vec<VendorEntry, MAX_REGISTERED_VENDORS>,
    builtins: &'static [VendorEntry],
}

impl Default for VendorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl VendorTable {
    /// Table holding the built-in rows
    pub const fn new() -> Self {
        Self {
            registered: Vec::new(),
            builtins: BUILTIN_VENDORS,
        }
    }

    /// Table without the built-in rows
    pub const fn empty() -> Self {
        Self {
            registered: Vec::new(),
            builtins: &[],
        }
    }

    /// Add a row ahead of the built-ins
    ///
    /// Later registrations are tried after earlier ones. Returns the entry
    /// back when the table is full.
    pub fn register(&mut self, entry: VendorEntry) -> core::result::Result<(), VendorEntry> {
        self.registered.push(entry)
    }

    /// All rows in match order
    pub fn entries(&self) -> impl Iterator<Item = &VendorEntry> + '_ {
        self.registered.iter().chain(self.builtins.iter())
    }

    /// Row for a chip identifier
    ///
    /// A gated row whose gate rejects the identifier yields a row with
    /// the [`RejectedSibling`] strategy rather than falling through, since
    /// the family is known and known not to work.
    pub fn dispatch(&self, id: ChipId) -> VendorEntry {
        let Some(entry) = self.entries().find(|e| e.vendor == id.vendor()) else {
            log::debug!("vendor 0x{:02X} not in table, using default", id.vendor());
            return VendorEntry {
                vendor: id.vendor(),
                ..DEFAULT_ENTRY
            };
        };

        match entry.gate {
            Some(gate) if !gate.accepts(id) => {
                log::debug!(
                    "{}: {} fails gate 0x{:X}/0x{:X}, sibling part excluded",
                    entry.name,
                    id,
                    gate.mask,
                    gate.value
                );
                VendorEntry {
                    vendor: entry.vendor,
                    persistence: entry.persistence,
                    ..REJECTED_ENTRY
                }
            }
            Some(_) => *entry,
            None => {
                log::debug!(
                    "vendor 0x{:02X} matched {} on vendor byte alone (ambiguous across banks)",
                    id.vendor(),
                    entry.name
                );
                *entry
            }
        }
    }
}

/// Built-in vendor handling with the vendor-hook signature
///
/// Dispatches through the built-in table and negotiates once. Returns true
/// only when the enable bit was verified set.
pub fn default_vendor_cases(master: &mut dyn SpiMaster, id: u32) -> bool {
    let entry = VendorTable::new().dispatch(ChipId::new(id));
    match entry.negotiate(master, None) {
        Ok(outcome) => outcome.success,
        Err(e) => {
            log::warn!("{}: negotiation failed: {}", entry.name, e);
            false
        }
    }
}
