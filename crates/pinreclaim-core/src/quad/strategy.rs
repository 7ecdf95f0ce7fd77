//! Vendor strategies for setting the Quad Enable bit

use core::fmt;

use crate::bus::SpiMaster;
use crate::error::{Error, Result};
use crate::protocol::{self, Persistence, StatusBits, StatusRegister, WriteWidth};

use super::engine::{set_bit_verified, WritePlan};

/// Where a chip keeps its enable bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QeBit {
    /// QE at SR2 bit 1 (S9), protect pair SRP0 (SR1 bit 7) / SRP1 (SR2 bit 0)
    Sr2Bit1,
    /// QE or WPDis at SR1 bit 6, SRP0/SRWD at SR1 bit 7, no SRP1
    Sr1Bit6,
}

impl QeBit {
    /// The enable bit in the combined view
    pub const fn mask(self) -> StatusBits {
        match self {
            Self::Sr2Bit1 => StatusBits::QE,
            Self::Sr1Bit6 => StatusBits::S6,
        }
    }

    /// Register holding the enable bit
    pub const fn register(self) -> StatusRegister {
        match self {
            Self::Sr2Bit1 => StatusRegister::Status2,
            Self::Sr1Bit6 => StatusRegister::Status1,
        }
    }

    /// Protect bits that gate the `/WP` pin on this layout
    pub fn protect_bits(self) -> StatusBits {
        match self {
            Self::Sr2Bit1 => StatusBits::PROTECT_PAIR,
            Self::Sr1Bit6 => StatusBits::SRP0,
        }
    }

    /// True when `bits` would lock the status registers on this layout
    ///
    /// Only the SR2 layout has an SRP1 bit, so only it can lock.
    pub fn is_locked(self, bits: StatusBits) -> bool {
        self == Self::Sr2Bit1 && bits.has_lock_pattern()
    }

    /// Status bit number in S0..S23 notation
    pub const fn bit_number(self) -> u8 {
        match self {
            Self::Sr2Bit1 => 9,
            Self::Sr1Bit6 => 6,
        }
    }
}

impl fmt::Display for QeBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QE/S{}", self.bit_number())
    }
}

/// Kinds of enable-bit procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VendorStrategy {
    /// QE at S9, legacy 16-bit WRSR covering SR1 and SR2
    Sr2Write16,
    /// QE at S9, 8-bit WRSR2
    Sr2Write8,
    /// QE or WPDis at S6, 8-bit WRSR
    Sr1Bit6Write8,
    /// QE at S9, 8-bit WRSR2, SR3 snapshot and restore around it
    Sr2PreserveSr3,
    /// Vendor byte matched a family that needs a wider identifier check;
    /// `accepted` is false for sibling parts known to lack the feature
    MaskedId {
        /// Whether the identifier passed the family's gate
        accepted: bool,
    },
    /// Unknown vendor: 16-bit write, then 8-bit SR2 write
    DefaultFallback,
    /// Registered by an integrator
    Custom,
}

impl VendorStrategy {
    /// Built-in implementation for this kind
    ///
    /// Returns `None` for [`Custom`](Self::Custom), whose implementation only
    /// exists in the registering table entry.
    pub fn implementation(self) -> Option<&'static dyn QuadEnableStrategy> {
        Some(match self {
            Self::Sr2Write16 => &LegacyWrite16,
            Self::Sr2Write8 => &Sr2Write8,
            Self::Sr1Bit6Write8 => &Sr1Bit6Write8,
            Self::Sr2PreserveSr3 => &PreserveSr3,
            Self::MaskedId { accepted: true } => &MaskedIdGate,
            Self::MaskedId { accepted: false } => &RejectedSibling,
            Self::DefaultFallback => &DefaultFallback,
            Self::Custom => return None,
        })
    }

    /// Short name for logs and reports
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sr2Write16 => "sr2-write16",
            Self::Sr2Write8 => "sr2-write8",
            Self::Sr1Bit6Write8 => "sr1-bit6-write8",
            Self::Sr2PreserveSr3 => "sr2-preserve-sr3",
            Self::MaskedId { accepted: true } => "masked-id",
            Self::MaskedId { accepted: false } => "masked-id-rejected",
            Self::DefaultFallback => "default-fallback",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for VendorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one negotiation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QeOutcome {
    /// The enable bit reads set after the attempt
    pub success: bool,
    /// SR1 and SR2 re-read after the attempt, BUSY and WEL masked
    pub final_bits: StatusBits,
}

/// Register state a strategy must put back after its write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnomalySnapshot {
    /// Nothing to restore
    #[default]
    None,
    /// SR3 as read before the SR2 write
    Sr3(u8),
}

/// A procedure for setting the enable bit on one family of chips
///
/// Implementations read the registers they need, write, and report whether
/// the enable bit now reads set. A write the chip ignored is `Ok(false)`;
/// `Err` is reserved for bus failures and lock-pattern violations.
pub trait QuadEnableStrategy: Sync {
    /// Kind reported in logs and reports
    fn kind(&self) -> VendorStrategy;

    /// Register layout the strategy writes, or `None` when it never writes
    fn qe_bit(&self) -> Option<QeBit>;

    /// Capture state that the write is known to clobber
    fn snapshot(&self, _master: &mut dyn SpiMaster) -> Result<AnomalySnapshot> {
        Ok(AnomalySnapshot::None)
    }

    /// Set the enable bit and verify it
    fn apply_enable_bit(&self, master: &mut dyn SpiMaster, persistence: Persistence)
        -> Result<bool>;

    /// Put back what [`snapshot`](Self::snapshot) captured
    fn restore_anomalies(
        &self,
        _master: &mut dyn SpiMaster,
        _snapshot: AnomalySnapshot,
    ) -> Result<()> {
        Ok(())
    }
}

/// SR1+SR2 in one 16-bit write: keep SRP0, set QE, clear the rest
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyWrite16;

impl LegacyWrite16 {
    const PLAN: WritePlan = WritePlan {
        register: StatusRegister::Status1,
        width: WriteWidth::Bits16,
        keep: StatusBits::SRP0,
        set: StatusBits::QE,
        layout: QeBit::Sr2Bit1,
    };
}

impl QuadEnableStrategy for LegacyWrite16 {
    fn kind(&self) -> VendorStrategy {
        VendorStrategy::Sr2Write16
    }

    fn qe_bit(&self) -> Option<QeBit> {
        Some(QeBit::Sr2Bit1)
    }

    fn apply_enable_bit(
        &self,
        master: &mut dyn SpiMaster,
        persistence: Persistence,
    ) -> Result<bool> {
        set_bit_verified(master, &Self::PLAN, persistence)
    }
}

/// SR2 alone: QE set, everything else in SR2 cleared
#[derive(Debug, Clone, Copy, Default)]
pub struct Sr2Write8;

impl Sr2Write8 {
    const PLAN: WritePlan = WritePlan {
        register: StatusRegister::Status2,
        width: WriteWidth::Bits8,
        keep: StatusBits::QE,
        set: StatusBits::QE,
        layout: QeBit::Sr2Bit1,
    };
}

impl QuadEnableStrategy for Sr2Write8 {
    fn kind(&self) -> VendorStrategy {
        VendorStrategy::Sr2Write8
    }

    fn qe_bit(&self) -> Option<QeBit> {
        Some(QeBit::Sr2Bit1)
    }

    fn apply_enable_bit(
        &self,
        master: &mut dyn SpiMaster,
        persistence: Persistence,
    ) -> Result<bool> {
        set_bit_verified(master, &Self::PLAN, persistence)
    }
}

/// SR1 alone: bit 6 set, everything else in SR1 cleared
#[derive(Debug, Clone, Copy, Default)]
pub struct Sr1Bit6Write8;

impl Sr1Bit6Write8 {
    const PLAN: WritePlan = WritePlan {
        register: StatusRegister::Status1,
        width: WriteWidth::Bits8,
        keep: StatusBits::S6,
        set: StatusBits::S6,
        layout: QeBit::Sr1Bit6,
    };
}

impl QuadEnableStrategy for Sr1Bit6Write8 {
    fn kind(&self) -> VendorStrategy {
        VendorStrategy::Sr1Bit6Write8
    }

    fn qe_bit(&self) -> Option<QeBit> {
        Some(QeBit::Sr1Bit6)
    }

    fn apply_enable_bit(
        &self,
        master: &mut dyn SpiMaster,
        persistence: Persistence,
    ) -> Result<bool> {
        set_bit_verified(master, &Self::PLAN, persistence)
    }
}

/// XMC: a volatile SR2 write zeroes SR3 (drive strength), which only comes
/// back from the non-volatile copy at power-up
#[derive(Debug, Clone, Copy, Default)]
pub struct PreserveSr3;

impl QuadEnableStrategy for PreserveSr3 {
    fn kind(&self) -> VendorStrategy {
        VendorStrategy::Sr2PreserveSr3
    }

    fn qe_bit(&self) -> Option<QeBit> {
        Some(QeBit::Sr2Bit1)
    }

    fn snapshot(&self, master: &mut dyn SpiMaster) -> Result<AnomalySnapshot> {
        match protocol::read_status(master, StatusRegister::Status3) {
            Ok(sr3) => Ok(AnomalySnapshot::Sr3(sr3)),
            Err(e) => {
                log::warn!("SR3 snapshot failed ({}), drive strength will not be restored", e);
                Ok(AnomalySnapshot::None)
            }
        }
    }

    fn apply_enable_bit(
        &self,
        master: &mut dyn SpiMaster,
        persistence: Persistence,
    ) -> Result<bool> {
        set_bit_verified(master, &Sr2Write8::PLAN, persistence)
    }

    fn restore_anomalies(
        &self,
        master: &mut dyn SpiMaster,
        snapshot: AnomalySnapshot,
    ) -> Result<()> {
        let AnomalySnapshot::Sr3(saved) = snapshot else {
            return Ok(());
        };
        let current = protocol::read_status(master, StatusRegister::Status3)?;
        if current == saved {
            return Ok(());
        }
        diag!(
            "  XMC anomaly: SR3 0x{:02X} -> 0x{:02X}, copying drive strength back",
            saved,
            current
        );
        // The non-volatile copy still holds the value; only the volatile
        // copy needs repair.
        protocol::write_status(
            master,
            StatusRegister::Status3,
            saved as u16,
            Persistence::Volatile,
            WriteWidth::Bits8,
        )?;
        if protocol::read_status(master, StatusRegister::Status3)? != saved {
            return Err(Error::VerifyFailed);
        }
        Ok(())
    }
}

/// Family accepted by an identifier gate (EON WPDis parts): bit 6 in SR1
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskedIdGate;

impl QuadEnableStrategy for MaskedIdGate {
    fn kind(&self) -> VendorStrategy {
        VendorStrategy::MaskedId { accepted: true }
    }

    fn qe_bit(&self) -> Option<QeBit> {
        Some(QeBit::Sr1Bit6)
    }

    fn apply_enable_bit(
        &self,
        master: &mut dyn SpiMaster,
        persistence: Persistence,
    ) -> Result<bool> {
        Sr1Bit6Write8.apply_enable_bit(master, persistence)
    }
}

/// Sibling part excluded by an identifier gate; fails without writing
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectedSibling;

impl QuadEnableStrategy for RejectedSibling {
    fn kind(&self) -> VendorStrategy {
        VendorStrategy::MaskedId { accepted: false }
    }

    fn qe_bit(&self) -> Option<QeBit> {
        None
    }

    fn apply_enable_bit(
        &self,
        _master: &mut dyn SpiMaster,
        _persistence: Persistence,
    ) -> Result<bool> {
        diag!("  Part excluded by identifier gate, no enable bit to set");
        Ok(false)
    }
}

/// Unknown vendor: assume QE at S9
///
/// The 16-bit write is what the boot ROM itself uses, so parts that work in
/// QIO accept it. DIO-only parts often take only the 8-bit form.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFallback;

impl QuadEnableStrategy for DefaultFallback {
    fn kind(&self) -> VendorStrategy {
        VendorStrategy::DefaultFallback
    }

    fn qe_bit(&self) -> Option<QeBit> {
        Some(QeBit::Sr2Bit1)
    }

    fn apply_enable_bit(
        &self,
        master: &mut dyn SpiMaster,
        persistence: Persistence,
    ) -> Result<bool> {
        if LegacyWrite16.apply_enable_bit(master, persistence)? {
            return Ok(true);
        }
        diag!("  16-bit status write did not set QE, retrying with 8-bit SR2 write");
        if Sr2Write8.apply_enable_bit(master, persistence)? {
            return Ok(true);
        }
        diag!("** Unable to set QE using the default handler");
        Ok(false)
    }
}
