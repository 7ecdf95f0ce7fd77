//! Status register bit layout

use bitflags::bitflags;

bitflags! {
    /// Combined view of status registers 1 to 3
    ///
    /// SR1 occupies bits 0-7, SR2 bits 8-15 and SR3 bits 16-23. The names
    /// follow the Winbond layout; vendors that keep QE at bit 6 reuse the
    /// [`S6`](Self::S6) position in SR1.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StatusBits: u32 {
        /// SR1 bit 0: Busy / Write In Progress (read only)
        const BUSY = 1 << 0;
        /// SR1 bit 1: Write Enable Latch (read only)
        const WEL  = 1 << 1;
        /// SR1 bit 2: Block Protect 0
        const BP0  = 1 << 2;
        /// SR1 bit 3: Block Protect 1
        const BP1  = 1 << 3;
        /// SR1 bit 4: Block Protect 2
        const BP2  = 1 << 4;
        /// SR1 bit 5: Top/Bottom protect
        const TB   = 1 << 5;
        /// SR1 bit 6: Sector protect, or QE/WPDis on bit-6 vendors
        const S6   = 1 << 6;
        /// SR1 bit 7: Status Register Protect 0 (SRWD on some vendors)
        const SRP0 = 1 << 7;
        /// SR2 bit 0 (S8): Status Register Protect 1
        const SRP1 = 1 << 8;
        /// SR2 bit 1 (S9): Quad Enable
        const QE   = 1 << 9;
        /// SR2 bit 6 (S14): Complement protect
        const CMP  = 1 << 14;

        /// Bits the chip sets on its own and that must never be written
        const TRANSIENT = Self::BUSY.bits() | Self::WEL.bits();
        /// The protect pair
        const PROTECT_PAIR = Self::SRP0.bits() | Self::SRP1.bits();
        /// Block protect bits in SR1
        const BLOCK_PROTECT = Self::BP0.bits() | Self::BP1.bits() | Self::BP2.bits()
            | Self::TB.bits();
        /// All of SR1
        const SR1 = 0x0000_00FF;
        /// All of SR2
        const SR2 = 0x0000_FF00;
        /// All of SR3
        const SR3 = 0x00FF_0000;
    }
}

impl StatusBits {
    /// Build from individual register values
    pub const fn from_registers(sr1: u8, sr2: u8, sr3: u8) -> Self {
        Self::from_bits_retain((sr1 as u32) | ((sr2 as u32) << 8) | ((sr3 as u32) << 16))
    }

    /// Status register 1
    pub const fn sr1(self) -> u8 {
        self.bits() as u8
    }

    /// Status register 2
    pub const fn sr2(self) -> u8 {
        (self.bits() >> 8) as u8
    }

    /// Status register 3
    pub const fn sr3(self) -> u8 {
        (self.bits() >> 16) as u8
    }

    /// SR1 and SR2 as the 16-bit value of a legacy combined write
    pub const fn sr12(self) -> u16 {
        self.bits() as u16
    }

    /// The same bits with BUSY and WEL removed
    pub fn without_transient(self) -> Self {
        self.difference(Self::TRANSIENT)
    }

    /// True when SRP1:SRP0 = 1:1
    pub fn has_lock_pattern(self) -> bool {
        self.contains(Self::PROTECT_PAIR)
    }
}

/// Values of status registers 1 to 3 as read from the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusRegisterSet {
    /// Status register 1
    pub sr1: u8,
    /// Status register 2
    pub sr2: u8,
    /// Status register 3
    pub sr3: u8,
}

impl StatusRegisterSet {
    /// Create a register set
    pub const fn new(sr1: u8, sr2: u8, sr3: u8) -> Self {
        Self { sr1, sr2, sr3 }
    }

    /// Combined bit view
    pub const fn bits(&self) -> StatusBits {
        StatusBits::from_registers(self.sr1, self.sr2, self.sr3)
    }

    /// Value of one register
    pub const fn get(&self, reg: super::StatusRegister) -> u8 {
        match reg {
            super::StatusRegister::Status1 => self.sr1,
            super::StatusRegister::Status2 => self.sr2,
            super::StatusRegister::Status3 => self.sr3,
        }
    }
}

impl core::fmt::Display for StatusRegisterSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "SR1=0x{:02X} SR2=0x{:02X} SR3=0x{:02X}",
            self.sr1, self.sr2, self.sr3
        )
    }
}
