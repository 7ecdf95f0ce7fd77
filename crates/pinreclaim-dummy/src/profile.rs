//! Emulated chip descriptions

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use pinreclaim_core::chip::ChipId;
use pinreclaim_core::spi::FlashMode;

/// Where the emulated part keeps its enable bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum QeLayout {
    /// QE at SR2 bit 1, SRP1 at SR2 bit 0
    #[default]
    Sr2Bit1,
    /// QE or WPDis at SR1 bit 6
    Sr1Bit6,
    /// No bit disables the pins
    Absent,
}

/// Status write forms the part executes
///
/// A form that is not listed is ignored by the chip and leaves WEL set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct WriteForms {
    /// WRSR with two data bytes (SR1 then SR2)
    pub wrsr16: bool,
    /// WRSR with one data byte
    pub wrsr8: bool,
    /// WRSR2 (0x31)
    pub wrsr2: bool,
    /// WRSR3 (0x11)
    pub wrsr3: bool,
}

impl WriteForms {
    /// Every form
    pub const ALL: Self = Self {
        wrsr16: true,
        wrsr8: true,
        wrsr2: true,
        wrsr3: true,
    };

    /// Nothing is ever written
    pub const NONE: Self = Self {
        wrsr16: false,
        wrsr8: false,
        wrsr2: false,
        wrsr3: false,
    };

    /// Per-register 8-bit writes only
    pub const EIGHT_BIT: Self = Self {
        wrsr16: false,
        ..Self::ALL
    };

    /// Older parts: SR2 only reachable through the 16-bit WRSR
    pub const LEGACY: Self = Self {
        wrsr16: true,
        wrsr8: true,
        wrsr2: false,
        wrsr3: false,
    };

    /// Single status register parts
    pub const SR1_ONLY: Self = Self {
        wrsr16: false,
        wrsr8: true,
        wrsr2: false,
        wrsr3: false,
    };

    /// True when the part executes a write with this opcode and length
    pub fn accepts(&self, opcode: u8, len: usize) -> bool {
        use pinreclaim_core::spi::opcodes;
        match (opcode, len) {
            (opcodes::WRSR, 2) => self.wrsr16,
            (opcodes::WRSR, 1) => self.wrsr8,
            (opcodes::WRSR2, 1) => self.wrsr2,
            (opcodes::WRSR3, 1) => self.wrsr3,
            _ => false,
        }
    }
}

impl Default for WriteForms {
    fn default() -> Self {
        Self::ALL
    }
}

/// Flash bus mode the emulated board boots in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum BusMode {
    /// Quad I/O
    Qio,
    /// Quad output
    Qout,
    /// Dual I/O
    #[default]
    Dio,
    /// Dual output
    Dout,
}

impl From<BusMode> for FlashMode {
    fn from(mode: BusMode) -> Self {
        match mode {
            BusMode::Qio => FlashMode::Qio,
            BusMode::Qout => FlashMode::Qout,
            BusMode::Dio => FlashMode::Dio,
            BusMode::Dout => FlashMode::Dout,
        }
    }
}

/// One emulated chip and the board around it
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct ChipProfile {
    /// Catalogue name
    pub name: String,
    /// Packed identifier, vendor in the low byte
    pub id: u32,
    /// Power-on values of SR1, SR2 and SR3
    pub status: [u8; 3],
    /// Number of status registers the part has; missing ones read 0x00
    pub registers: u8,
    /// Location of the enable bit
    pub layout: QeLayout,
    /// Status write forms the part executes
    pub writes: WriteForms,
    /// The part has volatile status bits (EWSR is honoured)
    pub volatile_writes: bool,
    /// A WRSR2 write resets SR3 to zero
    pub sr3_cleared_by_sr2_write: bool,
    /// WEL is already set at power-on
    pub stale_wel: bool,
    /// Flash bus mode
    pub bus_mode: BusMode,
    /// The part answers RDSFDP
    pub sfdp: bool,
    /// BUSY polls after each accepted status write
    pub write_cycle_polls: u32,
}

impl Default for ChipProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            id: 0x1640EF,
            status: [0x00, 0x00, 0x60],
            registers: 3,
            layout: QeLayout::Sr2Bit1,
            writes: WriteForms::ALL,
            volatile_writes: true,
            sr3_cleared_by_sr2_write: false,
            stale_wel: false,
            bus_mode: BusMode::Dio,
            sfdp: true,
            write_cycle_polls: 1,
        }
    }
}

impl ChipProfile {
    /// Profile with default behaviour for `id`
    pub fn new(name: &str, id: u32) -> Self {
        Self {
            name: name.to_string(),
            id,
            ..Self::default()
        }
    }

    /// Identifier as a [`ChipId`]
    pub fn chip_id(&self) -> ChipId {
        ChipId::new(self.id)
    }

    /// Check that the profile describes a possible part
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.is_empty() {
            return Err("empty name");
        }
        if !(1..=3).contains(&self.registers) {
            return Err("registers must be 1, 2 or 3");
        }
        if self.layout == QeLayout::Sr2Bit1 && self.registers < 2 {
            return Err("SR2 layout needs at least two status registers");
        }
        Ok(())
    }
}

/// The built-in catalogue
///
/// One profile per behaviour seen on real boards.
pub fn builtin_profiles() -> Vec<ChipProfile> {
    let mut profiles = Vec::new();

    // Older Winbond: the 16-bit WRSR is the only way into SR2
    profiles.push(ChipProfile {
        writes: WriteForms::LEGACY,
        ..ChipProfile::new("w25q32-legacy", 0x1640EF)
    });

    // Ignores the 16-bit WRSR the boot ROM uses
    profiles.push(ChipProfile {
        writes: WriteForms::EIGHT_BIT,
        ..ChipProfile::new("gd25q32", 0x1640C8)
    });

    profiles.push(ChipProfile {
        writes: WriteForms::EIGHT_BIT,
        sfdp: false,
        ..ChipProfile::new("d8-gd25q32", 0x1640D8)
    });

    profiles.push(ChipProfile {
        sr3_cleared_by_sr2_write: true,
        ..ChipProfile::new("xm25qh32", 0x164020)
    });

    // WPDis at S6, single status register
    profiles.push(ChipProfile {
        status: [0x00, 0x00, 0x00],
        registers: 1,
        layout: QeLayout::Sr1Bit6,
        writes: WriteForms::SR1_ONLY,
        ..ChipProfile::new("en25q32c", 0x16301C)
    });

    // EN25Q32 has no bit that disables the pins
    profiles.push(ChipProfile {
        status: [0x00, 0x00, 0x00],
        registers: 1,
        layout: QeLayout::Absent,
        writes: WriteForms::SR1_ONLY,
        sfdp: false,
        ..ChipProfile::new("en25q32", 0x16331C)
    });

    // No volatile status bits
    profiles.push(ChipProfile {
        status: [0x00, 0x00, 0x00],
        registers: 1,
        layout: QeLayout::Sr1Bit6,
        writes: WriteForms::SR1_ONLY,
        volatile_writes: false,
        ..ChipProfile::new("mx25l3233f", 0x1620C2)
    });

    profiles.push(ChipProfile {
        writes: WriteForms::NONE,
        ..ChipProfile::new("stubborn", 0x164085)
    });

    profiles.push(ChipProfile {
        bus_mode: BusMode::Qio,
        ..ChipProfile::new("qio-board", 0x1640EF)
    });

    // Boot ROM left the write latch set
    profiles.push(ChipProfile {
        stale_wel: true,
        ..ChipProfile::new("w25q32-stale-wel", 0x1640EF)
    });

    profiles
}
