//! Flash chip identification
//!
//! The identifier is whatever RDID returns, packed the way the boot ROM
//! reports it. The vendor byte is drawn from several JEDEC banks that reuse
//! the same codes, so a vendor byte on its own is a hint, not a fact.

mod id;

pub use id::*;

/// JEDEC manufacturer IDs seen on boot flash
pub mod manufacturer {
    /// EON (also Cypress in another bank)
    pub const EON: u8 = 0x1C;
    /// GigaDevice
    pub const GIGADEVICE: u8 = 0xC8;
    /// Rebadged GigaDevice parts
    pub const GIGADEVICE_D8: u8 = 0xD8;
    /// ISSI
    pub const ISSI: u8 = 0x9D;
    /// PMC (shares the ISSI code)
    pub const PMC: u8 = 0x9D;
    /// Macronix
    pub const MACRONIX: u8 = 0xC2;
    /// XMC (shares the Micron/ST code)
    pub const XMC: u8 = 0x20;
    /// Winbond
    pub const WINBOND: u8 = 0xEF;
    /// BergMicro
    pub const BERGMICRO: u8 = 0xE0;
    /// Zbit Semiconductor
    pub const ZBIT: u8 = 0x5E;
}

/// Best-known name for a vendor byte
pub fn vendor_name(vendor: u8) -> &'static str {
    match vendor {
        manufacturer::EON => "EON",
        manufacturer::GIGADEVICE => "GigaDevice",
        manufacturer::GIGADEVICE_D8 => "GigaDevice (0xD8)",
        manufacturer::ISSI => "ISSI/PMC",
        manufacturer::MACRONIX => "Macronix",
        manufacturer::XMC => "XMC",
        manufacturer::WINBOND => "Winbond",
        manufacturer::BERGMICRO => "BergMicro",
        manufacturer::ZBIT => "Zbit",
        _ => "unknown",
    }
}
