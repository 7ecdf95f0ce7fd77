//! Packed chip identifier

use core::fmt;

/// Raw chip identifier
///
/// Packed as `vendor | device_type << 8 | capacity << 16`, which is the
/// byte order RDID returns them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChipId(u32);

impl ChipId {
    /// Wrap a packed identifier
    pub const fn new(raw: u32) -> Self {
        Self(raw & 0x00FF_FFFF)
    }

    /// Build from the three RDID bytes in wire order
    pub const fn from_jedec_bytes(bytes: [u8; 3]) -> Self {
        Self((bytes[0] as u32) | ((bytes[1] as u32) << 8) | ((bytes[2] as u32) << 16))
    }

    /// The packed value
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Manufacturer byte
    pub const fn vendor(self) -> u8 {
        self.0 as u8
    }

    /// Memory type byte
    pub const fn device_type(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Capacity code (log2 of the size in bytes on most parts)
    pub const fn capacity_code(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Vendor and memory type, the low 16 bits
    pub const fn device_and_vendor(self) -> u16 {
        self.0 as u16
    }

    /// Size in bytes implied by the capacity code, when it looks like one
    pub const fn capacity_bytes(self) -> Option<u32> {
        let code = self.capacity_code();
        if code >= 0x10 && code <= 0x1F {
            Some(1u32 << code)
        } else {
            None
        }
    }

    /// False for the all-zeros and all-ones patterns of an absent chip
    pub const fn is_valid(self) -> bool {
        self.0 != 0 && self.0 != 0x00FF_FFFF
    }

    /// JEDEC manufacturer codes carry odd parity
    pub const fn has_odd_parity(self) -> bool {
        self.vendor().count_ones() % 2 == 1
    }

    /// Best-known vendor name
    pub fn vendor_name(self) -> &'static str {
        super::vendor_name(self.vendor())
    }
}

impl From<u32> for ChipId {
    fn from(raw: u32) -> Self {
        Self::new(raw)
    }
}

impl fmt::Display for ChipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn test_field_split() {
        let id = ChipId::from_jedec_bytes([0x1C, 0x30, 0x16]);
        assert_eq!(id.raw(), 0x16301C);
        assert_eq!(id.vendor(), 0x1C);
        assert_eq!(id.device_type(), 0x30);
        assert_eq!(id.capacity_code(), 0x16);
        assert_eq!(id.device_and_vendor(), 0x301C);
        assert_eq!(id.capacity_bytes(), Some(4 * 1024 * 1024));
        assert_eq!(id.vendor_name(), "EON");
    }

    #[test]
    fn test_validity() {
        assert!(!ChipId::new(0).is_valid());
        assert!(!ChipId::new(0xFFFFFF).is_valid());
        assert!(!ChipId::new(0xFFFF_FFFF).is_valid());
        assert!(ChipId::new(0x1640EF).is_valid());
    }

    #[test]
    fn test_parity() {
        assert!(ChipId::new(0xEF).has_odd_parity());
        assert!(ChipId::new(0xC8).has_odd_parity());
        assert!(!ChipId::new(0xD8).has_odd_parity());
    }

    #[test]
    fn test_display() {
        assert_eq!(ChipId::new(0x1640C8).to_string(), "0x1640C8");
    }
}
