//! SFDP type definitions

/// SFDP signature magic value ("SFDP" in little-endian)
pub const SFDP_SIGNATURE: u32 = 0x50444653;

/// Basic Flash Parameter Table ID
pub const PARAM_ID_BASIC: u16 = 0xFF00;

/// Largest first parameter table read by [`read_basic_table`](super::read_basic_table)
pub const MAX_BASIC_TABLE_DWORDS: usize = 64;

/// SFDP revision information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SfdpRevision {
    /// Major revision number
    pub major: u8,
    /// Minor revision number
    pub minor: u8,
}

impl SfdpRevision {
    /// Create a new revision
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Check if this revision is at least the specified version
    pub fn at_least(&self, major: u8, minor: u8) -> bool {
        self.major > major || (self.major == major && self.minor >= minor)
    }
}

impl core::fmt::Display for SfdpRevision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// SFDP header (first 8 bytes at address 0x00)
#[derive(Debug, Clone, Copy, Default)]
pub struct SfdpHeader {
    /// Signature, 0x50444653 when SFDP is present
    pub signature: u32,
    /// SFDP revision
    pub revision: SfdpRevision,
    /// Number of parameter headers minus one
    pub nph: u8,
    /// Access protocol (0xFF for legacy)
    pub access_protocol: u8,
}

impl SfdpHeader {
    /// Parse from raw little-endian bytes
    pub fn parse(data: &[u8; 8]) -> Self {
        Self {
            signature: u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            revision: SfdpRevision {
                minor: data[4],
                major: data[5],
            },
            nph: data[6],
            access_protocol: data[7],
        }
    }

    /// Check if the signature is valid
    pub fn is_valid(&self) -> bool {
        self.signature == SFDP_SIGNATURE
    }
}

/// Parameter header (8 bytes each, starting at address 0x08)
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterHeader {
    /// Parameter ID (MSB << 8 | LSB)
    pub id: u16,
    /// Parameter table revision
    pub revision: SfdpRevision,
    /// Parameter table length in DWORDs
    pub length_dwords: u8,
    /// Parameter table pointer (24-bit byte address)
    pub table_pointer: u32,
}

impl ParameterHeader {
    /// Parse from raw little-endian bytes
    pub fn parse(data: &[u8; 8]) -> Self {
        Self {
            id: ((data[7] as u16) << 8) | (data[0] as u16),
            revision: SfdpRevision {
                minor: data[1],
                major: data[2],
            },
            length_dwords: data[3],
            table_pointer: u32::from_le_bytes([data[4], data[5], data[6], 0]),
        }
    }

    /// Check if this is the Basic Flash Parameter Table
    pub fn is_basic(&self) -> bool {
        self.id == PARAM_ID_BASIC
    }
}

/// What a chip reports about its SFDP revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SfdpRevInfo {
    /// SFDP header revision
    pub header: SfdpRevision,
    /// Number of parameter headers, as encoded (count minus one)
    pub num_param_headers: u8,
    /// Revision of the first parameter table
    pub table: SfdpRevision,
    /// Length of the first parameter table in DWORDs
    pub length_dwords: u8,
    /// Byte address of the first parameter table
    pub table_pointer: u32,
}

impl SfdpRevInfo {
    /// Combine the header with the first parameter header
    pub fn new(header: &SfdpHeader, param: &ParameterHeader) -> Self {
        Self {
            header: header.revision,
            num_param_headers: header.nph,
            table: param.revision,
            length_dwords: param.length_dwords,
            table_pointer: param.table_pointer,
        }
    }

    /// True when the first parameter header points at a table
    pub const fn has_table(&self) -> bool {
        self.table_pointer != 0
    }
}

impl core::fmt::Display for SfdpRevInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "SFDP {} ({} param headers), table {} {} DWORDs @ 0x{:06X}",
            self.header,
            self.num_param_headers as u16 + 1,
            self.table,
            self.length_dwords,
            self.table_pointer
        )
    }
}
