//! Flash controller wiring modes

/// How the SPI flash controller is configured for array reads
///
/// This is the mode the boot image selected (QIO, QOUT, DIO or DOUT). In
/// the quad modes IO2 and IO3 carry data, so the pins that would otherwise
/// be `/WP` and `/HOLD` are owned by the bus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FlashMode {
    /// Quad I/O: address and data on 4 lines
    Qio,
    /// Quad Output: data on 4 lines
    Qout,
    /// Dual I/O: address and data on 2 lines
    #[default]
    Dio,
    /// Dual Output: data on 2 lines
    Dout,
}

impl FlashMode {
    /// Returns true if IO2/IO3 carry data in this mode
    pub const fn is_quad(&self) -> bool {
        matches!(self, Self::Qio | Self::Qout)
    }

    /// Short name as used by build tools
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Qio => "QIO",
            Self::Qout => "QOUT",
            Self::Dio => "DIO",
            Self::Dout => "DOUT",
        }
    }
}

impl core::fmt::Display for FlashMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
