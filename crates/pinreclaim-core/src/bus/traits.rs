//! Bus trait definitions

use crate::error::Result;
use crate::spi::{FlashMode, SpiCommand};

/// SPI master trait for the flash controller
///
/// This trait represents the controller that owns the flash chip. It must be
/// usable before the platform's own flash driver has initialized, because
/// the reclaim runs early at boot.
///
/// All transactions are synchronous: `execute` returns only once the
/// transaction has completed on the wire. There is exactly one transaction
/// in flight at any time.
///
/// ## Example
///
/// ```ignore
/// impl SpiMaster for Spi0 {
///     fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
///         self.user_command(cmd.opcode, cmd.write_data, cmd.read_buf)
///             .map_err(|_| Error::SpiTransferFailed)
///     }
///
///     fn flash_mode(&self) -> FlashMode {
///         self.configured_mode()
///     }
///
///     fn delay_us(&mut self, us: u32) {
///         ets_delay_us(us)
///     }
/// }
/// ```
pub trait SpiMaster {
    /// Execute a single SPI command
    ///
    /// The command contains all the information needed for the transaction:
    /// - `opcode`: The SPI command opcode
    /// - `address`: Optional address (with width)
    /// - `dummy_cycles`: Number of dummy clock cycles after address
    /// - `write_data`: Data to write after the header
    /// - `read_buf`: Buffer to read data into
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()>;

    /// Mode the controller uses for array reads
    fn flash_mode(&self) -> FlashMode;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}

impl<M: SpiMaster + ?Sized> SpiMaster for &mut M {
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        (**self).execute(cmd)
    }

    fn flash_mode(&self) -> FlashMode {
        (**self).flash_mode()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
