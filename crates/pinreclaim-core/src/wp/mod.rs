//! Write-protect state controller
//!
//! Drives the status register protect bits into one of two known patterns:
//!
//! - [`clear_protection`]: protect and block-protect bits zero, enable bit
//!   set. This is the reclaimed state.
//! - [`force_protected_state`]: SRP1:SRP0 = 0:1 and enable bit clear, which
//!   makes the chip honour `/WP` again. Only used as a negative control.
//!
//! Both run in the same fixed order: WRDI, `/WP` driven HIGH as an output so
//! the chip never sees it asserted mid-rewrite, the register writes, and the
//! pin handed back to the flash function last, on error paths too.

mod residual;

pub use residual::Residual;

use crate::bus::SpiMaster;
use crate::error::{Error, Result};
use crate::gpio::{FlashPin, Level, PinMode};
use crate::protocol::{self, Persistence, StatusBits, StatusRegister, WriteWidth};
use crate::quad::{QeBit, QuadEnableStrategy};

/// Register layout a strategy writes
///
/// A strategy that never writes (an excluded sibling part) leaves nothing
/// to drive and yields [`Error::NoWriteProtectBits`].
pub fn layout_for(strategy: &dyn QuadEnableStrategy) -> Result<QeBit> {
    strategy.qe_bit().ok_or(Error::NoWriteProtectBits)
}

/// Bits a layout can write, excluding BUSY and WEL
pub fn relevant_bits(layout: QeBit) -> StatusBits {
    let span = match layout {
        QeBit::Sr2Bit1 => StatusBits::SR1 | StatusBits::SR2,
        QeBit::Sr1Bit6 => StatusBits::SR1,
    };
    span - StatusBits::TRANSIENT
}

/// Register picture of the negative-control state, the same on both layouts
pub const PROTECTED_PATTERN: StatusBits = StatusBits::SRP0;

/// Register picture of the reclaimed state
pub fn reclaimed_pattern(layout: QeBit) -> StatusBits {
    layout.mask()
}

/// Write SRP1:SRP0 = 0:1 and clear the enable bit
///
/// With 8-bit writes on the SR2 layout the sequence is SR2, SR1, SR2, so
/// SRP1 is already clear when SRP0 gets set.
pub fn force_protected_state<M, P>(
    master: &mut M,
    wp_pin: &mut P,
    layout: QeBit,
    persistence: Persistence,
    width: WriteWidth,
) -> Result<Residual>
where
    M: SpiMaster + ?Sized,
    P: FlashPin + ?Sized,
{
    const ORDER: [StatusRegister; 3] = [
        StatusRegister::Status2,
        StatusRegister::Status1,
        StatusRegister::Status2,
    ];
    apply_pattern(
        master,
        wp_pin,
        layout,
        PROTECTED_PATTERN,
        &ORDER,
        persistence,
        width,
    )
}

/// Zero the protect and block-protect bits and set the enable bit
///
/// With 8-bit writes on the SR2 layout the sequence is SR1, SR2, SR1, so
/// SRP0 is already clear when SRP1 is written.
pub fn clear_protection<M, P>(
    master: &mut M,
    wp_pin: &mut P,
    layout: QeBit,
    persistence: Persistence,
    width: WriteWidth,
) -> Result<Residual>
where
    M: SpiMaster + ?Sized,
    P: FlashPin + ?Sized,
{
    const ORDER: [StatusRegister; 3] = [
        StatusRegister::Status1,
        StatusRegister::Status2,
        StatusRegister::Status1,
    ];
    apply_pattern(
        master,
        wp_pin,
        layout,
        reclaimed_pattern(layout),
        &ORDER,
        persistence,
        width,
    )
}

fn apply_pattern<M, P>(
    master: &mut M,
    wp_pin: &mut P,
    layout: QeBit,
    expected: StatusBits,
    order: &[StatusRegister],
    persistence: Persistence,
    width: WriteWidth,
) -> Result<Residual>
where
    M: SpiMaster + ?Sized,
    P: FlashPin + ?Sized,
{
    // Some parts (EN25Q32C) also leave OTP mode on WRDI
    protocol::write_disable(master)?;

    wp_pin.set_level(Level::High);
    wp_pin.set_mode(PinMode::Output);
    let written = write_pattern(master, layout, expected, order, persistence, width);
    wp_pin.set_mode(PinMode::Function);
    written?;

    let after = protocol::read_status12(master)?;
    let residual = Residual::new((after ^ expected) & relevant_bits(layout));
    if !residual.is_clean() {
        log::debug!(
            "protect pattern 0x{:04X} left residual 0x{:04X}",
            expected.sr12(),
            residual.bits().bits()
        );
    }
    Ok(residual)
}

fn write_pattern<M: SpiMaster + ?Sized>(
    master: &mut M,
    layout: QeBit,
    expected: StatusBits,
    order: &[StatusRegister],
    persistence: Persistence,
    width: WriteWidth,
) -> Result<()> {
    match (layout, width) {
        (QeBit::Sr2Bit1, WriteWidth::Bits16) => {
            write_checked(master, layout, StatusRegister::Status1, expected, persistence, width)
        }
        (QeBit::Sr2Bit1, WriteWidth::Bits8) => {
            for reg in order {
                write_checked(master, layout, *reg, expected, persistence, width)?;
            }
            Ok(())
        }
        // Single status register parts take 8-bit SR1 writes only
        (QeBit::Sr1Bit6, _) => write_checked(
            master,
            layout,
            StatusRegister::Status1,
            expected,
            persistence,
            WriteWidth::Bits8,
        ),
    }
}

/// One write of `expected`'s bits for `reg`, with lock checks on both sides
fn write_checked<M: SpiMaster + ?Sized>(
    master: &mut M,
    layout: QeBit,
    reg: StatusRegister,
    expected: StatusBits,
    persistence: Persistence,
    width: WriteWidth,
) -> Result<()> {
    let (value, coverage) = match width {
        WriteWidth::Bits16 => (expected.sr12(), StatusBits::SR1 | StatusBits::SR2),
        WriteWidth::Bits8 => (
            ((expected.bits() >> reg.shift()) & 0xFF) as u16,
            StatusBits::from_bits_retain(0xFF << reg.shift()),
        ),
    };

    let before = protocol::read_status12(master)?;
    let predicted = (before - coverage) | (expected & coverage);
    if layout.is_locked(predicted) {
        return Err(Error::LockPatternRefused);
    }

    protocol::write_status(master, reg, value, persistence, width)?;

    let after = protocol::read_status12(master)?;
    if layout.is_locked(after) {
        log::error!("status registers read back locked: 0x{:04X}", after.sr12());
        return Err(Error::LockPatternObserved);
    }
    Ok(())
}
