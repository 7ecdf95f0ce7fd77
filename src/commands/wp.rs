//! Write protection command implementations

use pinreclaim_core::gpio::Level;
use pinreclaim_core::protocol::{read_status_set, Persistence, WriteWidth};
use pinreclaim_core::wp::{clear_protection, force_protected_state, Residual};
use pinreclaim_dummy::ProfileCatalogue;

use crate::cli::BoardArgs;
use crate::error::CliError;

/// Which pattern to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WpAction {
    /// Protect bits zero, enable bit set
    Clear,
    /// SRP0 set, enable bit clear
    Protect,
}

/// Drive the protect bits into one of the two known patterns
pub fn cmd_wp(
    catalogue: &ProfileCatalogue,
    board: &BoardArgs,
    action: WpAction,
    width: WriteWidth,
    strict: bool,
) -> Result<(), CliError> {
    let (mut flash, mut pins) = super::open_board(catalogue, board, Level::High)?;
    let layout = super::chip_layout(&mut flash)?;

    println!("Before: {}", read_status_set(&mut flash)?);
    let residual: Residual = match action {
        WpAction::Clear => {
            clear_protection(&mut flash, &mut pins.wp, layout, Persistence::Volatile, width)?
        }
        WpAction::Protect => {
            force_protected_state(&mut flash, &mut pins.wp, layout, Persistence::Volatile, width)?
        }
    };
    println!("After:  {}", read_status_set(&mut flash)?);

    if residual.is_clean() {
        println!("All protection bits took their new values.");
    } else {
        println!("Bits that refused to change: {}", residual);
    }

    if strict {
        residual.into_result()?;
    }
    Ok(())
}
