//! CLI command implementations
//!
//! Every command builds a fresh emulated board from a chip profile, so
//! nothing carries over between invocations.

mod profiles;
mod reclaim;
mod sfdp;
mod test;
pub mod wp;

pub use profiles::list_profiles;
pub use reclaim::run_reclaim;
pub use sfdp::run_sfdp;
pub use test::{run_test, TestOptions};

use pinreclaim_core::gpio::{FlashPins, Level};
use pinreclaim_core::protocol::{read_chip_id, Persistence, WriteWidth};
use pinreclaim_core::quad::{QeBit, VendorTable};
use pinreclaim_dummy::{BusMode, EmulatedFlash, EmulatedPin, ProfileCatalogue};

use crate::cli::{BoardArgs, PersistenceArg, PullArg, WidthArg};
use crate::error::CliError;

impl From<PersistenceArg> for Persistence {
    fn from(arg: PersistenceArg) -> Self {
        match arg {
            PersistenceArg::Volatile => Persistence::Volatile,
            PersistenceArg::NonVolatile => Persistence::NonVolatile,
        }
    }
}

impl From<WidthArg> for WriteWidth {
    fn from(arg: WidthArg) -> Self {
        match arg {
            WidthArg::Bits8 => WriteWidth::Bits8,
            WidthArg::Bits16 => WriteWidth::Bits16,
        }
    }
}

impl From<PullArg> for Level {
    fn from(arg: PullArg) -> Self {
        match arg {
            PullArg::Low => Level::Low,
            PullArg::High => Level::High,
        }
    }
}

type Board = (EmulatedFlash, FlashPins<EmulatedPin, EmulatedPin>);

/// Power up the board described by `args`
fn open_board(
    catalogue: &ProfileCatalogue,
    args: &BoardArgs,
    hold_pull: Level,
) -> Result<Board, CliError> {
    let mut profile = catalogue
        .find(&args.chip)
        .cloned()
        .ok_or_else(|| CliError::UnknownProfile(args.chip.clone()))?;
    if let Some(id) = args.id {
        profile.id = id;
    }
    if args.quad {
        profile.bus_mode = BusMode::Qio;
    }
    log::debug!("board: {:?}", profile);

    let wp = EmulatedPin::new();
    let hold = EmulatedPin::new().with_pull(hold_pull);
    let mut flash = EmulatedFlash::new(profile);
    flash.attach_pins(&wp, &hold);
    Ok((flash, FlashPins::new(wp, hold)))
}

/// Register layout the built-in table would write on this chip
fn chip_layout(flash: &mut EmulatedFlash) -> Result<QeBit, CliError> {
    let id = read_chip_id(flash)?;
    let entry = VendorTable::new().dispatch(id);
    let layout = pinreclaim_core::wp::layout_for(entry.strategy)?;
    log::info!("{} ({}): {} layout", id, entry.name, layout);
    Ok(layout)
}
