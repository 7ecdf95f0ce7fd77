//! `test` command

use pinreclaim_core::gpio::{FlashPins, Level};
use pinreclaim_core::harness::{self, HarnessConfig, HoldStage};
use pinreclaim_core::protocol::{Persistence, WriteWidth};
use pinreclaim_core::reclaim::{ReclaimConfig, Reclaimer};
use pinreclaim_core::wp;
use pinreclaim_dummy::ProfileCatalogue;

use crate::cli::BoardArgs;
use crate::error::CliError;

/// What to do before the harness runs, and how it runs
#[derive(Debug, Clone, Copy)]
pub struct TestOptions {
    /// Reclaim the pins first
    pub reclaim: bool,
    /// Force the write-protected state first
    pub protect: bool,
    /// Harness settings
    pub harness: HarnessConfig,
    /// Board pull on `/HOLD`
    pub hold_pull: Level,
}

/// Run the diagnostic harness on an emulated board
pub fn run_test(
    catalogue: &ProfileCatalogue,
    board: &BoardArgs,
    options: TestOptions,
) -> Result<(), CliError> {
    let (mut flash, mut pins) = super::open_board(catalogue, board, options.hold_pull)?;
    let layout = super::chip_layout(&mut flash)?;

    if options.protect {
        let residual = wp::force_protected_state(
            &mut flash,
            &mut pins.wp,
            layout,
            Persistence::Volatile,
            WriteWidth::Bits8,
        )?;
        log::info!("write protection forced on, residual {}", residual);
    } else if options.reclaim {
        let borrowed = FlashPins::new(&mut pins.wp, &mut pins.hold);
        let report = Reclaimer::new(&mut flash, borrowed, ReclaimConfig::new()).run();
        println!("{}", report);
        println!();
    }

    let mut marker = |stage: HoldStage| log::info!("hold test marker: {:?}", stage);
    let report = harness::run(&mut flash, &mut pins, layout, &options.harness, &mut marker)?;
    println!("{}", report);

    if report.passed() {
        println!("All diagnostic tests passed.");
        Ok(())
    } else {
        Err(CliError::TestsFailed)
    }
}
