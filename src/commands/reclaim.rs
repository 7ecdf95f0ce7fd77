//! `reclaim` command

use pinreclaim_core::gpio::Level;
use pinreclaim_core::protocol::Persistence;
use pinreclaim_core::quad::default_vendor_cases;
use pinreclaim_core::reclaim::{ReclaimConfig, Reclaimer};
use pinreclaim_dummy::ProfileCatalogue;

use crate::cli::BoardArgs;
use crate::error::CliError;

/// Run the reclaim sequence on an emulated board and print the report
pub fn run_reclaim(
    catalogue: &ProfileCatalogue,
    board: &BoardArgs,
    persistence: Option<Persistence>,
    sfdp: bool,
    hook: bool,
    power_cycle: bool,
) -> Result<(), CliError> {
    let (flash, pins) = super::open_board(catalogue, board, Level::High)?;

    let mut config = ReclaimConfig::new().with_sfdp(sfdp);
    if let Some(persistence) = persistence {
        config = config.with_persistence(persistence);
    }
    if hook {
        config = config.with_hook(default_vendor_cases);
    }

    let mut reclaimer = Reclaimer::new(flash, pins, config);
    let report = reclaimer.run();
    println!("{}", report);
    log::debug!("states: {:?}", report.trace);

    if power_cycle && report.succeeded() {
        let flash = reclaimer.master();
        flash.power_cycle();
        println!(
            "After power cycle: {} (enable bit {})",
            flash.registers(),
            if flash.quad_enabled() { "kept" } else { "lost" }
        );
    }

    match report.failure() {
        Some(reason) => Err(CliError::Reclaim(reason)),
        None => Ok(()),
    }
}
