//! pinreclaim - Free the SPI flash /WP and /HOLD pins
//!
//! Host front end for `pinreclaim-core`. The target firmware runs the same
//! engine from its boot hook; here it runs against emulated chips from
//! `pinreclaim-dummy` so vendor behaviour can be explored without hardware.
//!
//! # Commands
//!
//! - `profiles` - list the emulated chips and the strategy each one gets
//! - `reclaim` - run the reclaim state machine and print its report
//! - `test` - run the diagnostic harness (short, `/WP`, `/HOLD`, input)
//! - `sfdp` - read the SFDP header and first parameter table
//! - `wp clear|protect` - drive the protect bits into a known pattern

mod cli;
mod commands;
mod error;

use clap::Parser;
use cli::{Cli, Commands, WpCommands};
use commands::wp::WpAction;
use commands::TestOptions;
use pinreclaim_core::harness::HarnessConfig;
use pinreclaim_dummy::ProfileCatalogue;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let catalogue = match load_catalogue(cli.profile_file.as_deref()) {
        Ok(catalogue) => catalogue,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    log::debug!("{} chip profiles available", catalogue.len());

    let result = match cli.command {
        Commands::Profiles => {
            commands::list_profiles(&catalogue);
            Ok(())
        }
        Commands::Reclaim {
            board,
            persistence,
            sfdp,
            hook,
            power_cycle,
        } => commands::run_reclaim(
            &catalogue,
            &board,
            persistence.map(Into::into),
            sfdp,
            hook,
            power_cycle,
        ),
        Commands::Test {
            board,
            no_reclaim,
            protect,
            grace_ms,
            width,
            persistence,
            hold_pull,
        } => {
            let harness = HarnessConfig::default()
                .with_hold_grace_us(grace_ms.saturating_mul(1000))
                .with_width(width.into())
                .with_persistence(persistence.into());
            let options = TestOptions {
                reclaim: !no_reclaim,
                protect,
                harness,
                hold_pull: hold_pull.into(),
            };
            commands::run_test(&catalogue, &board, options)
        }
        Commands::Sfdp { board } => commands::run_sfdp(&catalogue, &board),
        Commands::Wp(subcmd) => match subcmd {
            WpCommands::Clear {
                board,
                width,
                strict,
            } => commands::wp::cmd_wp(&catalogue, &board, WpAction::Clear, width.into(), strict),
            WpCommands::Protect {
                board,
                width,
                strict,
            } => commands::wp::cmd_wp(&catalogue, &board, WpAction::Protect, width.into(), strict),
        },
    };

    result?;
    Ok(())
}

/// Built-in profiles plus those from `path`
fn load_catalogue(path: Option<&Path>) -> Result<ProfileCatalogue, error::CliError> {
    let mut catalogue = ProfileCatalogue::builtin();
    if let Some(path) = path {
        let count = catalogue.load_file(path)?;
        log::info!("Loaded {} chip profiles from {}", count, path.display());
    }
    Ok(catalogue)
}
