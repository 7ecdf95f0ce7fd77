//! `sfdp` command

use pinreclaim_core::gpio::Level;
use pinreclaim_core::sfdp::read_basic_table;
use pinreclaim_dummy::ProfileCatalogue;

use crate::cli::BoardArgs;
use crate::error::CliError;

/// Print the SFDP revision info and the first parameter table
pub fn run_sfdp(catalogue: &ProfileCatalogue, board: &BoardArgs) -> Result<(), CliError> {
    let (mut flash, _pins) = super::open_board(catalogue, board, Level::High)?;

    let (info, table) = read_basic_table(&mut flash)?.ok_or(CliError::NoSfdp)?;
    println!("{}", info);
    for (i, dword) in table.iter().enumerate() {
        println!("  DWORD {:>2}: 0x{:08X}", i + 1, dword);
    }
    Ok(())
}
