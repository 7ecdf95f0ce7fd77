//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "pinreclaim")]
#[command(
    author,
    version,
    about = "Free the SPI flash /WP and /HOLD pins on emulated boards",
    long_about = None
)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Extra chip profiles (RON file), added after the built-in ones
    #[arg(long, global = true)]
    pub profile_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Status write persistence
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceArg {
    /// EWSR (0x50), lost on power cycle
    Volatile,
    /// WREN (0x06), kept across power cycles
    NonVolatile,
}

/// Status write width
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthArg {
    /// One register per write
    #[value(name = "8")]
    Bits8,
    /// SR1 and SR2 in one legacy write
    #[value(name = "16")]
    Bits16,
}

/// Level an input settles to
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullArg {
    /// Pulled to ground
    Low,
    /// Pulled to the supply
    High,
}

/// Options shared by every command that builds an emulated board
#[derive(clap::Args, Debug, Clone)]
pub struct BoardArgs {
    /// Chip profile name (see `pinreclaim profiles`)
    #[arg(short, long)]
    pub chip: String,

    /// Override the profile's chip identifier (hex, e.g., 0x1640C8)
    #[arg(long, value_parser = parse_hex_u32)]
    pub id: Option<u32>,

    /// Boot the board in QIO mode
    #[arg(long)]
    pub quad: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List emulated chip profiles
    Profiles,

    /// Run the reclaim sequence
    Reclaim {
        #[command(flatten)]
        board: BoardArgs,

        /// Force one persistence instead of the vendor default
        #[arg(long, value_enum)]
        persistence: Option<PersistenceArg>,

        /// Read SFDP revision info during the bus mode check
        #[arg(long)]
        sfdp: bool,

        /// Negotiate through the vendor-hook entry point instead of the table
        #[arg(long)]
        hook: bool,

        /// Power cycle the chip after reclaiming and report what survived
        #[arg(long)]
        power_cycle: bool,
    },

    /// Run the diagnostic harness
    Test {
        #[command(flatten)]
        board: BoardArgs,

        /// Do not reclaim before testing
        #[arg(long)]
        no_reclaim: bool,

        /// Put the chip in the write-protected state before testing
        #[arg(long, conflicts_with = "no_reclaim")]
        protect: bool,

        /// Milliseconds /HOLD is held LOW before the bus read
        #[arg(long, default_value = "100")]
        grace_ms: u32,

        /// Width of the BP0 toggle writes
        #[arg(long, value_enum, default_value = "8")]
        width: WidthArg,

        /// Persistence of the BP0 toggle writes
        #[arg(long, value_enum, default_value = "volatile")]
        persistence: PersistenceArg,

        /// Board pull on the /HOLD line
        #[arg(long, value_enum, default_value = "low")]
        hold_pull: PullArg,
    },

    /// Read and decode SFDP revision info
    Sfdp {
        #[command(flatten)]
        board: BoardArgs,
    },

    /// Write-protect state operations
    #[command(subcommand)]
    Wp(WpCommands),
}

/// Write-protect subcommands
#[derive(Subcommand)]
pub enum WpCommands {
    /// Clear the protect bits and set the enable bit
    Clear {
        #[command(flatten)]
        board: BoardArgs,

        /// Write width
        #[arg(long, value_enum, default_value = "8")]
        width: WidthArg,

        /// Fail if any bit refuses to change
        #[arg(long)]
        strict: bool,
    },

    /// Set SRP0 and clear the enable bit so /WP is honoured
    Protect {
        #[command(flatten)]
        board: BoardArgs,

        /// Write width
        #[arg(long, value_enum, default_value = "8")]
        width: WidthArg,

        /// Fail if any bit refuses to change
        #[arg(long)]
        strict: bool,
    },
}
