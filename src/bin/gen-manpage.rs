//! Man pages for pinreclaim
//!
//! Writes `pinreclaim.8` for the top-level command and one page per
//! subcommand (`pinreclaim-reclaim.8`, `pinreclaim-wp-clear.8`, ...), the
//! way git-style tools split their manuals.
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::{Command, CommandFactory};
use clap_mangen::Man;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
#[allow(dead_code)]
mod cli;

/// Section 8: the tool rewrites flash status registers on the target board
const SECTION: &str = "8";

fn main() -> io::Result<()> {
    let output_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&output_dir)?;

    let mut cmd = cli::Cli::command();
    // Fills in the `pinreclaim-<sub>` display names used as page titles
    cmd.build();

    let mut written = Vec::new();
    render_tree(&cmd, &output_dir, &mut written)?;

    for path in &written {
        println!("{}", path.display());
    }
    println!("{} pages written to {}", written.len(), output_dir.display());
    Ok(())
}

/// Render `cmd` and every visible subcommand below it
fn render_tree(cmd: &Command, dir: &Path, written: &mut Vec<PathBuf>) -> io::Result<()> {
    let title = cmd.get_display_name().unwrap_or_else(|| cmd.get_name());
    let path = dir.join(format!("{}.{}", title, SECTION));

    let man = Man::new(cmd.clone())
        .section(SECTION)
        .manual("pinreclaim manual")
        .source(concat!("pinreclaim ", env!("CARGO_PKG_VERSION")));
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    fs::write(&path, buffer)?;
    written.push(path);

    for sub in cmd.get_subcommands() {
        if sub.is_hide_set() || sub.get_name() == "help" {
            continue;
        }
        render_tree(sub, dir, written)?;
    }
    Ok(())
}
