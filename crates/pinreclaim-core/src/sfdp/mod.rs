//! SFDP (Serial Flash Discoverable Parameters) revision reader
//!
//! Two parts that share a vendor byte and device code can sometimes be told
//! apart by the SFDP revision they report. Only the SFDP header, the first
//! parameter header and the raw DWORDs of the first parameter table are
//! read here; nothing is decoded beyond that.
//!
//! ```ignore
//! if let Some(rev) = sfdp::read_revision_info(&mut spi)? {
//!     log::info!("SFDP {} BFPT {} ({} DWORDs)", rev.header, rev.table, rev.length_dwords);
//! }
//! ```

mod reader;
mod types;

pub use reader::*;
pub use types::*;
