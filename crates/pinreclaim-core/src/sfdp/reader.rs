//! SFDP reads over the status bus

use heapless::Vec;

use crate::bus::SpiMaster;
use crate::error::Result;
use crate::spi::{opcodes, SpiCommand};

use super::types::*;

/// RDSFDP needs 8 dummy clocks after the address
const SFDP_DUMMY_CYCLES: u8 = 8;

/// Read raw SFDP data at `addr`
pub fn read_sfdp<M: SpiMaster + ?Sized>(master: &mut M, addr: u32, buf: &mut [u8]) -> Result<()> {
    let mut cmd =
        SpiCommand::read_3b(opcodes::RDSFDP, addr, buf).with_dummy_cycles(SFDP_DUMMY_CYCLES);
    master.execute(&mut cmd)
}

/// Read the SFDP header and the first parameter header
///
/// Returns `Ok(None)` when the chip has no SFDP signature. A zero table
/// pointer still yields the header fields, with `table_pointer` 0.
pub fn read_revision_info<M: SpiMaster + ?Sized>(master: &mut M) -> Result<Option<SfdpRevInfo>> {
    let mut buf = [0u8; 8];
    read_sfdp(master, 0x00, &mut buf)?;
    let header = SfdpHeader::parse(&buf);
    if !header.is_valid() {
        log::debug!("SFDP signature missing (read 0x{:08X})", header.signature);
        return Ok(None);
    }

    read_sfdp(master, 0x08, &mut buf)?;
    let param = ParameterHeader::parse(&buf);
    if param.table_pointer == 0 {
        log::debug!("SFDP first parameter header has no table pointer");
    } else if !param.is_basic() {
        log::debug!("SFDP first parameter table is 0x{:04X}, not BFPT", param.id);
    }

    let info = SfdpRevInfo::new(&header, &param);
    log::debug!("{}", info);
    Ok(Some(info))
}

/// Read the DWORDs of the first parameter table
///
/// Tables longer than [`MAX_BASIC_TABLE_DWORDS`] are truncated. Returns
/// `Ok(None)` when there is no SFDP or the table pointer is zero.
pub fn read_basic_table<M: SpiMaster + ?Sized>(
    master: &mut M,
) -> Result<Option<(SfdpRevInfo, Vec<u32, MAX_BASIC_TABLE_DWORDS>)>> {
    let Some(info) = read_revision_info(master)? else {
        return Ok(None);
    };
    if !info.has_table() {
        return Ok(None);
    }

    let count = (info.length_dwords as usize).min(MAX_BASIC_TABLE_DWORDS);
    let mut dwords = Vec::new();
    let mut word = [0u8; 4];
    for i in 0..count {
        read_sfdp(master, info.table_pointer + (i as u32) * 4, &mut word)?;
        // count is bounded by the capacity
        let _ = dwords.push(u32::from_le_bytes(word));
    }
    Ok(Some((info, dwords)))
}
