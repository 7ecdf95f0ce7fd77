//! Emulated flash chip

use alloc::vec::Vec;

use pinreclaim_core::bus::SpiMaster;
use pinreclaim_core::error::{Error, Result};
use pinreclaim_core::gpio::{FlashPins, Level};
use pinreclaim_core::protocol::{Persistence, StatusRegisterSet};
use pinreclaim_core::spi::{opcodes, FlashMode, SpiCommand};

use crate::pin::EmulatedPin;
use crate::profile::{ChipProfile, QeLayout};

/// SFDP area served by parts that have one: header, one parameter header
/// and a four DWORD basic table at 0x30
const SFDP_TABLE: [u8; 0x40] = {
    let mut d = [0xFFu8; 0x40];
    let header = [0x53, 0x46, 0x44, 0x50, 0x06, 0x01, 0x00, 0xFF];
    let param = [0x00, 0x06, 0x01, 0x04, 0x30, 0x00, 0x00, 0xFF];
    let table = [
        0xE5, 0x20, 0xF1, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x44, 0xEB, 0x08, 0x6B, 0x08, 0x3B,
        0x42, 0xBB,
    ];
    let mut i = 0;
    while i < 8 {
        d[i] = header[i];
        d[0x08 + i] = param[i];
        i += 1;
    }
    let mut i = 0;
    while i < 16 {
        d[0x30 + i] = table[i];
        i += 1;
    }
    d
};

/// One status register write as the chip received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusWrite {
    /// WRSR, WRSR2 or WRSR3
    pub opcode: u8,
    /// Data bytes
    pub data: Vec<u8>,
    /// The chip executed the write
    pub accepted: bool,
}

/// In-memory flash chip with status register quirks
///
/// Reads return the volatile copy of each register. A volatile write
/// (after EWSR) changes only that copy; a non-volatile write (after WREN)
/// changes both. [`power_cycle`](Self::power_cycle) reloads the volatile
/// copy from the non-volatile one.
#[derive(Debug)]
pub struct EmulatedFlash {
    profile: ChipProfile,
    nv: [u8; 3],
    vol: [u8; 3],
    latch: Option<Persistence>,
    busy_polls: u32,
    wp: Option<EmulatedPin>,
    hold: Option<EmulatedPin>,
    lock_seen: bool,
    writes: Vec<StatusWrite>,
    elapsed_us: u64,
}

impl EmulatedFlash {
    /// Power up a chip described by `profile`
    pub fn new(profile: ChipProfile) -> Self {
        let mut nv = profile.status;
        nv[0] &= !(opcodes::SR1_WIP | opcodes::SR1_WEL);
        let latch = profile.stale_wel.then_some(Persistence::NonVolatile);
        let mut flash = Self {
            profile,
            nv,
            vol: nv,
            latch,
            busy_polls: 0,
            wp: None,
            hold: None,
            lock_seen: false,
            writes: Vec::new(),
            elapsed_us: 0,
        };
        flash.mask_absent();
        flash
    }

    /// A chip wired to fresh `/WP` and `/HOLD` pads
    pub fn board(profile: ChipProfile) -> (Self, FlashPins<EmulatedPin, EmulatedPin>) {
        let pins = FlashPins::new(EmulatedPin::new(), EmulatedPin::new());
        let mut flash = Self::new(profile);
        flash.attach_pins(&pins.wp, &pins.hold);
        (flash, pins)
    }

    /// Let the chip watch these pads
    pub fn attach_pins(&mut self, wp: &EmulatedPin, hold: &EmulatedPin) {
        self.wp = Some(wp.clone());
        self.hold = Some(hold.clone());
    }

    /// Profile the chip was built from
    pub fn profile(&self) -> &ChipProfile {
        &self.profile
    }

    /// Current (volatile) register values, without BUSY and WEL
    pub fn registers(&self) -> StatusRegisterSet {
        StatusRegisterSet::new(self.vol[0], self.vol[1], self.vol[2])
    }

    /// Register values that survive a power cycle
    pub fn nv_registers(&self) -> StatusRegisterSet {
        StatusRegisterSet::new(self.nv[0], self.nv[1], self.nv[2])
    }

    /// Overwrite the current register values, bypassing every check
    pub fn set_registers(&mut self, regs: StatusRegisterSet) {
        self.vol = [regs.sr1 & !(opcodes::SR1_WIP | opcodes::SR1_WEL), regs.sr2, regs.sr3];
        self.mask_absent();
    }

    /// True while WEL is set
    pub fn write_latch(&self) -> bool {
        self.latch.is_some()
    }

    /// Every status write received, oldest first
    pub fn status_writes(&self) -> &[StatusWrite] {
        &self.writes
    }

    /// True if SRP1:SRP0 = 1:1 was ever stored
    pub fn lock_seen(&self) -> bool {
        self.lock_seen
    }

    /// Sum of all delays requested by the host
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }

    /// True when the enable bit is set in the current registers
    pub fn quad_enabled(&self) -> bool {
        match self.profile.layout {
            QeLayout::Sr2Bit1 => self.vol[1] & opcodes::SR2_QE != 0,
            QeLayout::Sr1Bit6 => self.vol[0] & opcodes::SR1_S6 != 0,
            QeLayout::Absent => false,
        }
    }

    /// Drop power and bring the chip back up
    pub fn power_cycle(&mut self) {
        log::debug!("{}: power cycle", self.profile.name);
        self.vol = self.nv;
        self.latch = None;
        self.busy_polls = 0;
    }

    fn mask_absent(&mut self) {
        for i in self.profile.registers as usize..3 {
            self.vol[i] = 0;
            self.nv[i] = 0;
        }
        if self.profile.layout == QeLayout::Absent {
            self.vol[0] &= !opcodes::SR1_S6;
            self.nv[0] &= !opcodes::SR1_S6;
        }
    }

    fn line_low(pin: &Option<EmulatedPin>) -> bool {
        pin.as_ref().is_some_and(|p| p.line_level() == Level::Low)
    }

    /// `/HOLD` LOW suspends the chip unless IO3 is in data mode
    fn suspended(&self) -> bool {
        let mode: FlashMode = self.profile.bus_mode.into();
        !mode.is_quad() && !self.quad_enabled() && Self::line_low(&self.hold)
    }

    fn hardware_protected(&self) -> bool {
        let srp0 = self.vol[0] & opcodes::SR1_SRP0 != 0;
        let srp1 = self.profile.layout == QeLayout::Sr2Bit1 && self.vol[1] & opcodes::SR2_SRP1 != 0;
        srp0 && !srp1 && !self.quad_enabled() && Self::line_low(&self.wp)
    }

    fn read_register(&mut self, index: usize) -> u8 {
        let mut value = self.vol[index];
        if index == 0 {
            if self.latch.is_some() {
                value |= opcodes::SR1_WEL;
            }
            if self.busy_polls > 0 {
                self.busy_polls -= 1;
                value |= opcodes::SR1_WIP;
            }
        }
        value
    }

    fn write_status(&mut self, opcode: u8, data: &[u8]) {
        let accepted = self.try_write(opcode, data);
        self.writes.push(StatusWrite {
            opcode,
            data: data.to_vec(),
            accepted,
        });
    }

    fn try_write(&mut self, opcode: u8, data: &[u8]) -> bool {
        let name = &self.profile.name;
        let Some(persistence) = self.latch else {
            log::trace!("{}: status write 0x{:02X} without WEL ignored", name, opcode);
            return false;
        };
        if !self.profile.writes.accepts(opcode, data.len()) {
            log::debug!(
                "{}: {}-byte write 0x{:02X} not supported, ignored",
                name,
                data.len(),
                opcode
            );
            return false;
        }
        if persistence == Persistence::Volatile && !self.profile.volatile_writes {
            log::debug!("{}: no volatile status bits, write ignored", name);
            return false;
        }
        if self.lock_seen {
            log::debug!("{}: status registers locked", name);
            return false;
        }
        if self.hardware_protected() {
            log::debug!("{}: /WP LOW with SRP0 set, write ignored", name);
            return false;
        }

        let first = match opcode {
            opcodes::WRSR => 0,
            opcodes::WRSR2 => 1,
            _ => 2,
        };
        for (offset, &byte) in data.iter().enumerate() {
            let index = first + offset;
            if index >= self.profile.registers as usize {
                continue;
            }
            let byte = if index == 0 {
                byte & !(opcodes::SR1_WIP | opcodes::SR1_WEL)
            } else {
                byte
            };
            self.vol[index] = byte;
            if persistence == Persistence::NonVolatile {
                self.nv[index] = byte;
            }
        }
        if opcode == opcodes::WRSR2 && self.profile.sr3_cleared_by_sr2_write {
            log::debug!("{}: SR2 write cleared SR3", self.profile.name);
            self.vol[2] = 0;
            if persistence == Persistence::NonVolatile {
                self.nv[2] = 0;
            }
        }
        self.mask_absent();

        if self.profile.layout == QeLayout::Sr2Bit1
            && self.vol[0] & opcodes::SR1_SRP0 != 0
            && self.vol[1] & opcodes::SR2_SRP1 != 0
        {
            log::error!("{}: SRP1:SRP0 = 1:1 stored", self.profile.name);
            self.lock_seen = true;
        }

        self.latch = None;
        self.busy_polls = self.profile.write_cycle_polls;
        true
    }

    fn read_sfdp(&self, cmd: &mut SpiCommand<'_>) {
        let addr = cmd.address.unwrap_or(0) as usize;
        for (i, byte) in cmd.read_buf.iter_mut().enumerate() {
            *byte = if self.profile.sfdp {
                SFDP_TABLE.get(addr + i).copied().unwrap_or(0xFF)
            } else {
                0xFF
            };
        }
    }
}

impl SpiMaster for EmulatedFlash {
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        if self.suspended() {
            return Err(Error::SpiTimeout);
        }

        match cmd.opcode {
            opcodes::RDID => {
                let id = self.profile.id.to_le_bytes();
                let len = cmd.read_buf.len().min(3);
                cmd.read_buf[..len].copy_from_slice(&id[..len]);
            }
            opcodes::RDSR | opcodes::RDSR2 | opcodes::RDSR3 => {
                let index = match cmd.opcode {
                    opcodes::RDSR => 0,
                    opcodes::RDSR2 => 1,
                    _ => 2,
                };
                if !cmd.read_buf.is_empty() {
                    cmd.read_buf[0] = self.read_register(index);
                }
            }
            opcodes::WREN => self.latch = Some(Persistence::NonVolatile),
            opcodes::EWSR => self.latch = Some(Persistence::Volatile),
            opcodes::WRDI => self.latch = None,
            opcodes::WRSR | opcodes::WRSR2 | opcodes::WRSR3 => {
                self.write_status(cmd.opcode, cmd.write_data)
            }
            opcodes::RDSFDP => self.read_sfdp(cmd),
            _ => return Err(Error::OpcodeNotSupported),
        }
        Ok(())
    }

    fn flash_mode(&self) -> FlashMode {
        self.profile.bus_mode.into()
    }

    fn delay_us(&mut self, us: u32) {
        self.elapsed_us += us as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinreclaim_core::gpio::{FlashPin, PinMode};
    use pinreclaim_core::protocol::{self, StatusRegister, WriteWidth};

    use crate::profile::WriteForms;

    #[test]
    fn test_read_id() {
        let mut flash = EmulatedFlash::new(ChipProfile::new("gd", 0x1640C8));
        let id = protocol::read_chip_id(&mut flash).unwrap();
        assert_eq!(id.raw(), 0x1640C8);
        assert_eq!(id.vendor(), 0xC8);
    }

    #[test]
    fn test_volatile_write_lost_on_power_cycle() {
        let mut flash = EmulatedFlash::new(ChipProfile::new("w", 0x1640EF));
        protocol::write_status(
            &mut flash,
            StatusRegister::Status2,
            0x02,
            Persistence::Volatile,
            WriteWidth::Bits8,
        )
        .unwrap();
        assert_eq!(flash.registers().sr2, 0x02);
        assert_eq!(flash.nv_registers().sr2, 0x00);

        flash.power_cycle();
        assert_eq!(flash.registers().sr2, 0x00);
    }

    #[test]
    fn test_nonvolatile_write_persists() {
        let mut flash = EmulatedFlash::new(ChipProfile::new("w", 0x1640EF));
        protocol::write_status(
            &mut flash,
            StatusRegister::Status2,
            0x02,
            Persistence::NonVolatile,
            WriteWidth::Bits8,
        )
        .unwrap();
        flash.power_cycle();
        assert_eq!(flash.registers().sr2, 0x02);
    }

    #[test]
    fn test_rejected_write_leaves_latch() {
        let profile = ChipProfile {
            writes: WriteForms::NONE,
            ..ChipProfile::new("stubborn", 0x164085)
        };
        let mut flash = EmulatedFlash::new(profile);
        protocol::write_enable(&mut flash, Persistence::Volatile).unwrap();
        let mut cmd = SpiCommand::write_reg(opcodes::WRSR2, &[0x02]);
        flash.execute(&mut cmd).unwrap();

        assert!(flash.write_latch());
        assert!(!flash.status_writes()[0].accepted);
        assert!(protocol::is_write_latch_set(&mut flash).unwrap());
    }

    #[test]
    fn test_busy_after_write() {
        let profile = ChipProfile {
            write_cycle_polls: 3,
            ..ChipProfile::new("slow", 0x1640EF)
        };
        let mut flash = EmulatedFlash::new(profile);
        protocol::write_status(
            &mut flash,
            StatusRegister::Status1,
            0x04,
            Persistence::Volatile,
            WriteWidth::Bits8,
        )
        .unwrap();
        assert!(!protocol::is_busy(&mut flash).unwrap());
        assert_eq!(flash.elapsed_us(), 3 * protocol::BUSY_POLL_US as u64);
    }

    #[test]
    fn test_hold_low_suspends_bus() {
        let (mut flash, mut pins) = EmulatedFlash::board(ChipProfile::new("w", 0x1640EF));
        pins.hold.set_level(Level::Low);
        pins.hold.set_mode(PinMode::Output);
        assert_eq!(
            protocol::read_status(&mut flash, StatusRegister::Status1),
            Err(Error::SpiTimeout)
        );

        flash.set_registers(StatusRegisterSet::new(0x00, 0x02, 0x60));
        assert!(protocol::read_status(&mut flash, StatusRegister::Status1).is_ok());
    }

    #[test]
    fn test_wp_low_blocks_protected_write() {
        let (mut flash, mut pins) = EmulatedFlash::board(ChipProfile::new("w", 0x1640EF));
        flash.set_registers(StatusRegisterSet::new(0x80, 0x00, 0x60));
        pins.wp.set_level(Level::Low);
        pins.wp.set_mode(PinMode::Output);

        protocol::write_status(
            &mut flash,
            StatusRegister::Status1,
            0x84,
            Persistence::Volatile,
            WriteWidth::Bits8,
        )
        .unwrap();
        assert_eq!(flash.registers().sr1, 0x80);
        assert!(!flash.write_latch());
    }

    #[test]
    fn test_sr2_write_clears_sr3() {
        let profile = ChipProfile {
            sr3_cleared_by_sr2_write: true,
            ..ChipProfile::new("xmc", 0x164020)
        };
        let mut flash = EmulatedFlash::new(profile);
        protocol::write_status(
            &mut flash,
            StatusRegister::Status2,
            0x02,
            Persistence::Volatile,
            WriteWidth::Bits8,
        )
        .unwrap();
        assert_eq!(flash.registers(), StatusRegisterSet::new(0x00, 0x02, 0x00));
    }

    #[test]
    fn test_sfdp_absent() {
        let profile = ChipProfile {
            sfdp: false,
            ..ChipProfile::new("old", 0x1640EF)
        };
        let mut flash = EmulatedFlash::new(profile);
        assert_eq!(pinreclaim_core::sfdp::read_revision_info(&mut flash), Ok(None));

        let mut flash = EmulatedFlash::new(ChipProfile::new("new", 0x1640EF));
        let info = pinreclaim_core::sfdp::read_revision_info(&mut flash)
            .unwrap()
            .unwrap();
        assert_eq!(info.table_pointer, 0x30);
    }
}
