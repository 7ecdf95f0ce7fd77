//! The reclaim state machine

use crate::bus::SpiMaster;
use crate::error::{Error, Result};
use crate::gpio::{FlashPin, FlashPins, PinMode};
use crate::protocol::{
    is_write_latch_set, read_chip_id, read_status_set, write_disable, write_status, Persistence,
    StatusRegister, StatusRegisterSet, WriteWidth,
};
use crate::sfdp::read_revision_info;

use super::{FailureReason, ReclaimConfig, ReclaimReport, ReclaimState};

/// Drives one chip and its two pins through the reclaim sequence
pub struct Reclaimer<M, W, H> {
    master: M,
    pins: FlashPins<W, H>,
    config: ReclaimConfig,
}

impl<M: SpiMaster, W: FlashPin, H: FlashPin> Reclaimer<M, W, H> {
    /// Create a reclaimer; nothing is sent until [`run`](Self::run)
    pub fn new(master: M, pins: FlashPins<W, H>, config: ReclaimConfig) -> Self {
        Self {
            master,
            pins,
            config,
        }
    }

    /// Settings in use
    pub fn config(&self) -> &ReclaimConfig {
        &self.config
    }

    /// The bus
    pub fn master(&mut self) -> &mut M {
        &mut self.master
    }

    /// The pins
    pub fn pins(&mut self) -> &mut FlashPins<W, H> {
        &mut self.pins
    }

    /// Give back the bus and the pins
    pub fn into_parts(self) -> (M, FlashPins<W, H>) {
        (self.master, self.pins)
    }

    /// Run the sequence and return true when both pins were handed over
    pub fn reclaim(&mut self) -> bool {
        self.run().succeeded()
    }

    /// Run the sequence from [`ReclaimState::Start`]
    ///
    /// Failures are reported in the returned report rather than as an
    /// error. The pins are only switched to inputs on success; on failure
    /// they are left as they were.
    pub fn run(&mut self) -> ReclaimReport {
        let mut report = ReclaimReport::new();
        let terminal = match self.drive(&mut report) {
            Ok(()) => ReclaimState::Done,
            Err(reason) => {
                log::warn!("reclaim failed in {:?}: {}", report.final_state, reason);
                ReclaimState::Failed(reason)
            }
        };
        report.enter(terminal);
        diag!("{}", report);
        report
    }

    fn drive(&mut self, report: &mut ReclaimReport) -> core::result::Result<(), FailureReason> {
        report.enter(ReclaimState::DetectId);
        let id = read_chip_id(&mut self.master).map_err(FailureReason::Bus)?;
        report.chip_id = Some(id);
        diag!("Flash Chip ID: {}", id);
        if !id.is_valid() {
            return Err(FailureReason::ChipNotFound);
        }

        report.enter(ReclaimState::CheckBusMode);
        let mode = self.master.flash_mode();
        if mode.is_quad() {
            log::info!("flash bus in {} mode, /WP and /HOLD carry data", mode);
            return Err(FailureReason::UnsupportedBusMode);
        }
        if self.config.read_sfdp {
            match read_revision_info(&mut self.master) {
                Ok(info) => report.sfdp = info,
                Err(e) => log::warn!("SFDP read failed: {}", e),
            }
        }

        report.enter(ReclaimState::ClearStaleLatchIfSet);
        if is_write_latch_set(&mut self.master).map_err(FailureReason::Bus)? {
            diag!("  WEL left set, sending WRDI");
            write_disable(&mut self.master).map_err(FailureReason::Bus)?;
            report.stale_latch_cleared = true;
        }

        report.enter(ReclaimState::VendorDispatch);
        let entry = match self.config.hook {
            Some(_) => {
                report.vendor = Some("hook");
                None
            }
            None => {
                let entry = self.config.table.dispatch(id);
                report.vendor = Some(entry.name);
                report.strategy = Some(entry.kind());
                Some(entry)
            }
        };
        // A hook's writes are rolled back in the configured persistence
        let persistence = self
            .config
            .persistence
            .or(entry.map(|e| e.persistence))
            .unwrap_or_default();

        report.enter(ReclaimState::NegotiateEnableBit);
        let before = read_status_set(&mut self.master).map_err(FailureReason::Bus)?;
        diag!("  before: {}", before);

        let negotiated = match (entry, self.config.hook) {
            (Some(entry), _) => match entry.negotiate(&mut self.master, self.config.persistence) {
                Ok(outcome) => {
                    report.outcome = Some(outcome);
                    if outcome.success {
                        Ok(())
                    } else {
                        Err(FailureReason::NegotiationFailed)
                    }
                }
                Err(e @ (Error::SpiTransferFailed | Error::SpiTimeout)) => {
                    Err(FailureReason::Bus(e))
                }
                Err(e) => {
                    log::warn!("{}: {}", entry.name, e);
                    Err(FailureReason::NegotiationFailed)
                }
            },
            (None, Some(hook)) => {
                if hook(&mut self.master, id.raw()) {
                    Ok(())
                } else {
                    Err(FailureReason::HookDeclined)
                }
            }
            (None, None) => Err(FailureReason::NegotiationFailed),
        };

        if let Err(reason) = negotiated {
            report.rolled_back = self.rollback(before, persistence);
            return Err(reason);
        }

        report.enter(ReclaimState::FinalizeWriteDisable);
        if let Err(e) = write_disable(&mut self.master) {
            report.rolled_back = self.rollback(before, persistence);
            return Err(FailureReason::Bus(e));
        }

        report.enter(ReclaimState::HandoffPins);
        self.pins.set_mode(PinMode::Input);
        diag!("  GPIO9 and GPIO10 switched to inputs");
        Ok(())
    }

    /// Write back any status register that differs from `before`
    ///
    /// Returns true when something was written and the registers now match.
    /// Failures are logged; there is nothing further to fall back to.
    pub fn rollback(&mut self, before: StatusRegisterSet, persistence: Persistence) -> bool {
        match restore_registers(&mut self.master, before, persistence) {
            Ok(changed) => changed,
            Err(e) => {
                log::warn!("could not restore status registers to {}: {}", before, e);
                false
            }
        }
    }
}

const REGISTERS: [StatusRegister; 3] = [
    StatusRegister::Status1,
    StatusRegister::Status2,
    StatusRegister::Status3,
];

fn stable(set: StatusRegisterSet) -> StatusRegisterSet {
    StatusRegisterSet {
        sr1: set.sr1 & !(crate::spi::opcodes::SR1_WIP | crate::spi::opcodes::SR1_WEL),
        ..set
    }
}

fn restore_registers<M: SpiMaster + ?Sized>(
    master: &mut M,
    before: StatusRegisterSet,
    persistence: Persistence,
) -> Result<bool> {
    let before = stable(before);
    let after = stable(read_status_set(master)?);
    if after == before {
        return Ok(false);
    }

    for reg in REGISTERS {
        if after.get(reg) != before.get(reg) {
            log::debug!(
                "restore {} 0x{:02X} -> 0x{:02X}",
                reg,
                after.get(reg),
                before.get(reg)
            );
            write_status(master, reg, before.get(reg) as u16, persistence, WriteWidth::Bits8)?;
        }
    }

    let mut now = stable(read_status_set(master)?);
    if now.sr1 != before.sr1 || now.sr2 != before.sr2 {
        // Chips without per-register writes take SR1 and SR2 together
        let value = u16::from_le_bytes([before.sr1, before.sr2]);
        write_status(master, StatusRegister::Status1, value, persistence, WriteWidth::Bits16)?;
        now = stable(read_status_set(master)?);
    }

    if now == before {
        Ok(true)
    } else {
        Err(Error::VerifyFailed)
    }
}
