//! End-to-end runs of the reclaim engine against the emulated catalogue

use alloc::vec::Vec;

use pinreclaim_core::boot;
use pinreclaim_core::bus::SpiMaster;
use pinreclaim_core::gpio::{FlashPin, FlashPins, Level, PinMode};
use pinreclaim_core::harness::{self, HarnessConfig, HoldStage, HoldVerdict, OutputVerdict};
use pinreclaim_core::protocol::{write_status, Persistence, StatusRegister, WriteWidth};
use pinreclaim_core::quad::{
    attempt_set_quad_enable, QeBit, Sr2Write8, VendorStrategy, VendorTable,
};
use pinreclaim_core::reclaim::{FailureReason, ReclaimConfig, ReclaimState, Reclaimer};
use pinreclaim_core::spi::{opcodes, FlashMode, SpiCommand};
use pinreclaim_core::wp;
use pinreclaim_core::Error;

use crate::{EmulatedFlash, EmulatedPin, ProfileCatalogue, QeLayout};

fn board(name: &str) -> (EmulatedFlash, FlashPins<EmulatedPin, EmulatedPin>) {
    let profile = ProfileCatalogue::builtin()
        .find(name)
        .cloned()
        .unwrap_or_else(|| panic!("no profile {}", name));
    EmulatedFlash::board(profile)
}

fn accepted_writes(flash: &EmulatedFlash) -> usize {
    flash.status_writes().iter().filter(|w| w.accepted).count()
}

fn reclaim(name: &str, config: ReclaimConfig) -> (bool, EmulatedFlash, FlashPins<EmulatedPin, EmulatedPin>) {
    let (flash, pins) = board(name);
    let mut reclaimer = Reclaimer::new(flash, pins, config);
    let ok = reclaimer.reclaim();
    let (flash, pins) = reclaimer.into_parts();
    (ok, flash, pins)
}

#[test]
fn test_gigadevice_single_volatile_write() {
    let (ok, flash, pins) = reclaim("gd25q32", ReclaimConfig::new());
    assert!(ok);
    assert!(flash.quad_enabled());
    assert_eq!(accepted_writes(&flash), 1);
    assert_eq!(flash.status_writes()[0].opcode, opcodes::WRSR2);
    assert!(!flash.write_latch());
    assert_eq!(flash.nv_registers().sr2, 0x00);
    assert_eq!(pins.modes(), (PinMode::Input, PinMode::Input));
}

#[test]
fn test_d8_part_uses_8bit_writes() {
    let (ok, flash, _) = reclaim("d8-gd25q32", ReclaimConfig::new());
    assert!(ok);
    assert!(flash.status_writes().iter().all(|w| w.data.len() == 1));
}

#[test]
fn test_legacy_part_takes_16bit_write() {
    let (ok, flash, _) = reclaim("w25q32-legacy", ReclaimConfig::new());
    assert!(ok);
    let first = &flash.status_writes()[0];
    assert_eq!((first.opcode, first.data.len(), first.accepted), (opcodes::WRSR, 2, true));
    assert_eq!(flash.status_writes().len(), 1);
}

#[test]
fn test_xmc_keeps_sr3() {
    let (flash, pins) = board("xm25qh32");
    assert_eq!(flash.registers().sr3, 0x60);

    let mut reclaimer = Reclaimer::new(flash, pins, ReclaimConfig::new());
    let report = reclaimer.run();
    assert!(report.succeeded());
    assert_eq!(report.strategy, Some(VendorStrategy::Sr2PreserveSr3));

    let (flash, _) = reclaimer.into_parts();
    assert!(flash.quad_enabled());
    assert_eq!(flash.registers().sr3, 0x60);
    assert!(flash
        .status_writes()
        .iter()
        .any(|w| w.opcode == opcodes::WRSR3 && w.accepted));
}

#[test]
fn test_eon_wpdis() {
    let (ok, flash, _) = reclaim("en25q32c", ReclaimConfig::new());
    assert!(ok);
    assert_eq!(flash.registers().sr1 & opcodes::SR1_S6, opcodes::SR1_S6);
}

#[test]
fn test_eon_sibling_excluded() {
    let (flash, pins) = board("en25q32");
    let mut reclaimer = Reclaimer::new(flash, pins, ReclaimConfig::new());
    let report = reclaimer.run();

    assert_eq!(report.failure(), Some(FailureReason::NegotiationFailed));
    assert_eq!(report.strategy, Some(VendorStrategy::MaskedId { accepted: false }));
    let (flash, pins) = reclaimer.into_parts();
    assert!(flash.status_writes().is_empty());
    assert!(pins.wp.modes_seen().is_empty());
    assert!(pins.hold.modes_seen().is_empty());
}

#[test]
fn test_macronix_nonvolatile() {
    let (ok, mut flash, _) = reclaim("mx25l3233f", ReclaimConfig::new());
    assert!(ok);
    flash.power_cycle();
    assert!(flash.quad_enabled());
}

#[test]
fn test_macronix_refuses_volatile() {
    let config = ReclaimConfig::new().with_persistence(Persistence::Volatile);
    let (ok, flash, _) = reclaim("mx25l3233f", config);
    assert!(!ok);
    assert!(!flash.quad_enabled());
    assert_eq!(accepted_writes(&flash), 0);
}

#[test]
fn test_quad_board_no_writes() {
    let (ok, flash, pins) = reclaim("qio-board", ReclaimConfig::new());
    assert!(!ok);
    assert!(flash.status_writes().is_empty());
    assert_eq!(pins.modes(), (PinMode::Function, PinMode::Function));
}

#[test]
fn test_unknown_vendor_rejecting_everything() {
    let (ok, flash, pins) = reclaim("stubborn", ReclaimConfig::new());
    assert!(!ok);

    let attempts: Vec<(u8, usize)> = flash
        .status_writes()
        .iter()
        .map(|w| (w.opcode, w.data.len()))
        .collect();
    assert_eq!(attempts, [(opcodes::WRSR, 2), (opcodes::WRSR2, 1)]);
    assert!(!flash.write_latch());
    assert!(pins.wp.modes_seen().is_empty());
    assert!(pins.hold.modes_seen().is_empty());
}

#[test]
fn test_stale_latch_reported() {
    let (flash, pins) = board("w25q32-stale-wel");
    assert!(flash.write_latch());
    let mut reclaimer = Reclaimer::new(flash, pins, ReclaimConfig::new());
    let report = reclaimer.run();
    assert!(report.succeeded());
    assert!(report.stale_latch_cleared);
}

#[test]
fn test_sfdp_in_report() {
    let (flash, pins) = board("gd25q32");
    let mut reclaimer = Reclaimer::new(flash, pins, ReclaimConfig::new().with_sfdp(true));
    let report = reclaimer.run();
    let sfdp = report.sfdp.unwrap();
    assert_eq!((sfdp.header.major, sfdp.header.minor), (1, 6));
    assert_eq!(sfdp.length_dwords, 4);
}

#[test]
fn test_negotiation_idempotent() {
    let (mut flash, _pins) = board("gd25q32");
    let first = attempt_set_quad_enable(&mut flash, &Sr2Write8, Persistence::Volatile).unwrap();
    let writes = flash.status_writes().len();
    let second = attempt_set_quad_enable(&mut flash, &Sr2Write8, Persistence::Volatile).unwrap();

    assert!(first.success && second.success);
    assert_eq!(first.final_bits, second.final_bits);
    assert_eq!(flash.status_writes().len(), writes);
}

#[test]
fn test_reclaim_again_after_power_cycle() {
    let (flash, pins) = board("gd25q32");
    let mut reclaimer = Reclaimer::new(flash, pins, ReclaimConfig::new());
    assert!(reclaimer.reclaim());

    reclaimer.master().power_cycle();
    assert!(!reclaimer.master().quad_enabled());
    assert!(reclaimer.reclaim());
    assert!(reclaimer.master().quad_enabled());
}

#[test]
fn test_never_locks() {
    let catalogue = ProfileCatalogue::builtin();
    for profile in catalogue.iter() {
        let (flash, pins) = EmulatedFlash::board(profile.clone());
        let mut reclaimer = Reclaimer::new(flash, pins, ReclaimConfig::new());
        reclaimer.reclaim();
        let (mut flash, mut pins) = reclaimer.into_parts();

        let entry = VendorTable::new().dispatch(profile.chip_id());
        let layout = match (wp::layout_for(entry.strategy), profile.layout) {
            (Ok(layout), _) => layout,
            (Err(_), QeLayout::Sr1Bit6) => QeBit::Sr1Bit6,
            (Err(_), _) => QeBit::Sr2Bit1,
        };

        let mut marker = |_stage: HoldStage| {};
        for width in [WriteWidth::Bits8, WriteWidth::Bits16] {
            let config = HarnessConfig::default().with_width(width);
            let _ = harness::run(&mut flash, &mut pins, layout, &config, &mut marker);
            let _ = wp::force_protected_state(
                &mut flash,
                &mut pins.wp,
                layout,
                Persistence::Volatile,
                width,
            );
            let _ = wp::clear_protection(
                &mut flash,
                &mut pins.wp,
                layout,
                Persistence::Volatile,
                width,
            );
            assert!(!flash.lock_seen(), "{} ({}, {:?})", profile.name, layout, width);
        }
    }
}

#[test]
fn test_sr1_layout_profiles_use_bit6() {
    let catalogue = ProfileCatalogue::builtin();
    let sr1_parts: Vec<_> = catalogue
        .iter()
        .filter(|p| p.layout == QeLayout::Sr1Bit6)
        .filter_map(|p| wp::layout_for(VendorTable::new().dispatch(p.chip_id()).strategy).ok())
        .collect();
    assert!(!sr1_parts.is_empty());
    assert!(sr1_parts.iter().all(|&layout| layout == QeBit::Sr1Bit6));
}

#[test]
fn test_protection_round_trip() {
    for (name, width) in [("gd25q32", WriteWidth::Bits8), ("w25q32-legacy", WriteWidth::Bits16)] {
        let (mut flash, mut pins) = board(name);
        let layout = QeBit::Sr2Bit1;
        let p = Persistence::Volatile;

        assert!(wp::clear_protection(&mut flash, &mut pins.wp, layout, p, width)
            .unwrap()
            .is_clean());
        assert!(wp::force_protected_state(&mut flash, &mut pins.wp, layout, p, width)
            .unwrap()
            .is_clean());
        assert_eq!(flash.registers().sr1 & opcodes::SR1_SRP0, opcodes::SR1_SRP0);
        assert!(!flash.quad_enabled());

        assert!(wp::clear_protection(&mut flash, &mut pins.wp, layout, p, width)
            .unwrap()
            .is_clean());
        let regs = flash.registers();
        assert_eq!(regs.sr1 & opcodes::SR1_SRP0, 0, "{}", name);
        assert_eq!(regs.sr2 & opcodes::SR2_SRP1, 0, "{}", name);
        assert!(flash.quad_enabled(), "{}", name);
        assert!(!flash.lock_seen());
        assert_eq!(pins.wp.mode(), PinMode::Function);
    }
}

#[test]
fn test_harness_passes_after_reclaim() {
    let (mut flash, _) = board("gd25q32");
    let wp_pin = EmulatedPin::new();
    let hold_pin = EmulatedPin::new().with_pull(Level::Low);
    flash.attach_pins(&wp_pin, &hold_pin);
    let pins = FlashPins::new(wp_pin, hold_pin);

    let mut reclaimer = Reclaimer::new(flash, pins, ReclaimConfig::new());
    assert!(reclaimer.reclaim());
    let (mut flash, mut pins) = reclaimer.into_parts();

    let mut stages = Vec::new();
    let mut marker = |stage: HoldStage| stages.push(stage);
    let report = harness::run(
        &mut flash,
        &mut pins,
        QeBit::Sr2Bit1,
        &HarnessConfig::default(),
        &mut marker,
    )
    .unwrap();

    assert!(report.passed(), "{}", report);
    assert_eq!(stages, [HoldStage::Armed, HoldStage::Survived]);
    assert!(flash.elapsed_us() >= harness::DEFAULT_HOLD_GRACE_US as u64);
}

#[test]
fn test_harness_detects_active_pins() {
    let (mut flash, mut pins) = board("gd25q32");
    let layout = QeBit::Sr2Bit1;
    wp::force_protected_state(
        &mut flash,
        &mut pins.wp,
        layout,
        Persistence::Volatile,
        WriteWidth::Bits8,
    )
    .unwrap();

    let wp_result = harness::wp_output_test(
        &mut flash,
        &mut pins.wp,
        layout,
        Persistence::Volatile,
        WriteWidth::Bits8,
    )
    .unwrap();
    assert_eq!(wp_result.verdict(), OutputVerdict::Discrepancy);

    let mut stages = Vec::new();
    let mut marker = |stage: HoldStage| stages.push(stage);
    let hold_result = harness::hold_output_test(&mut flash, &mut pins.hold, layout, 1_000, &mut marker)
        .unwrap();
    assert_eq!(hold_result.verdict(), HoldVerdict::Fail);
    assert_eq!(stages, [HoldStage::Armed]);
    assert_eq!(pins.hold.mode(), PinMode::Function);
}

#[test]
fn test_boot_result_published() {
    let (mut flash, pins) = board("gd25q32");
    assert!(boot::reclaim_at_boot(&mut flash, pins, ReclaimConfig::new()));
    assert!(boot::RECLAIM_RESULT.pins_available());
    assert!(flash.quad_enabled());

    // The application only reads; a late write does not replace the result
    assert!(!boot::RECLAIM_RESULT.publish(false));
    assert!(boot::RECLAIM_RESULT.pins_available());
}

/// Fails the `fail_at`-th WRDI, counting from 1
struct FailingWrdi {
    flash: EmulatedFlash,
    fail_at: usize,
    seen: usize,
}

impl SpiMaster for FailingWrdi {
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> pinreclaim_core::Result<()> {
        if cmd.opcode == opcodes::WRDI {
            self.seen += 1;
            if self.seen == self.fail_at {
                return Err(Error::SpiTransferFailed);
            }
        }
        self.flash.execute(cmd)
    }

    fn flash_mode(&self) -> FlashMode {
        self.flash.flash_mode()
    }

    fn delay_us(&mut self, us: u32) {
        self.flash.delay_us(us)
    }
}

#[test]
fn test_failed_final_write_disable_rolls_back() {
    let (flash, pins) = board("gd25q32");
    let bus = FailingWrdi {
        flash,
        fail_at: usize::MAX,
        seen: 0,
    };
    let mut reclaimer = Reclaimer::new(bus, pins, ReclaimConfig::new());
    assert!(reclaimer.reclaim());
    let last_wrdi = reclaimer.master().seen;

    let (flash, pins) = board("gd25q32");
    let bus = FailingWrdi {
        flash,
        fail_at: last_wrdi,
        seen: 0,
    };
    let mut reclaimer = Reclaimer::new(bus, pins, ReclaimConfig::new());
    let report = reclaimer.run();

    assert_eq!(
        report.failure(),
        Some(FailureReason::Bus(Error::SpiTransferFailed))
    );
    assert!(report.trace.contains(&ReclaimState::FinalizeWriteDisable));
    assert!(report.rolled_back);
    let (bus, pins) = reclaimer.into_parts();
    assert!(!bus.flash.quad_enabled());
    assert_eq!(pins.modes(), (PinMode::Function, PinMode::Function));
}

fn nv_write_then_decline(master: &mut dyn SpiMaster, _id: u32) -> bool {
    let _ = write_status(
        master,
        StatusRegister::Status2,
        0x02,
        Persistence::NonVolatile,
        WriteWidth::Bits8,
    );
    false
}

#[test]
fn test_declined_hook_rolls_back_in_configured_persistence() {
    let config = ReclaimConfig::new()
        .with_hook(nv_write_then_decline)
        .with_persistence(Persistence::NonVolatile);
    let (flash, pins) = board("gd25q32");
    let mut reclaimer = Reclaimer::new(flash, pins, config);
    let report = reclaimer.run();

    assert_eq!(report.failure(), Some(FailureReason::HookDeclined));
    assert!(report.rolled_back);
    let flash = reclaimer.master();
    assert!(!flash.quad_enabled());
    flash.power_cycle();
    assert!(!flash.quad_enabled());
}
