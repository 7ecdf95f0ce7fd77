//! `profiles` command

use pinreclaim_core::quad::VendorTable;
use pinreclaim_core::spi::FlashMode;
use pinreclaim_dummy::{ProfileCatalogue, QeLayout};

/// Print every profile with the strategy the vendor table picks for it
pub fn list_profiles(catalogue: &ProfileCatalogue) {
    let table = VendorTable::new();

    println!("Emulated chip profiles:");
    println!();
    println!(
        "{:<20} {:>8} {:<12} {:<18} {:<8} {:>4}",
        "Name", "ID", "Vendor", "Strategy", "QE", "Bus"
    );
    println!("{}", "-".repeat(75));

    for profile in catalogue.iter() {
        let id = profile.chip_id();
        let layout = match profile.layout {
            QeLayout::Sr2Bit1 => "SR2[1]",
            QeLayout::Sr1Bit6 => "SR1[6]",
            QeLayout::Absent => "-",
        };
        println!(
            "{:<20} {:>8} {:<12} {:<18} {:<8} {:>4}",
            profile.name,
            format!("{}", id),
            id.vendor_name(),
            table.dispatch(id).kind().name(),
            layout,
            FlashMode::from(profile.bus_mode).name()
        );
    }
}
