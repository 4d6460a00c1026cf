use std::sync::Once;

use dfu_descriptors::{DfuConfig, Registry, SerialNumber};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init_log() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        tracing_subscriber::registry()
            .with(fmt::layer().with_test_writer())
            .with(EnvFilter::from_default_env())
            .init();
    });
}

/// A config with every field set to something distinctive, so that byte-order
/// or offset mistakes show up as wrong values.
pub fn config(dual: bool, upload: bool) -> DfuConfig {
    DfuConfig {
        vendor_id: 0x1209,
        product_id: 0xDB42,
        device_version: 0x0213,
        ep0_max_packet_size: 64,
        serial_number: SerialNumber::None,
        upload_capable: upload,
        detach_timeout_ms: 0x03E8,
        transfer_size: 0x0400,
        language_id: 0x0409,
        manufacturer: "Acme Widgets",
        product: "Widget bootloader",
        flash_interface: "Flash",
        secondary_interface: dual.then_some("EEPROM"),
    }
}

/// Every combination of the two shape-changing options.
pub fn all_configs() -> impl Iterator<Item = (DfuConfig, Registry)> {
    [(false, false), (false, true), (true, false), (true, true)]
        .into_iter()
        .map(|(dual, upload)| {
            let config = config(dual, upload);
            let registry = Registry::new(&config).unwrap();
            (config, registry)
        })
}
