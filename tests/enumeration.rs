//! Walks through enumeration the way a host does, for every build shape.

mod util;

use dfu_descriptors::descriptor::{
    ConfigurationDescriptor, DeviceDescriptor, DfuFunctionalDescriptor, InterfaceDescriptor,
    Record, StringDescriptor, DFU_VERSION,
};
use dfu_descriptors::registry::SERIAL_S;
use dfu_descriptors::{DescriptorType, GetDescriptor, Registry, SerialNumber, SetupPacket, Unsupported};
use proptest::prelude::*;

use util::{all_configs, config, init_log};

const GET_DESCRIPTOR: u8 = 0x06;

fn get(registry: &Registry, type_code: u8, index: u8, length: u16) -> Result<Vec<u8>, Unsupported> {
    let setup = SetupPacket::new(0x80, GET_DESCRIPTOR, u16::from(type_code) << 8 | u16::from(index), 0x0409, length);
    let request = GetDescriptor::from_setup(&setup).unwrap();
    registry.get_descriptor(&request).map(|r| r.payload().to_vec())
}

fn text(desc: &StringDescriptor) -> String {
    char::decode_utf16(desc.code_units()).map(|c| c.unwrap()).collect()
}

#[test]
fn device_descriptor_round_trip() {
    init_log();
    for (config, registry) in all_configs() {
        let bytes = get(&registry, 1, 0, 64).unwrap();
        assert_eq!(bytes.len(), 18);
        let device = DeviceDescriptor::parse(&bytes).unwrap();
        assert_eq!(device.length, 18);
        assert_eq!(device.bcd_usb.get(), 0x0200);
        assert_eq!(device.vendor.get(), config.vendor_id);
        assert_eq!(device.product.get(), config.product_id);
        assert_eq!(device.bcd_device.get(), config.device_version);
        assert_eq!(device.max_packet_size0, 64);
        assert_eq!(device.num_configurations, 1);
        assert_eq!(device.serial_s, 0);
        // Little-endian on the wire.
        assert_eq!(&bytes[8..12], &[0x09, 0x12, 0x42, 0xDB]);
    }
}

#[test]
fn configuration_probe_then_full() {
    init_log();
    let registry = Registry::new(&config(false, false)).unwrap();

    let header = get(&registry, 2, 0, 9).unwrap();
    assert_eq!(header.len(), 9);
    let header = ConfigurationDescriptor::parse(&header).unwrap();
    let total = header.total_length.get();
    assert_eq!(total, 9 + 9 + 9);
    assert_eq!(header.num_interfaces, 1);

    let full = get(&registry, 2, 0, total).unwrap();
    assert_eq!(full.len(), usize::from(total));
    let (_, rest) = ConfigurationDescriptor::parse_prefix(&full).unwrap();
    let (flash, rest) = InterfaceDescriptor::parse_prefix(rest).unwrap();
    assert_eq!((flash.interface_class, flash.interface_subclass, flash.interface_protocol), (0xFE, 1, 2));
    let functional = DfuFunctionalDescriptor::parse(rest).unwrap();
    assert!(functional.can_download());
    assert!(functional.will_detach());
    assert!(!functional.can_upload());
}

#[test]
fn configuration_round_trip() {
    init_log();
    for (config, registry) in all_configs() {
        let full = get(&registry, 2, 0, 0xFFFF).unwrap();
        let (header, mut rest) = ConfigurationDescriptor::parse_prefix(&full).unwrap();
        assert_eq!(usize::from(header.total_length.get()), full.len());
        assert_eq!(header.attributes, 0xC0);
        assert_eq!(header.max_power, 50);

        let mut interfaces = Vec::new();
        while let Some((interface, next)) = InterfaceDescriptor::parse_prefix(rest) {
            interfaces.push(*interface);
            rest = next;
        }
        assert_eq!(interfaces.len(), if config.dual_interface() { 2 } else { 1 });
        assert_eq!(full.len(), 9 + 9 * interfaces.len() + 9);
        for (alt, interface) in interfaces.iter().enumerate() {
            assert_eq!(usize::from(interface.alternate_setting), alt);
        }

        let functional = DfuFunctionalDescriptor::parse(rest).unwrap();
        assert_eq!(functional.attributes, config.functional_attributes());
        assert_eq!(functional.can_upload(), config.upload_capable);
        assert_eq!(functional.will_detach(), !config.upload_capable);
        assert!(functional.manifestation_tolerant());
        assert_eq!(functional.detach_timeout.get(), config.detach_timeout_ms);
        assert_eq!(functional.transfer_size.get(), config.transfer_size);
        assert_eq!(functional.bcd_dfu.get(), DFU_VERSION);
    }
}

#[test]
fn strings_round_trip() {
    init_log();
    for (config, registry) in all_configs() {
        let lang = get(&registry, 3, 0, 255).unwrap();
        assert_eq!(lang, [4, 3, 0x09, 0x04]);

        let expected = [
            Some(config.manufacturer),
            Some(config.product),
            Some("DFU mode"),
            Some(config.flash_interface),
            config.secondary_interface,
        ];
        for (i, want) in expected.into_iter().flatten().enumerate() {
            let bytes = get(&registry, 3, i as u8 + 1, 255).unwrap();
            assert_eq!(usize::from(bytes[0]), bytes.len());
            assert_eq!(text(&StringDescriptor::parse(&bytes).unwrap()), want);
        }

        let count = registry.strings().len() as u8;
        assert_eq!(count, if config.dual_interface() { 6 } else { 5 });
        assert_eq!(get(&registry, 3, count, 255), Err(Unsupported { type_code: 3, index: count }));
        assert!(get(&registry, 3, 0xFF, 255).is_err());
    }
}

#[test]
fn interface_strings_match_indices() {
    init_log();
    for (_, registry) in all_configs() {
        let full = get(&registry, 2, 0, 0xFFFF).unwrap();
        let (header, mut rest) = ConfigurationDescriptor::parse_prefix(&full).unwrap();
        assert!(registry.strings().get(header.configuration_s).is_some());
        while let Some((interface, next)) = InterfaceDescriptor::parse_prefix(rest) {
            assert!(get(&registry, 3, interface.interface_s, 255).is_ok());
            rest = next;
        }
    }
}

#[test]
fn serial_number_sources() {
    init_log();
    let fixed = Registry::new(&dfu_descriptors::DfuConfig {
        serial_number: SerialNumber::Fixed("SN-0042"),
        ..config(false, true)
    })
    .unwrap();
    let serial_s = fixed.device().serial_s;
    assert_eq!(serial_s, SERIAL_S);
    assert_eq!(fixed.strings().len(), 5);
    assert!(get(&fixed, 3, 5, 255).is_err());
    let bytes = get(&fixed, 3, serial_s, 255).unwrap();
    assert_eq!(text(&StringDescriptor::parse(&bytes).unwrap()), "SN-0042");

    let unique = Registry::new(&dfu_descriptors::DfuConfig {
        serial_number: SerialNumber::UniqueId([0xDE, 0xAD, 0xBE, 0xEF, 0, 1, 2, 3, 4, 5, 6, 7]),
        ..config(true, false)
    })
    .unwrap();
    let serial_s = unique.device().serial_s;
    assert_eq!(serial_s, SERIAL_S);
    assert_eq!(unique.strings().len(), 6);
    let bytes = get(&unique, 3, serial_s, 255).unwrap();
    assert_eq!(text(&StringDescriptor::parse(&bytes).unwrap()), "DEADBEEF0001020304050607");
}

#[test]
fn raw_setup_packets() {
    init_log();
    let registry = Registry::new(&config(false, false)).unwrap();
    let raw = [0x80, 0x06, 0x00, 0x02, 0x00, 0x00, 0x09, 0x00];
    let setup = SetupPacket::parse(&raw).unwrap();
    assert_eq!(setup.descriptor_type_code(), 2);
    assert_eq!(setup.descriptor_index(), 0);
    let response = registry.get_descriptor_setup(setup).unwrap();
    assert_eq!(response.length(), 9);

    // SET_CONFIGURATION 1 isn't a descriptor request.
    let raw = [0x00, 0x09, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];
    let setup = SetupPacket::parse(&raw).unwrap();
    assert!(registry.get_descriptor_setup(setup).is_err());
}

#[test]
fn unknown_types_stall() {
    init_log();
    for (_, registry) in all_configs() {
        for code in [0u8, 4, 5, 6, 7, 0x0F, 0x21, 0x22, 0xFF] {
            assert_eq!(get(&registry, code, 0, 255), Err(Unsupported { type_code: code, index: 0 }));
        }
    }
}

#[test]
fn registry_is_shareable() {
    fn assert_sync<T: Sync + Send>() {}
    assert_sync::<Registry>();
}

proptest! {
    #[test]
    fn device_length_is_fixed(requested: u16, index: u8) {
        for (_, registry) in all_configs() {
            let response = registry.resolve(DescriptorType::Device, index, requested).unwrap();
            prop_assert_eq!(response.length(), 18);
            prop_assert_eq!(response.descriptor()[0], 18);
        }
    }

    #[test]
    fn configuration_is_header_or_whole(requested: u16) {
        for (_, registry) in all_configs() {
            let full = registry.configuration().len() as u16;
            let response = registry.resolve(DescriptorType::Config, 0, requested).unwrap();
            if requested >= full {
                prop_assert_eq!(response.length(), full);
            } else {
                prop_assert_eq!(response.length(), 9);
            }
            prop_assert_eq!(response.descriptor(), registry.configuration());
        }
    }

    #[test]
    fn string_length_is_natural(index: u8, requested: u16) {
        for (_, registry) in all_configs() {
            match registry.resolve(DescriptorType::String, index, requested) {
                Ok(response) => {
                    prop_assert!(usize::from(index) < registry.strings().len());
                    prop_assert_eq!(response.length(), u16::from(response.descriptor()[0]));
                    prop_assert_eq!(usize::from(response.length()), response.descriptor().len());
                }
                Err(e) => {
                    prop_assert!(usize::from(index) >= registry.strings().len());
                    prop_assert_eq!(e, Unsupported { type_code: 3, index });
                }
            }
        }
    }

    #[test]
    fn resolving_is_idempotent(type_code: u8, index: u8, requested: u16) {
        let registry = Registry::new(&config(true, true)).unwrap();
        prop_assert_eq!(
            registry.resolve_code(type_code, index, requested),
            registry.resolve_code(type_code, index, requested)
        );
    }
}
