// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The complete, read-only set of descriptors the device presents.
//!
//! A `Registry` is built once from a `DfuConfig` and then only ever borrowed.
//! It holds each descriptor as the exact bytes that go out on the wire, so
//! answering a request never copies or re-encodes anything.

use core::mem::size_of;

use zerocopy::{AsBytes, U16};

use crate::config::{DfuConfig, SerialNumber};
use crate::descriptor::{
    max_power_units, ConfigurationDescriptor, DescriptorType, DeviceDescriptor,
    DfuFunctionalDescriptor, InterfaceDescriptor, Record, StringDescriptor, CLASS_PER_INTERFACE,
    CONFIG_ATTR_RESERVED, CONFIG_ATTR_SELF_POWERED, DFU_VERSION, USB_VERSION,
};
use crate::error::ConfigError;

// Fixed string table positions. The secondary interface name, when present,
// follows these.
pub const MANUFACTURER_S: u8 = 1;
pub const PRODUCT_S: u8 = 2;
pub const CONFIGURATION_S: u8 = 3;
pub const FLASH_INTERFACE_S: u8 = 4;

/// Where the serial number lives. It sits outside the table, well clear of
/// any index the table can grow to.
pub const SERIAL_S: u8 = 0xFE;

/// Name of our one configuration.
pub const CONFIGURATION_NAME: &str = "DFU mode";

/// Current we say we draw, in mA.
const MAX_POWER_MA: u16 = 100;

/// Language list, four fixed strings, secondary interface.
pub const STRING_TABLE_CAPACITY: usize = 6;

/// Size of the configuration descriptor set with both interfaces present.
const CONFIGURATION_CAPACITY: usize = size_of::<ConfigurationDescriptor>()
    + 2 * size_of::<InterfaceDescriptor>()
    + size_of::<DfuFunctionalDescriptor>();

/// String descriptors, indexed the way the other descriptors' `*_s` fields
/// refer to them. Index 0 is the language list.
pub struct StringTable {
    entries: [StringDescriptor; STRING_TABLE_CAPACITY],
    len: usize,
}

impl StringTable {
    fn new() -> Self {
        Self {
            entries: [StringDescriptor::EMPTY; STRING_TABLE_CAPACITY],
            len: 0,
        }
    }

    /// Appends `desc`, returning the index it landed at.
    fn push(&mut self, desc: Option<StringDescriptor>) -> Result<u8, ConfigError> {
        let index = self.len as u8;
        let desc = desc.ok_or(ConfigError::StringTooLong { index })?;
        self.entries[self.len] = desc;
        self.len += 1;
        Ok(index)
    }

    fn push_text(&mut self, text: &str) -> Result<u8, ConfigError> {
        self.push(StringDescriptor::text(text))
    }

    /// Looks up entry `index`, or `None` if there is no such entry.
    pub fn get(&self, index: u8) -> Option<&StringDescriptor> {
        self.entries[..self.len].get(usize::from(index))
    }

    /// Number of entries, including the language list.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &StringDescriptor> {
        self.entries[..self.len].iter()
    }
}

/// Upper-case hex digits of `id`, as UTF-16 units.
fn hex_units(id: &[u8]) -> impl Iterator<Item = u16> + '_ {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    id.iter()
        .flat_map(|b| [b >> 4, b & 0xF])
        .map(|nibble| u16::from(DIGITS[usize::from(nibble)]))
}

pub struct Registry {
    device: DeviceDescriptor,
    /// Header, interface(s), functional descriptor, back to back.
    configuration: [u8; CONFIGURATION_CAPACITY],
    configuration_len: usize,
    /// Typed copies of what's in `configuration`.
    header: ConfigurationDescriptor,
    functional: DfuFunctionalDescriptor,
    interface_count: usize,
    strings: StringTable,
    serial: Option<StringDescriptor>,
}

impl Registry {
    pub fn new(config: &DfuConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        // Strings first, since the other descriptors need to know where they
        // ended up.
        let mut strings = StringTable::new();
        strings.push(StringDescriptor::languages(&[config.language_id]))?;
        strings.push_text(config.manufacturer)?;
        strings.push_text(config.product)?;
        strings.push_text(CONFIGURATION_NAME)?;
        strings.push_text(config.flash_interface)?;
        let secondary_s = match config.secondary_interface {
            Some(name) => Some(strings.push_text(name)?),
            None => None,
        };
        let serial = match config.serial_number {
            SerialNumber::None => None,
            SerialNumber::Fixed(text) => Some(StringDescriptor::text(text)),
            SerialNumber::UniqueId(id) => {
                Some(StringDescriptor::from_code_units(hex_units(&id)))
            }
        };
        let serial = serial
            .map(|desc| desc.ok_or(ConfigError::StringTooLong { index: SERIAL_S }))
            .transpose()?;
        let serial_s = if serial.is_some() { SERIAL_S } else { 0 };

        let device = DeviceDescriptor {
            length: DeviceDescriptor::LENGTH,
            descriptor_type: DescriptorType::Device as u8,
            bcd_usb: U16::new(USB_VERSION),
            device_class: CLASS_PER_INTERFACE,
            device_subclass: 0,
            device_protocol: 0,
            max_packet_size0: config.ep0_max_packet_size,
            vendor: U16::new(config.vendor_id),
            product: U16::new(config.product_id),
            bcd_device: U16::new(config.device_version),
            manufacturer_s: MANUFACTURER_S,
            product_s: PRODUCT_S,
            serial_s,
            num_configurations: 1,
        };

        let flash = InterfaceDescriptor::dfu(0, FLASH_INTERFACE_S);
        let secondary = secondary_s.map(|s| InterfaceDescriptor::dfu(1, s));
        let interface_count = 1 + usize::from(secondary.is_some());

        let functional = DfuFunctionalDescriptor {
            length: DfuFunctionalDescriptor::LENGTH,
            descriptor_type: DescriptorType::DfuFunctional as u8,
            attributes: config.functional_attributes(),
            detach_timeout: U16::new(config.detach_timeout_ms),
            transfer_size: U16::new(config.transfer_size),
            bcd_dfu: U16::new(DFU_VERSION),
        };

        let total_length = size_of::<ConfigurationDescriptor>()
            + interface_count * size_of::<InterfaceDescriptor>()
            + size_of::<DfuFunctionalDescriptor>();
        let header = ConfigurationDescriptor {
            length: ConfigurationDescriptor::LENGTH,
            descriptor_type: DescriptorType::Config as u8,
            total_length: U16::new(total_length as u16),
            // The EEPROM is an alternate setting of the same interface, so
            // this stays 1 either way.
            num_interfaces: 1,
            configuration_value: 1,
            configuration_s: CONFIGURATION_S,
            attributes: CONFIG_ATTR_RESERVED | CONFIG_ATTR_SELF_POWERED,
            max_power: max_power_units(MAX_POWER_MA),
        };

        // Lay the set out in the order the host expects to walk it.
        let mut configuration = [0; CONFIGURATION_CAPACITY];
        let mut used = 0;
        let parts = [
            Some(header.as_bytes()),
            Some(flash.as_bytes()),
            secondary.as_ref().map(|s| s.as_bytes()),
            Some(functional.as_bytes()),
        ];
        for part in parts.into_iter().flatten() {
            configuration[used..used + part.len()].copy_from_slice(part);
            used += part.len();
        }
        debug_assert_eq!(used, total_length);

        tracing::debug!(
            vendor = config.vendor_id,
            product = config.product_id,
            total_length,
            strings = strings.len(),
            "descriptor registry built"
        );

        Ok(Self {
            device,
            configuration,
            configuration_len: used,
            header,
            functional,
            interface_count,
            strings,
            serial,
        })
    }

    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    /// The whole configuration descriptor set, as sent to the host.
    pub fn configuration(&self) -> &[u8] {
        &self.configuration[..self.configuration_len]
    }

    pub fn configuration_header(&self) -> &ConfigurationDescriptor {
        &self.header
    }

    pub fn functional(&self) -> &DfuFunctionalDescriptor {
        &self.functional
    }

    /// Number of interface descriptors in the set (alternate settings
    /// included).
    pub fn interface_count(&self) -> usize {
        self.interface_count
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// The serial number string, served at `SERIAL_S`.
    pub fn serial(&self) -> Option<&StringDescriptor> {
        self.serial.as_ref()
    }

    /// Any string descriptor a host may ask for: a table entry, or the serial
    /// number at `SERIAL_S`.
    pub fn string(&self, index: u8) -> Option<&StringDescriptor> {
        match index {
            SERIAL_S => self.serial(),
            _ => self.strings.get(index),
        }
    }
}
