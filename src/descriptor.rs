// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Byte layouts of every descriptor record we present to the host.
//!
//! Each fixed-size record is a `#[repr(C)]` struct made only of `u8` and
//! `U16<LittleEndian>` fields. Deriving `AsBytes` refuses to compile if the
//! layout ever picks up padding, and deriving `FromBytes` + `Unaligned` lets us
//! reinterpret bytes coming back from the wire as the same struct. So the
//! struct definitions below _are_ the serialization schema: the field order is
//! the wire order, the field widths are the wire widths.
//!
//! String descriptors are variable length and are handled separately, at the
//! bottom of this file.

use core::mem::size_of;

use byteorder::LittleEndian;
use num_derive::FromPrimitive;
use zerocopy::{AsBytes, FromBytes, LayoutVerified, Unaligned, U16};

/// USB specification release we claim to follow, in BCD (2.00).
pub const USB_VERSION: u16 = 0x0200;
/// DFU specification release we claim to follow, in BCD (1.1).
pub const DFU_VERSION: u16 = 0x0110;

/// Device class meaning "look at the interfaces instead".
pub const CLASS_PER_INTERFACE: u8 = 0x00;
/// Application-specific interface class, which is where DFU lives.
pub const CLASS_APPLICATION_SPECIFIC: u8 = 0xFE;
/// DFU subclass within the application-specific class.
pub const SUBCLASS_DFU: u8 = 0x01;
/// Interface protocol used while the device is _in_ DFU mode (as opposed to
/// the runtime protocol, 1, which we never present).
pub const PROTOCOL_DFU_MODE: u8 = 0x02;

/// Configuration attribute bit that must always be set (a USB 1.0 leftover).
pub const CONFIG_ATTR_RESERVED: u8 = 0x80;
/// Configuration attribute bit: the device can power itself.
pub const CONFIG_ATTR_SELF_POWERED: u8 = 0x40;

/// English (United States).
pub const LANG_ID_EN_US: u16 = 0x0409;

/// Converts a current draw in mA into the 2 mA units used by `max_power`.
pub const fn max_power_units(milliamps: u16) -> u8 {
    (milliamps / 2) as u8
}

/// Types of USB descriptor, by their `descriptor_type` code.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum DescriptorType {
    Device = 0x01,
    Config = 0x02,
    String = 0x03,
    Interface = 0x04,
    Endpoint = 0x05,
    /// Class-specific descriptor defined by the DFU spec.
    DfuFunctional = 0x21,
}

/// The two bytes every descriptor starts with.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, AsBytes, FromBytes, Unaligned)]
pub struct DescriptorHeader {
    /// Length of the whole record, in bytes.
    pub length: u8,
    /// A `DescriptorType` code.
    pub descriptor_type: u8,
}

impl DescriptorHeader {
    /// Reads the header off the front of `bytes`, whatever record it belongs
    /// to.
    pub fn of(bytes: &[u8]) -> Option<&Self> {
        LayoutVerified::<_, Self>::new_unaligned_from_prefix(bytes)
            .map(|(header, _)| header.into_ref())
    }
}

/// Common behavior of the fixed-size descriptor records.
pub trait Record: AsBytes + FromBytes + Unaligned + Sized {
    /// What goes in `descriptor_type`.
    const TYPE: DescriptorType;
    /// What goes in `length`. This is the size of the struct, which is the
    /// whole point of keeping it padding-free.
    const LENGTH: u8 = size_of::<Self>() as u8;

    /// Reinterprets the front of `bytes` as this record, returning it along
    /// with whatever follows. Fails if there are too few bytes or if the
    /// header disagrees with the record type.
    fn parse_prefix(bytes: &[u8]) -> Option<(&Self, &[u8])> {
        let (record, rest) = LayoutVerified::<_, Self>::new_unaligned_from_prefix(bytes)?;
        let header = DescriptorHeader::of(record.bytes())?;
        if header.length != Self::LENGTH || header.descriptor_type != Self::TYPE as u8 {
            return None;
        }
        Some((record.into_ref(), rest))
    }

    /// Like `parse_prefix`, but `bytes` must hold exactly one record.
    fn parse(bytes: &[u8]) -> Option<&Self> {
        match Self::parse_prefix(bytes)? {
            (record, []) => Some(record),
            _ => None,
        }
    }
}

/// Describes a device. This is the most broad description in USB and is
/// typically the first thing the host asks for.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, AsBytes, FromBytes, Unaligned)]
pub struct DeviceDescriptor {
    /// Length of this structure, must be 18.
    pub length: u8,
    /// Type of this descriptor, must be `Device`.
    pub descriptor_type: u8,
    /// Version of the USB protocol, in binary-coded decimal.
    pub bcd_usb: U16<LittleEndian>,
    /// Class of device, giving a broad functional area.
    pub device_class: u8,
    /// Subclass of device, refining the class.
    pub device_subclass: u8,
    /// Protocol within the subclass.
    pub device_protocol: u8,
    /// Largest packet EP0 can move.
    pub max_packet_size0: u8,
    /// ID of product vendor.
    pub vendor: U16<LittleEndian>,
    /// ID of product.
    pub product: U16<LittleEndian>,
    /// Device version number, as BCD again.
    pub bcd_device: U16<LittleEndian>,
    /// Index of manufacturer name in string descriptor table.
    pub manufacturer_s: u8,
    /// Index of product name in string descriptor table.
    pub product_s: u8,
    /// Index of serial number in string descriptor table, or 0 for none.
    pub serial_s: u8,
    /// Number of configurations supported by this device.
    pub num_configurations: u8,
}

impl Record for DeviceDescriptor {
    const TYPE: DescriptorType = DescriptorType::Device;
}

/// Description of a single available device configuration. On the wire it is
/// followed by the interface and class descriptors it covers.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, AsBytes, FromBytes, Unaligned)]
pub struct ConfigurationDescriptor {
    /// Length of this structure, must be 9.
    pub length: u8,
    /// Type of this descriptor, must be `Config`.
    pub descriptor_type: u8,
    /// Total length of all descriptors in this configuration, concatenated,
    /// including this one.
    pub total_length: U16<LittleEndian>,
    /// Number of interfaces in this configuration. Alternate settings of the
    /// same interface do not count twice.
    pub num_interfaces: u8,
    /// Number to use when requesting this configuration via a
    /// `SetConfiguration` request.
    pub configuration_value: u8,
    /// Index of this configuration's name in the string descriptor table.
    pub configuration_s: u8,
    /// Bit set of `CONFIG_ATTR_*` values.
    pub attributes: u8,
    /// Maximum device power consumption in units of 2mA.
    pub max_power: u8,
}

impl Record for ConfigurationDescriptor {
    const TYPE: DescriptorType = DescriptorType::Config;
}

/// Description of an interface within a configuration.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, AsBytes, FromBytes, Unaligned)]
pub struct InterfaceDescriptor {
    /// Length of this structure, must be 9.
    pub length: u8,
    /// Type of this descriptor, must be `Interface`.
    pub descriptor_type: u8,
    /// ID of this interface.
    pub interface_number: u8,
    /// Allows a single `interface_number` to have several alternate interface
    /// settings, where each alternate increments this field. DFU uses these to
    /// expose one setting per memory it can program.
    pub alternate_setting: u8,
    /// Number of endpoint descriptors in this interface. DFU uses only EP0.
    pub num_endpoints: u8,
    /// Interface class code, distinguishing the type of interface.
    pub interface_class: u8,
    /// Interface subclass code, refining the class of interface.
    pub interface_subclass: u8,
    /// Protocol within the interface class/subclass.
    pub interface_protocol: u8,
    /// Index of interface name within string descriptor table.
    pub interface_s: u8,
}

impl Record for InterfaceDescriptor {
    const TYPE: DescriptorType = DescriptorType::Interface;
}

impl InterfaceDescriptor {
    /// A DFU-mode alternate setting of interface 0, with no endpoints.
    pub fn dfu(alternate_setting: u8, interface_s: u8) -> Self {
        Self {
            length: Self::LENGTH,
            descriptor_type: Self::TYPE as u8,
            interface_number: 0,
            alternate_setting,
            num_endpoints: 0,
            interface_class: CLASS_APPLICATION_SPECIFIC,
            interface_subclass: SUBCLASS_DFU,
            interface_protocol: PROTOCOL_DFU_MODE,
            interface_s,
        }
    }
}

/// DFU functional descriptor: tells the host what the update engine can do
/// and how big each block may be.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, AsBytes, FromBytes, Unaligned)]
pub struct DfuFunctionalDescriptor {
    /// Length of this structure, must be 9.
    pub length: u8,
    /// Type of this descriptor, must be `DfuFunctional`.
    pub descriptor_type: u8,
    /// Bit set of `DfuFunctionalDescriptor::*` capability bits.
    pub attributes: u8,
    /// Milliseconds the device waits for a reset after a detach request.
    pub detach_timeout: U16<LittleEndian>,
    /// Largest block the device accepts per control write.
    pub transfer_size: U16<LittleEndian>,
    /// DFU release, BCD.
    pub bcd_dfu: U16<LittleEndian>,
}

impl Record for DfuFunctionalDescriptor {
    const TYPE: DescriptorType = DescriptorType::DfuFunctional;
}

impl DfuFunctionalDescriptor {
    pub const CAN_DNLOAD: u8 = 1 << 0;
    pub const CAN_UPLOAD: u8 = 1 << 1;
    pub const MANIFESTATION_TOLERANT: u8 = 1 << 2;
    pub const WILL_DETACH: u8 = 1 << 3;

    pub fn can_download(&self) -> bool {
        self.attributes & Self::CAN_DNLOAD != 0
    }

    pub fn can_upload(&self) -> bool {
        self.attributes & Self::CAN_UPLOAD != 0
    }

    pub fn manifestation_tolerant(&self) -> bool {
        self.attributes & Self::MANIFESTATION_TOLERANT != 0
    }

    pub fn will_detach(&self) -> bool {
        self.attributes & Self::WILL_DETACH != 0
    }
}

////////////////////////////////////////////////////////////////////////////
// String descriptors.

/// Longest text a string descriptor can carry, in UTF-16 code units. The
/// length byte tops out at 255, and the record must stay an even size.
pub const MAX_STRING_UNITS: usize = 126;

const MAX_STRING_LEN: usize = 2 + 2 * MAX_STRING_UNITS;

/// A string descriptor: length, type, then either a list of language IDs (for
/// index 0) or UTF-16LE text (everything else). Both are just sequences of
/// 16-bit units on the wire, so both are stored the same way.
#[derive(Clone, PartialEq, Eq)]
pub struct StringDescriptor {
    buf: [u8; MAX_STRING_LEN],
}

impl StringDescriptor {
    /// A string descriptor with no payload.
    pub const EMPTY: Self = {
        let mut buf = [0; MAX_STRING_LEN];
        buf[0] = 2;
        buf[1] = DescriptorType::String as u8;
        Self { buf }
    };

    /// Builds a descriptor from 16-bit units, or `None` if there are more than
    /// `MAX_STRING_UNITS` of them.
    pub fn from_code_units(units: impl IntoIterator<Item = u16>) -> Option<Self> {
        let mut desc = Self::EMPTY;
        let mut used = 2;
        for unit in units {
            if used == MAX_STRING_LEN {
                return None;
            }
            desc.buf[used..used + 2].copy_from_slice(&unit.to_le_bytes());
            used += 2;
        }
        desc.buf[0] = used as u8;
        Some(desc)
    }

    /// Encodes `text` as UTF-16LE.
    pub fn text(text: &str) -> Option<Self> {
        Self::from_code_units(text.encode_utf16())
    }

    /// The index-0 descriptor listing the languages we speak.
    pub fn languages(ids: &[u16]) -> Option<Self> {
        Self::from_code_units(ids.iter().copied())
    }

    /// Reads a string descriptor back out of `bytes`, which must hold exactly
    /// one.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header = DescriptorHeader::of(bytes)?;
        if usize::from(header.length) != bytes.len()
            || header.descriptor_type != DescriptorType::String as u8
            || bytes.len() % 2 != 0
        {
            return None;
        }
        Self::from_code_units(
            bytes[2..].chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])),
        )
    }

    /// The record as it goes on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..usize::from(self.buf[0])]
    }

    /// The payload, as 16-bit units.
    pub fn code_units(&self) -> impl Iterator<Item = u16> + '_ {
        self.as_bytes()[2..]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
    }

    /// Checks the payload against `text`, without needing somewhere to decode
    /// it into.
    pub fn eq_text(&self, text: &str) -> bool {
        self.code_units().eq(text.encode_utf16())
    }
}

impl core::fmt::Debug for StringDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("StringDescriptor(\"")?;
        for c in char::decode_utf16(self.code_units()) {
            write!(f, "{}", c.unwrap_or(char::REPLACEMENT_CHARACTER))?;
        }
        f.write_str("\")")
    }
}
