// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Build-time description of the device.
//!
//! Everything that varies between builds of the bootloader lives in a
//! `DfuConfig`. The registry turns one of these into descriptor bytes exactly
//! once; after that nothing here is consulted again.
//!
//! The shape-changing options (second interface, upload support) are plain
//! fields rather than `#[cfg]`s, so every combination can be built and tested
//! in one binary. Cargo features only pick which combination
//! `DfuConfig::DEFAULT` uses.

use crate::descriptor::{DfuFunctionalDescriptor, LANG_ID_EN_US};
use crate::error::ConfigError;

cfg_if::cfg_if! {
    if #[cfg(feature = "dual-interface")] {
        const SECONDARY_INTERFACE: Option<&str> = Some("Internal EEPROM");
    } else {
        const SECONDARY_INTERFACE: Option<&str> = None;
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "upload-capable")] {
        const UPLOAD_CAPABLE: bool = true;
    } else {
        const UPLOAD_CAPABLE: bool = false;
    }
}

/// Where the serial number string comes from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SerialNumber {
    /// No serial number; `serial_s` is 0.
    None,
    /// The same string on every unit.
    Fixed(&'static str),
    /// Generated per unit from the chip's 96-bit unique ID, as upper-case hex.
    UniqueId([u8; 12]),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DfuConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Device release, in BCD.
    pub device_version: u16,
    pub ep0_max_packet_size: u8,
    pub serial_number: SerialNumber,
    /// Whether the host may read firmware back out. Devices that can't upload
    /// advertise that they detach by themselves instead.
    pub upload_capable: bool,
    /// Milliseconds to wait for a bus reset after a detach request.
    pub detach_timeout_ms: u16,
    /// Block size the update engine accepts per control write.
    pub transfer_size: u16,
    /// The single language the strings are written in.
    pub language_id: u16,
    pub manufacturer: &'static str,
    pub product: &'static str,
    /// Name of the flash interface, which is always present.
    pub flash_interface: &'static str,
    /// Name of the EEPROM interface. `Some` turns on the second interface
    /// (as alternate setting 1).
    pub secondary_interface: Option<&'static str>,
}

impl DfuConfig {
    pub const DEFAULT: Self = Self {
        vendor_id: 0x0483,
        product_id: 0xDF11,
        device_version: 0x0100,
        ep0_max_packet_size: 8,
        serial_number: SerialNumber::None,
        upload_capable: UPLOAD_CAPABLE,
        detach_timeout_ms: 1000,
        transfer_size: 0x0800,
        language_id: LANG_ID_EN_US,
        manufacturer: "Open source",
        product: "Secure bootloader",
        flash_interface: "Internal flash",
        secondary_interface: SECONDARY_INTERFACE,
    };

    pub fn dual_interface(&self) -> bool {
        self.secondary_interface.is_some()
    }

    /// Capability bits for the DFU functional descriptor.
    pub fn functional_attributes(&self) -> u8 {
        let base = DfuFunctionalDescriptor::CAN_DNLOAD
            | DfuFunctionalDescriptor::MANIFESTATION_TOLERANT;
        if self.upload_capable {
            base | DfuFunctionalDescriptor::CAN_UPLOAD
        } else {
            base | DfuFunctionalDescriptor::WILL_DETACH
        }
    }

    /// Checks the numeric settings. String lengths are checked as the strings
    /// are encoded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.ep0_max_packet_size, 8 | 16 | 32 | 64) {
            return Err(ConfigError::InvalidPacketSize(self.ep0_max_packet_size));
        }
        if self.transfer_size == 0 {
            return Err(ConfigError::ZeroTransferSize);
        }
        Ok(())
    }
}

impl Default for DfuConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
