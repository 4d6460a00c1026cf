// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Reasons a `DfuConfig` cannot be turned into a registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// EP0 may only be 8, 16, 32 or 64 bytes.
    #[error("EP0 max packet size {0} is not 8, 16, 32 or 64")]
    InvalidPacketSize(u8),
    #[error("transfer block size must be nonzero")]
    ZeroTransferSize,
    /// The string that would land at `index` is longer than 126 UTF-16 units.
    #[error("string descriptor {index} is too long")]
    StringTooLong { index: u8 },
}

/// A descriptor request we cannot service. The transport answers it with a
/// STALL.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("unsupported descriptor request (type {type_code:#04x}, index {index})")]
pub struct Unsupported {
    /// Descriptor type code, from the high byte of the request `value`.
    pub type_code: u8,
    /// Descriptor index, from the low byte of the request `value`.
    pub index: u8,
}
