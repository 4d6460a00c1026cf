// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! USB descriptors for a device sitting in its DFU (firmware update) mode.
//!
//! This crate is the part of the bootloader that tells the host who we are:
//! the device descriptor, a configuration made of one or two DFU interfaces
//! plus the DFU functional descriptor, and the string table. It also answers
//! GET_DESCRIPTOR with the right bytes and the right length.
//!
//! It does _not_ drive any USB hardware, and it does not handle the DFU class
//! requests (download, upload, detach and friends). A transport hands us a
//! decoded request and gets back a slice to transmit, or an error telling it
//! to STALL.
//!
//! ```
//! use dfu_descriptors::{DfuConfig, GetDescriptor, Registry, SetupPacket};
//!
//! let registry = Registry::new(&DfuConfig::DEFAULT).unwrap();
//!
//! // The host's first look at our configuration: header only.
//! let setup = SetupPacket::new(0x80, 0x06, 0x0200, 0, 9);
//! let request = GetDescriptor::from_setup(&setup).unwrap();
//! let response = registry.get_descriptor(&request).unwrap();
//! assert_eq!(response.payload().len(), 9);
//! ```
//!
//! Everything is built once, up front, from a `DfuConfig`, and nothing is
//! mutated after that, so a `Registry` can be shared freely.

#![no_std]

pub mod config;
pub mod descriptor;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod setup;

pub use config::{DfuConfig, SerialNumber};
pub use descriptor::DescriptorType;
pub use error::{ConfigError, Unsupported};
pub use registry::{Registry, StringTable};
pub use resolver::Response;
pub use setup::{GetDescriptor, SetupPacket};
