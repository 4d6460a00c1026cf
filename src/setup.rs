// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Just enough of the SETUP packet to recognize and unpack a GET_DESCRIPTOR.

use byteorder::LittleEndian;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use zerocopy::{AsBytes, FromBytes, LayoutVerified, Unaligned, U16};

/// USB deals in two different transfer directions, called OUT (host-to-device)
/// and IN (device-to-host). For standard requests addressed to the device, the
/// request type byte is exactly one of these.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
pub enum UsbDir {
    Out = 0,
    In = 0x80,
}

/// Standard requests a transport is likely to route on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
pub enum StandardRequest {
    /// Notifies the device that it's being moved to a different address on the
    /// bus. Always an OUT.
    SetAddress = 0x05,
    /// Asks the device to send a certain descriptor back to the host. Always
    /// an IN.
    GetDescriptor = 0x06,
    /// Configures a device by choosing one of the options listed in its
    /// descriptors. Always an OUT.
    SetConfiguration = 0x09,
}

/// Layout of an 8-byte USB SETUP packet.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, AsBytes, FromBytes, Unaligned)]
pub struct SetupPacket {
    /// Request type; for standard device requests, a `UsbDir`.
    pub request_type: u8,
    /// Request code, e.g. a `StandardRequest`.
    pub request: u8,
    /// Request argument. For GET_DESCRIPTOR, the descriptor type is in the
    /// high byte and the index in the low byte.
    pub value: U16<LittleEndian>,
    /// Language ID for string requests; we serve a single language and ignore
    /// it.
    pub index: U16<LittleEndian>,
    /// Maximum number of bytes the host will accept in the data stage.
    pub length: U16<LittleEndian>,
}

impl SetupPacket {
    pub fn new(request_type: u8, request: u8, value: u16, index: u16, length: u16) -> Self {
        Self {
            request_type,
            request,
            value: U16::new(value),
            index: U16::new(index),
            length: U16::new(length),
        }
    }

    /// Reinterprets 8 bytes copied out of the SETUP buffer.
    pub fn parse(bytes: &[u8]) -> Option<&Self> {
        LayoutVerified::<_, Self>::new_unaligned(bytes).map(|lv| lv.into_ref())
    }

    /// Descriptor type code of a GET_DESCRIPTOR, from the _top_ 8 bits of
    /// `value`.
    pub fn descriptor_type_code(&self) -> u8 {
        (self.value.get() >> 8) as u8
    }

    /// Descriptor index of a GET_DESCRIPTOR, from the bottom 8 bits of
    /// `value`.
    pub fn descriptor_index(&self) -> u8 {
        (self.value.get() & 0xFF) as u8
    }
}

/// A decoded GET_DESCRIPTOR request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GetDescriptor {
    /// Raw descriptor type code. Kept raw so an unknown code can be reported.
    pub type_code: u8,
    pub index: u8,
    /// Buffer size the host offered.
    pub length: u16,
}

impl GetDescriptor {
    /// Returns `Some` if `setup` is a standard device-to-host GET_DESCRIPTOR.
    pub fn from_setup(setup: &SetupPacket) -> Option<Self> {
        let reqty = UsbDir::from_u8(setup.request_type);
        let req = StandardRequest::from_u8(setup.request);
        match (reqty, req) {
            (Some(UsbDir::In), Some(StandardRequest::GetDescriptor)) => Some(Self {
                type_code: setup.descriptor_type_code(),
                index: setup.descriptor_index(),
                length: setup.length.get(),
            }),
            _ => None,
        }
    }
}
