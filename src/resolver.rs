// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Turning a GET_DESCRIPTOR request into bytes to send.

use num_traits::FromPrimitive;
use zerocopy::AsBytes;

use crate::descriptor::{DescriptorHeader, DescriptorType};
use crate::error::Unsupported;
use crate::registry::Registry;
use crate::setup::{GetDescriptor, SetupPacket};

/// What to send back for a descriptor request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Response<'a> {
    descriptor: &'a [u8],
    length: u16,
}

impl<'a> Response<'a> {
    /// The selected descriptor, in full.
    pub fn descriptor(&self) -> &'a [u8] {
        self.descriptor
    }

    /// How many bytes of `descriptor` to send. Never more than it holds.
    pub fn length(&self) -> u16 {
        self.length
    }

    /// The first `length` bytes of `descriptor`.
    pub fn payload(&self) -> &'a [u8] {
        &self.descriptor[..usize::from(self.length)]
    }
}

impl Registry {
    /// Picks the descriptor for (`kind`, `index`) and decides how much of it
    /// to send, given that the host offered `requested_length` bytes.
    ///
    /// Device and string descriptors are always reported at their natural
    /// size, whatever the host offered; keeping the data stage within
    /// `requested_length` is the transport's job. Configuration requests are
    /// the exception: hosts routinely ask for just the 9-byte header first to
    /// learn `total_length`, so unless the host has room for the whole set we
    /// answer with the header alone.
    pub fn resolve(
        &self,
        kind: DescriptorType,
        index: u8,
        requested_length: u16,
    ) -> Result<Response<'_>, Unsupported> {
        let mut length = None;
        let descriptor = match kind {
            DescriptorType::Device => self.device().as_bytes(),
            DescriptorType::Config => {
                let full = self.configuration();
                if usize::from(requested_length) >= full.len() {
                    length = Some(full.len() as u16);
                }
                full
            }
            DescriptorType::String => match self.string(index) {
                Some(desc) => desc.as_bytes(),
                None => return Err(Unsupported { type_code: kind as u8, index }),
            },
            _ => return Err(Unsupported { type_code: kind as u8, index }),
        };
        // Otherwise, send whatever the leading record says its own size is.
        // For the configuration set that's just the header.
        let length = match length {
            Some(length) => length,
            None => DescriptorHeader::of(descriptor)
                .map(|header| u16::from(header.length))
                .ok_or(Unsupported { type_code: kind as u8, index })?,
        };
        Ok(Response { descriptor, length })
    }

    /// Same as `resolve`, for a raw descriptor type code.
    pub fn resolve_code(
        &self,
        type_code: u8,
        index: u8,
        requested_length: u16,
    ) -> Result<Response<'_>, Unsupported> {
        let kind = DescriptorType::from_u8(type_code).ok_or(Unsupported { type_code, index })?;
        self.resolve(kind, index, requested_length)
    }

    /// Serves a raw SETUP packet. Anything that isn't a standard
    /// GET_DESCRIPTOR is `Unsupported`, same as a descriptor we don't have.
    pub fn get_descriptor_setup(&self, setup: &SetupPacket) -> Result<Response<'_>, Unsupported> {
        match GetDescriptor::from_setup(setup) {
            Some(request) => self.get_descriptor(&request),
            None => {
                tracing::debug!(
                    request_type = setup.request_type,
                    request = setup.request,
                    "not a GET_DESCRIPTOR"
                );
                Err(Unsupported {
                    type_code: setup.descriptor_type_code(),
                    index: setup.descriptor_index(),
                })
            }
        }
    }

    /// Serves a GET_DESCRIPTOR that the transport has already decoded. An
    /// `Err` means the transport should STALL.
    pub fn get_descriptor(&self, request: &GetDescriptor) -> Result<Response<'_>, Unsupported> {
        match self.resolve_code(request.type_code, request.index, request.length) {
            Ok(response) => {
                tracing::trace!(
                    type_code = request.type_code,
                    index = request.index,
                    requested = request.length,
                    length = response.length(),
                    "get descriptor"
                );
                Ok(response)
            }
            Err(e) => {
                tracing::debug!(
                    type_code = e.type_code,
                    index = e.index,
                    "stalling descriptor request"
                );
                Err(e)
            }
        }
    }
}
