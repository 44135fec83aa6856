//! Codec for the one-byte type descriptor and its reserved domain
//! variant extension.
//!
//! The packed byte holds, from the least significant bit upwards:
//! the sign flag (1 bit), the byte order flag (1 bit), the length class
//! (2 bits) and the type class (4 bits).

use crate::decode::BasicDecoder;
use crate::encode::BasicEncoder;
use crate::error::{
    DomainVariantWidthSnafu, Result, UnknownTypeClassSnafu,
};
use enbt_core::{Endian, LenClass, TypeClass, TypeDescriptor};
use snafu::ResultExt;
use std::io::{Read, Write};

/// Domain variants are reserved 56-bit values.
const DOMAIN_VARIANT_LIMIT: u64 = 1 << 56;

/// Encode a type descriptor. Domain descriptors append their variant as
/// a little-endian integer of the width named by the length class.
///
/// Returns the number of bytes written.
pub fn write_descriptor<W>(mut to: W, descriptor: TypeDescriptor) -> Result<usize>
where
    W: Write,
{
    let byte = descriptor.signed as u8
        | (descriptor.endian as u8) << 1
        | (descriptor.len as u8) << 2
        | (descriptor.class as u8) << 4;
    let encoder = BasicEncoder::le();
    encoder.encode_u8(&mut to, byte)?;
    if descriptor.class != TypeClass::Domain {
        return Ok(1);
    }
    match descriptor.len {
        LenClass::Tiny => encoder.encode_u8(&mut to, descriptor.domain_variant as u8)?,
        LenClass::Short => encoder.encode_u16(&mut to, descriptor.domain_variant as u16)?,
        LenClass::Default => encoder.encode_u32(&mut to, descriptor.domain_variant as u32)?,
        LenClass::Long => encoder.encode_u64(&mut to, descriptor.domain_variant)?,
    }
    Ok(1 + descriptor.len.byte_width() as usize)
}

/// Decode a type descriptor, validating its structural invariants.
///
/// For domain descriptors the length class is re-derived as the
/// smallest width that fits the decoded variant; variants outside the
/// reserved 56-bit space fail with a format error.
pub fn read_descriptor<S>(mut from: S) -> Result<TypeDescriptor>
where
    S: Read,
{
    let decoder = BasicDecoder::le();
    let byte = decoder.decode_u8(&mut from)?;
    let class_bits = byte >> 4;
    let class = TypeClass::from_u8(class_bits).ok_or_else(|| {
        UnknownTypeClassSnafu { value: class_bits }.build()
    })?;
    let mut descriptor = TypeDescriptor {
        class,
        len: LenClass::from_u8(byte >> 2 & 0b11).unwrap_or(LenClass::Tiny),
        endian: if byte & 0b10 != 0 {
            Endian::Big
        } else {
            Endian::Little
        },
        signed: byte & 1 != 0,
        domain_variant: 0,
    };
    if class == TypeClass::Domain {
        let variant = match descriptor.len {
            LenClass::Tiny => decoder.decode_u8(&mut from)? as u64,
            LenClass::Short => decoder.decode_u16(&mut from)? as u64,
            LenClass::Default => decoder.decode_u32(&mut from)? as u64,
            LenClass::Long => decoder.decode_u64(&mut from)?,
        };
        if variant >= DOMAIN_VARIANT_LIMIT {
            return DomainVariantWidthSnafu { variant }.fail();
        }
        descriptor.domain_variant = variant;
        descriptor.len = LenClass::fitting(variant);
    }
    descriptor
        .validate()
        .context(crate::error::MalformedDescriptorSnafu)?;
    Ok(descriptor)
}
