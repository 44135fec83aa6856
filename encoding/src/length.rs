//! Length prefix codecs.
//!
//! Two encodings exist on the wire. The *define length* is a plain
//! unsigned integer whose byte width is named by the container
//! descriptor's length class; it is always little endian regardless of
//! the descriptor's byte order flag. The *compressed length* is a
//! self-describing 1/2/4/8-byte unsigned integer whose first byte
//! carries the width class in its two high bits; the remaining bits
//! hold the value in big-endian byte order.

use crate::decode::BasicDecoder;
use crate::encode::BasicEncoder;
use crate::error::{CountOverflowSnafu, LengthOverflowSnafu, Result};
use enbt_core::{LenClass, TypeDescriptor};
use std::io::{Read, Write};

/// Write a container count in the width declared by the descriptor's
/// length class. Fails with an overflow error when the count does not
/// fit that width.
pub fn write_define_len<W>(mut to: W, len: u64, descriptor: TypeDescriptor) -> Result<()>
where
    W: Write,
{
    if len > descriptor.len.max_count() {
        return CountOverflowSnafu {
            count: len,
            len: descriptor.len,
        }
        .fail();
    }
    let encoder = BasicEncoder::le();
    match descriptor.len {
        LenClass::Tiny => encoder.encode_u8(&mut to, len as u8)?,
        LenClass::Short => encoder.encode_u16(&mut to, len as u16)?,
        LenClass::Default => encoder.encode_u32(&mut to, len as u32)?,
        LenClass::Long => encoder.encode_u64(&mut to, len)?,
    }
    Ok(())
}

/// Read a container count in the width declared by the descriptor's
/// length class.
pub fn read_define_len<S>(mut from: S, descriptor: TypeDescriptor) -> Result<u64>
where
    S: Read,
{
    let decoder = BasicDecoder::le();
    Ok(match descriptor.len {
        LenClass::Tiny => decoder.decode_u8(&mut from)? as u64,
        LenClass::Short => decoder.decode_u16(&mut from)? as u64,
        LenClass::Default => decoder.decode_u32(&mut from)? as u64,
        LenClass::Long => decoder.decode_u64(&mut from)?,
    })
}

/// Write a self-describing compressed length, picking the smallest
/// width class that fits the value. Values of 2⁶² and above fail with
/// an overflow error.
///
/// Returns the number of bytes written.
pub fn write_compressed_len<W>(mut to: W, value: u64) -> Result<usize>
where
    W: Write,
{
    let encoder = BasicEncoder::be();
    if value < 1 << 6 {
        encoder.encode_u8(&mut to, value as u8)?;
        Ok(1)
    } else if value < 1 << 14 {
        encoder.encode_u16(&mut to, value as u16 | 1 << 14)?;
        Ok(2)
    } else if value < 1 << 30 {
        encoder.encode_u32(&mut to, value as u32 | 2 << 30)?;
        Ok(4)
    } else if value < 1 << 62 {
        encoder.encode_u64(&mut to, value | 3 << 62)?;
        Ok(8)
    } else {
        LengthOverflowSnafu { value }.fail()
    }
}

/// Read a self-describing compressed length. The two high bits of the
/// first byte select the total width, the rest is the value in
/// big-endian byte order.
pub fn read_compressed_len<S>(mut from: S) -> Result<u64>
where
    S: Read,
{
    let mut first = [0u8; 1];
    from.read_exact(&mut first)?;
    let class = first[0] >> 6;
    let head = (first[0] & 0x3F) as u64;
    let tail_len = match class {
        0 => return Ok(head),
        1 => 1,
        2 => 3,
        _ => 7,
    };
    let mut tail = [0u8; 7];
    from.read_exact(&mut tail[..tail_len])?;
    let mut value = head;
    for byte in &tail[..tail_len] {
        value = value << 8 | *byte as u64;
    }
    Ok(value)
}

/// The number of bytes a compressed length for `value` occupies.
pub fn compressed_len_width(value: u64) -> Result<usize> {
    if value < 1 << 6 {
        Ok(1)
    } else if value < 1 << 14 {
        Ok(2)
    } else if value < 1 << 30 {
        Ok(4)
    } else if value < 1 << 62 {
        Ok(8)
    } else {
        LengthOverflowSnafu { value }.fail()
    }
}
