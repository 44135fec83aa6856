//! Stepping over tokens without decoding them.
//!
//! Arrays of fixed-width elements are skipped by computing their byte
//! size and seeking; everything else recurses through its children.

use crate::read::{DecodeDataSnafu, ReadValueDataSnafu, Result, SeekReaderSnafu};
use enbt_core::{LenClass, TypeClass, TypeDescriptor};
use enbt_encoding::varint::{read_var_u32, read_var_u64};
use enbt_encoding::{read_compressed_len, read_define_len, read_descriptor, BasicDecoder};
use snafu::ResultExt;
use std::io::{Read, Seek, SeekFrom};

/// The payload byte width of descriptors whose array elements can be
/// addressed by offset arithmetic: fixed-width integers and floats,
/// UUIDs, and packed bits (one per bit). Returns zero for everything
/// else.
pub fn fast_index_width(descriptor: TypeDescriptor) -> u8 {
    match descriptor.class {
        TypeClass::Integer | TypeClass::Floating => descriptor.len.byte_width(),
        TypeClass::Uuid => 16,
        TypeClass::Bit => 1,
        _ => 0,
    }
}

fn advance<S>(from: &mut S, bytes: u64) -> Result<()>
where
    S: Read + Seek,
{
    from.seek(SeekFrom::Current(bytes as i64))
        .context(SeekReaderSnafu)?;
    Ok(())
}

/// Step over one full token.
pub fn skip_token<S>(from: &mut S) -> Result<()>
where
    S: Read + Seek,
{
    let descriptor = read_descriptor(&mut *from).context(DecodeDataSnafu)?;
    skip_value(from, descriptor)
}

/// Step over the payload of an already decoded descriptor.
pub fn skip_value<S>(from: &mut S, descriptor: TypeDescriptor) -> Result<()>
where
    S: Read + Seek,
{
    match descriptor.class {
        TypeClass::None
        | TypeClass::Bit
        | TypeClass::ReservedVector
        | TypeClass::Domain => Ok(()),
        TypeClass::Integer | TypeClass::Floating => {
            advance(from, descriptor.len.byte_width() as u64)
        }
        TypeClass::VarInteger => {
            // variable bytes, must be decoded to find the end
            if descriptor.len == LenClass::Default {
                read_var_u32(&mut *from).context(DecodeDataSnafu)?;
            } else {
                read_var_u64(&mut *from).context(DecodeDataSnafu)?;
            }
            Ok(())
        }
        TypeClass::Uuid => advance(from, 16),
        TypeClass::SArray => {
            let count = read_compressed_len(&mut *from).context(DecodeDataSnafu)?;
            advance(from, count * descriptor.len.byte_width() as u64)
        }
        TypeClass::Array => skip_array(from, descriptor),
        TypeClass::DArray => {
            let count = read_define_len(&mut *from, descriptor).context(DecodeDataSnafu)?;
            for _ in 0..count {
                skip_token(from)?;
            }
            Ok(())
        }
        TypeClass::Compound => skip_compound(from, descriptor),
        TypeClass::Structure => {
            let arity = BasicDecoder::le()
                .decode_u8(&mut *from)
                .context(ReadValueDataSnafu)?;
            let mut fields = Vec::with_capacity(arity as usize);
            for _ in 0..arity {
                fields.push(read_descriptor(&mut *from).context(DecodeDataSnafu)?);
            }
            for field in fields {
                skip_value(from, field)?;
            }
            Ok(())
        }
        TypeClass::Optional => {
            if descriptor.signed {
                skip_token(from)
            } else {
                Ok(())
            }
        }
        TypeClass::LogItem => {
            let size = read_compressed_len(&mut *from).context(DecodeDataSnafu)?;
            advance(from, size)
        }
    }
}

fn skip_array<S>(from: &mut S, descriptor: TypeDescriptor) -> Result<()>
where
    S: Read + Seek,
{
    let count = read_define_len(&mut *from, descriptor).context(DecodeDataSnafu)?;
    if count == 0 {
        return Ok(());
    }
    let element = read_descriptor(&mut *from).context(DecodeDataSnafu)?;
    if element.class == TypeClass::Bit {
        advance(from, (count + 7) / 8)
    } else {
        let width = fast_index_width(element);
        if width != 0 {
            advance(from, count * width as u64)
        } else {
            for _ in 0..count {
                skip_value(from, element)?;
            }
            Ok(())
        }
    }
}

fn skip_compound<S>(from: &mut S, descriptor: TypeDescriptor) -> Result<()>
where
    S: Read + Seek,
{
    let count = read_define_len(&mut *from, descriptor).context(DecodeDataSnafu)?;
    for _ in 0..count {
        if descriptor.signed {
            advance(from, 2)?;
        } else {
            let key_len = read_compressed_len(&mut *from).context(DecodeDataSnafu)?;
            advance(from, key_len)?;
        }
        skip_token(from)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::write_token;
    use enbt_core::Value;
    use std::io::Cursor;

    fn assert_skip_matches_encoding(value: &Value) {
        let mut bytes = Vec::new();
        write_token(&mut bytes, value).unwrap();
        let encoded = bytes.len() as u64;
        // trailing sentinel to prove the skip does not overrun
        bytes.extend_from_slice(&[0xAB; 3]);

        let mut source = Cursor::new(bytes);
        skip_token(&mut source).unwrap();
        assert_eq!(source.position(), encoded, "skipped {:?}", value);
    }

    #[test]
    fn skip_advances_exactly_one_token() {
        let mut compound = Value::compound();
        compound.insert("xs", Value::from(vec![1u16, 2, 3])).unwrap();
        compound
            .insert("opt", Value::optional(Some(Value::from(-1i64))))
            .unwrap();

        let values = [
            Value::none(),
            Value::bit(true),
            Value::from(-3i16),
            Value::from(1.5f64),
            Value::var_i64(-1),
            Value::var_u32(300),
            Value::from("seven"),
            Value::from(&[1u64, 2, 3][..]),
            Value::array(vec![Value::from(1u8), Value::from(2u8)]).unwrap(),
            Value::array((0..11).map(|i| Value::bit(i % 3 == 0)).collect()).unwrap(),
            Value::array(vec![Value::from("a"), Value::from("b")]).unwrap(),
            Value::darray(vec![Value::from(1u8), Value::from("x")]),
            compound,
            Value::optional(None),
            Value::structure(vec![Value::from(1u8), Value::from("f")]).unwrap(),
            Value::log_item(Value::from("payload")),
        ];
        for value in &values {
            assert_skip_matches_encoding(value);
        }
    }

    #[test]
    fn fast_index_widths() {
        use enbt_core::{Endian, LenClass};
        let int = |len| TypeDescriptor::new(TypeClass::Integer, len, Endian::Little, false);
        assert_eq!(fast_index_width(int(LenClass::Tiny)), 1);
        assert_eq!(fast_index_width(int(LenClass::Long)), 8);
        assert_eq!(
            fast_index_width(TypeDescriptor::of(TypeClass::Uuid)),
            16
        );
        assert_eq!(fast_index_width(TypeDescriptor::of(TypeClass::SArray)), 0);
        assert_eq!(fast_index_width(TypeDescriptor::of(TypeClass::Compound)), 0);
    }
}
