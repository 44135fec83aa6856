//! Token reader for ENBT streams.
//!
//! This module materializes full [`Value`] trees out of a source. The
//! non-materializing layers live in [`crate::skip`] (stepping over
//! tokens), [`crate::cursor`] (pull-style reading) and
//! [`crate::lookup`] (sequential search and path lookup).

use enbt_core::alias::{self, AliasError};
use enbt_core::value::C;
use enbt_core::{
    InvalidDescriptorError, LenClass, Payload, TypeClass, TypeDescriptor, Value, VERSION,
};
use enbt_encoding::varint::{read_var_u32, read_var_u64};
use enbt_encoding::{
    endianness_of, read_compressed_len, read_define_len, read_descriptor, BasicDecoder,
};
use smallvec::SmallVec;
use snafu::{Backtrace, ResultExt, Snafu};
use std::io::Read;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    /// The stream version byte is not the supported `0x10`.
    #[snafu(display("unsupported stream version {:#04x}", version))]
    UnsupportedVersion { version: u8, backtrace: Backtrace },

    /// A wire primitive could not be decoded.
    #[snafu(display("failed to decode a data piece"))]
    DecodeData {
        #[snafu(backtrace)]
        source: enbt_encoding::Error,
    },

    /// Raw payload bytes could not be read.
    #[snafu(display("could not read value data from source"))]
    ReadValueData {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// The source rejected a cursor move.
    #[snafu(display("could not move source cursor"))]
    SeekReader {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// The decoded payload does not agree with its descriptor.
    #[snafu(display("decoded value is inconsistent with its descriptor"))]
    InvalidValue {
        source: InvalidDescriptorError,
        backtrace: Backtrace,
    },

    /// A compound key or ASN entry is not valid UTF-8.
    #[snafu(display("string data is not valid UTF-8"))]
    InvalidString {
        source: std::string::FromUtf8Error,
        backtrace: Backtrace,
    },

    /// The descriptor names a reserved type class with no payload
    /// semantics.
    #[snafu(display("{:?} values cannot be materialized", class))]
    Reserved {
        class: TypeClass,
        backtrace: Backtrace,
    },

    /// An element index points past the end of a container.
    #[snafu(display("index {} is out of range of container of {} elements", index, len))]
    OutOfRange {
        index: u64,
        len: u64,
        backtrace: Backtrace,
    },

    /// A compound has no entry under the requested key.
    #[snafu(display("compound has no entry `{}`", key))]
    KeyNotFound { key: String, backtrace: Backtrace },

    /// The cursor points at a different type class than the operation
    /// requires.
    #[snafu(display("expected {} value, found {:?}", expected, class))]
    UnexpectedClass {
        expected: &'static str,
        class: TypeClass,
        backtrace: Backtrace,
    },

    /// An alias table lookup failed.
    #[snafu(display("alias table lookup failed"))]
    Alias {
        source: AliasError,
        backtrace: Backtrace,
    },

    /// A path segment does not fit the value it addresses.
    #[snafu(display("path segment `{}` cannot address a {:?} value", segment, class))]
    PathMismatch {
        segment: String,
        class: TypeClass,
        backtrace: Backtrace,
    },

    /// A cursor was used after its value had been consumed.
    #[snafu(display("the current value has already been consumed"))]
    AlreadyConsumed { backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Read the stream version byte, accepting exactly `0x10`.
pub fn check_version<S>(from: &mut S) -> Result<()>
where
    S: Read,
{
    let version = BasicDecoder::le()
        .decode_u8(from)
        .context(ReadValueDataSnafu)?;
    if version != VERSION {
        return UnsupportedVersionSnafu { version }.fail();
    }
    tracing::trace!(version, "stream version accepted");
    Ok(())
}

/// Read one full token: a type descriptor followed by its payload.
pub fn read_token<S>(from: &mut S) -> Result<Value>
where
    S: Read,
{
    let descriptor = read_descriptor(&mut *from).context(DecodeDataSnafu)?;
    read_value(from, descriptor)
}

/// Read the version byte and the single token that follows it.
pub fn read_file<S>(from: &mut S) -> Result<Value>
where
    S: Read,
{
    check_version(from)?;
    read_token(from)
}

/// Read a payload for an already decoded descriptor.
pub fn read_value<S>(from: &mut S, descriptor: TypeDescriptor) -> Result<Value>
where
    S: Read,
{
    descriptor.validate().context(InvalidValueSnafu)?;
    let basic = BasicDecoder::new(endianness_of(descriptor.endian));
    let payload = match descriptor.class {
        TypeClass::None => Payload::Empty,
        TypeClass::Bit => Payload::Bool(descriptor.signed),
        TypeClass::Integer => match (descriptor.len, descriptor.signed) {
            (LenClass::Tiny, true) => {
                Payload::I8(basic.decode_u8(&mut *from).context(ReadValueDataSnafu)? as i8)
            }
            (LenClass::Tiny, false) => {
                Payload::U8(basic.decode_u8(&mut *from).context(ReadValueDataSnafu)?)
            }
            (LenClass::Short, true) => {
                Payload::I16(basic.decode_i16(&mut *from).context(ReadValueDataSnafu)?)
            }
            (LenClass::Short, false) => {
                Payload::U16(basic.decode_u16(&mut *from).context(ReadValueDataSnafu)?)
            }
            (LenClass::Default, true) => {
                Payload::I32(basic.decode_i32(&mut *from).context(ReadValueDataSnafu)?)
            }
            (LenClass::Default, false) => {
                Payload::U32(basic.decode_u32(&mut *from).context(ReadValueDataSnafu)?)
            }
            (LenClass::Long, true) => {
                Payload::I64(basic.decode_i64(&mut *from).context(ReadValueDataSnafu)?)
            }
            (LenClass::Long, false) => {
                Payload::U64(basic.decode_u64(&mut *from).context(ReadValueDataSnafu)?)
            }
        },
        TypeClass::Floating => match descriptor.len {
            LenClass::Default => {
                Payload::F32(basic.decode_f32(&mut *from).context(ReadValueDataSnafu)?)
            }
            _ => Payload::F64(basic.decode_f64(&mut *from).context(ReadValueDataSnafu)?),
        },
        TypeClass::VarInteger => match (descriptor.len, descriptor.signed) {
            (LenClass::Default, true) => {
                Payload::I32(read_var_u32(&mut *from).context(DecodeDataSnafu)? as i32)
            }
            (LenClass::Default, false) => {
                Payload::U32(read_var_u32(&mut *from).context(DecodeDataSnafu)?)
            }
            (_, true) => {
                Payload::I64(read_var_u64(&mut *from).context(DecodeDataSnafu)? as i64)
            }
            (_, false) => Payload::U64(read_var_u64(&mut *from).context(DecodeDataSnafu)?),
        },
        TypeClass::Uuid => {
            let mut bytes = [0u8; 16];
            from.read_exact(&mut bytes).context(ReadValueDataSnafu)?;
            if descriptor.endian == enbt_core::Endian::Little {
                bytes.reverse();
            }
            Payload::Uuid(uuid::Uuid::from_bytes(bytes))
        }
        TypeClass::SArray => {
            let count = read_compressed_len(&mut *from).context(DecodeDataSnafu)? as usize;
            match descriptor.len {
                LenClass::Tiny => {
                    let mut buf = SmallVec::from_elem(0u8, count);
                    from.read_exact(&mut buf).context(ReadValueDataSnafu)?;
                    Payload::U8Buf(buf)
                }
                LenClass::Short => {
                    let mut buf = SmallVec::from_elem(0u16, count);
                    basic
                        .decode_u16_into(&mut *from, &mut buf)
                        .context(ReadValueDataSnafu)?;
                    Payload::U16Buf(buf)
                }
                LenClass::Default => {
                    let mut buf = SmallVec::from_elem(0u32, count);
                    basic
                        .decode_u32_into(&mut *from, &mut buf)
                        .context(ReadValueDataSnafu)?;
                    Payload::U32Buf(buf)
                }
                LenClass::Long => {
                    let mut buf = SmallVec::from_elem(0u64, count);
                    basic
                        .decode_u64_into(&mut *from, &mut buf)
                        .context(ReadValueDataSnafu)?;
                    Payload::U64Buf(buf)
                }
            }
        }
        TypeClass::Array => read_array_items(from, descriptor)?,
        TypeClass::DArray => {
            let count = read_define_len(&mut *from, descriptor).context(DecodeDataSnafu)?;
            let mut items = C::new();
            for _ in 0..count {
                items.push(read_token(from)?);
            }
            Payload::Items(Box::new(items))
        }
        TypeClass::Compound => {
            let count = read_define_len(&mut *from, descriptor).context(DecodeDataSnafu)?;
            if descriptor.signed {
                let le = BasicDecoder::le();
                let mut entries = std::collections::HashMap::new();
                for _ in 0..count {
                    let key = le.decode_u16(&mut *from).context(ReadValueDataSnafu)?;
                    entries.insert(key, read_token(from)?);
                }
                Payload::AliasedEntries(entries)
            } else {
                let mut entries = std::collections::HashMap::new();
                for _ in 0..count {
                    let key = read_string(from)?;
                    entries.insert(key, read_token(from)?);
                }
                Payload::NamedEntries(entries)
            }
        }
        TypeClass::Structure => {
            let arity = BasicDecoder::le()
                .decode_u8(&mut *from)
                .context(ReadValueDataSnafu)?;
            let mut fields = Vec::with_capacity(arity as usize);
            for _ in 0..arity {
                fields.push(read_descriptor(&mut *from).context(DecodeDataSnafu)?);
            }
            let mut items = C::new();
            for field in fields {
                items.push(read_value(from, field)?);
            }
            Payload::Items(Box::new(items))
        }
        TypeClass::Optional => {
            if descriptor.signed {
                Payload::Child(Some(Box::new(read_token(from)?)))
            } else {
                Payload::Child(None)
            }
        }
        TypeClass::LogItem => {
            read_compressed_len(&mut *from).context(DecodeDataSnafu)?;
            Payload::Child(Some(Box::new(read_token(from)?)))
        }
        class @ (TypeClass::ReservedVector | TypeClass::Domain) => {
            return ReservedSnafu { class }.fail();
        }
    };
    Value::new(descriptor, payload).context(InvalidValueSnafu)
}

/// Read an inline compound key: a compressed length followed by that
/// many UTF-8 bytes.
pub fn read_string<S>(from: &mut S) -> Result<String>
where
    S: Read,
{
    let len = read_compressed_len(&mut *from).context(DecodeDataSnafu)? as usize;
    let mut bytes = vec![0u8; len];
    from.read_exact(&mut bytes).context(ReadValueDataSnafu)?;
    String::from_utf8(bytes).context(InvalidStringSnafu)
}

/// Read an associated-strings ("ASN") stream and install its contents
/// as the global alias table.
pub fn read_asn_strings<S>(from: &mut S) -> Result<()>
where
    S: Read,
{
    check_version(from)?;
    let count = BasicDecoder::le()
        .decode_u16(&mut *from)
        .context(ReadValueDataSnafu)?;
    let mut strings = Vec::with_capacity(count as usize);
    let mut buf = Vec::new();
    for _ in 0..count {
        buf.clear();
        loop {
            let byte = BasicDecoder::le()
                .decode_u8(&mut *from)
                .context(ReadValueDataSnafu)?;
            if byte == 0 {
                break;
            }
            buf.push(byte);
        }
        strings.push(String::from_utf8(buf.clone()).context(InvalidStringSnafu)?);
    }
    tracing::debug!(count, "loaded associated strings");
    alias::set_alias_strings(strings).context(AliasSnafu)
}

fn read_array_items<S>(from: &mut S, descriptor: TypeDescriptor) -> Result<Payload>
where
    S: Read,
{
    let count = read_define_len(&mut *from, descriptor).context(DecodeDataSnafu)?;
    let mut items = C::new();
    if count == 0 {
        return Ok(Payload::Items(Box::new(items)));
    }
    let element = read_descriptor(&mut *from).context(DecodeDataSnafu)?;
    if element.class == TypeClass::Bit {
        let mut bytes = vec![0u8; ((count + 7) / 8) as usize];
        from.read_exact(&mut bytes).context(ReadValueDataSnafu)?;
        for i in 0..count {
            let bit = bytes[(i / 8) as usize] >> (i % 8) & 1 == 1;
            items.push(Value::bit(bit));
        }
    } else {
        for _ in 0..count {
            items.push(read_value(from, element)?);
        }
    }
    Ok(Payload::Items(Box::new(items)))
}
