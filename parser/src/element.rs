//! Native element types of packed dense arrays.

use enbt_core::{Endian, LenClass, TypeClass, TypeDescriptor};
use enbt_encoding::{BasicDecoder, BasicEncoder};
use std::io::{Read, Write};

/// An integer type that can live in an ENBT dense array (`sarray`).
///
/// Implementations tie the native type to its length class and sign
/// flag, and move single elements through the byte-order-aware basic
/// codecs.
pub trait SArrayElement: Copy {
    /// The length class of this element type.
    const LEN: LenClass;
    /// Whether this element type is signed.
    const SIGNED: bool;

    /// The descriptor of a dense array of this element type in the
    /// given byte order.
    fn array_descriptor(endian: Endian) -> TypeDescriptor {
        TypeDescriptor::new(TypeClass::SArray, Self::LEN, endian, Self::SIGNED)
    }

    /// Decode one element from the source.
    fn decode<S: Read>(basic: &BasicDecoder, source: S) -> std::io::Result<Self>;

    /// Encode one element to the destination.
    fn encode<W: Write>(basic: &BasicEncoder, to: W, value: Self) -> std::io::Result<()>;
}

macro_rules! impl_sarray_element {
    ($typ:ty, $len:expr, $signed:expr, $dec:ident, $enc:ident) => {
        impl SArrayElement for $typ {
            const LEN: LenClass = $len;
            const SIGNED: bool = $signed;

            fn decode<S: Read>(basic: &BasicDecoder, source: S) -> std::io::Result<Self> {
                basic.$dec(source)
            }

            fn encode<W: Write>(
                basic: &BasicEncoder,
                to: W,
                value: Self,
            ) -> std::io::Result<()> {
                basic.$enc(to, value)
            }
        }
    };
}

impl SArrayElement for u8 {
    const LEN: LenClass = LenClass::Tiny;
    const SIGNED: bool = false;

    fn decode<S: Read>(basic: &BasicDecoder, source: S) -> std::io::Result<Self> {
        basic.decode_u8(source)
    }

    fn encode<W: Write>(basic: &BasicEncoder, to: W, value: Self) -> std::io::Result<()> {
        basic.encode_u8(to, value)
    }
}

impl SArrayElement for i8 {
    const LEN: LenClass = LenClass::Tiny;
    const SIGNED: bool = true;

    fn decode<S: Read>(basic: &BasicDecoder, source: S) -> std::io::Result<Self> {
        Ok(basic.decode_u8(source)? as i8)
    }

    fn encode<W: Write>(basic: &BasicEncoder, to: W, value: Self) -> std::io::Result<()> {
        basic.encode_u8(to, value as u8)
    }
}

impl_sarray_element!(u16, LenClass::Short, false, decode_u16, encode_u16);
impl_sarray_element!(i16, LenClass::Short, true, decode_i16, encode_i16);
impl_sarray_element!(u32, LenClass::Default, false, decode_u32, encode_u32);
impl_sarray_element!(i32, LenClass::Default, true, decode_i32, encode_i32);
impl_sarray_element!(u64, LenClass::Long, false, decode_u64, encode_u64);
impl_sarray_element!(i64, LenClass::Long, true, decode_i64, encode_i64);
