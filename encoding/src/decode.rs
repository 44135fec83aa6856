//! Byte-order-aware decoding of primitive scalars.
//!
//! Every ENBT value names its own byte order in its type descriptor,
//! so the decoder carries the order as run-time state instead of
//! committing to one at the type level. Count prefixes and alias ids
//! are always little endian and use [`BasicDecoder::le`].

use byteordered::{ByteOrdered, Endianness};
use std::io::Read;

type Result<T> = std::io::Result<T>;

/// A decoder of ENBT primitive scalars in the byte order named by a
/// type descriptor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BasicDecoder {
    endianness: Endianness,
}

impl BasicDecoder {
    /// Create a decoder for the given byte order.
    pub fn new(endianness: Endianness) -> Self {
        BasicDecoder { endianness }
    }

    /// A little endian decoder, the order of count prefixes and
    /// alias ids.
    pub fn le() -> Self {
        BasicDecoder::new(Endianness::Little)
    }

    /// A big endian decoder.
    pub fn be() -> Self {
        BasicDecoder::new(Endianness::Big)
    }

    /// Retrieve the byte order of this decoder.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Decode a single byte. The byte order is immaterial at this
    /// width; provided for symmetry.
    pub fn decode_u8<S>(&self, mut source: S) -> Result<u8>
    where
        S: Read,
    {
        let mut buf = [0u8; 1];
        source.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Decode an unsigned short value from the given source.
    pub fn decode_u16<S>(&self, source: S) -> Result<u16>
    where
        S: Read,
    {
        ByteOrdered::runtime(source, self.endianness).read_u16()
    }

    /// Decode an unsigned int value from the given source.
    pub fn decode_u32<S>(&self, source: S) -> Result<u32>
    where
        S: Read,
    {
        ByteOrdered::runtime(source, self.endianness).read_u32()
    }

    /// Decode an unsigned long value from the given source.
    pub fn decode_u64<S>(&self, source: S) -> Result<u64>
    where
        S: Read,
    {
        ByteOrdered::runtime(source, self.endianness).read_u64()
    }

    /// Decode a signed short value from the given source.
    pub fn decode_i16<S>(&self, source: S) -> Result<i16>
    where
        S: Read,
    {
        ByteOrdered::runtime(source, self.endianness).read_i16()
    }

    /// Decode a signed int value from the given source.
    pub fn decode_i32<S>(&self, source: S) -> Result<i32>
    where
        S: Read,
    {
        ByteOrdered::runtime(source, self.endianness).read_i32()
    }

    /// Decode a signed long value from the given source.
    pub fn decode_i64<S>(&self, source: S) -> Result<i64>
    where
        S: Read,
    {
        ByteOrdered::runtime(source, self.endianness).read_i64()
    }

    /// Decode a single precision float value from the given source.
    pub fn decode_f32<S>(&self, source: S) -> Result<f32>
    where
        S: Read,
    {
        ByteOrdered::runtime(source, self.endianness).read_f32()
    }

    /// Decode a double precision float value from the given source.
    pub fn decode_f64<S>(&self, source: S) -> Result<f64>
    where
        S: Read,
    {
        ByteOrdered::runtime(source, self.endianness).read_f64()
    }

    /// Decode a dense buffer of unsigned short values, as carried by
    /// 16-bit `sarray` payloads.
    pub fn decode_u16_into<S>(&self, source: S, target: &mut [u16]) -> Result<()>
    where
        S: Read,
    {
        ByteOrdered::runtime(source, self.endianness).read_u16_into(target)
    }

    /// Decode a dense buffer of unsigned int values, as carried by
    /// 32-bit `sarray` payloads.
    pub fn decode_u32_into<S>(&self, source: S, target: &mut [u32]) -> Result<()>
    where
        S: Read,
    {
        ByteOrdered::runtime(source, self.endianness).read_u32_into(target)
    }

    /// Decode a dense buffer of unsigned long values, as carried by
    /// 64-bit `sarray` payloads.
    pub fn decode_u64_into<S>(&self, source: S, target: &mut [u64]) -> Result<()>
    where
        S: Read,
    {
        ByteOrdered::runtime(source, self.endianness).read_u64_into(target)
    }
}

impl From<Endianness> for BasicDecoder {
    fn from(endianness: Endianness) -> Self {
        BasicDecoder::new(endianness)
    }
}
