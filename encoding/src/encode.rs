//! Byte-order-aware encoding of primitive scalars.
//!
//! Mirrors [`crate::decode`]: the byte order is run-time state taken
//! from a value's type descriptor. Count prefixes and alias ids are
//! always little endian and use [`BasicEncoder::le`].

use byteordered::{ByteOrdered, Endianness};
use std::io::Write;

type Result<T> = std::io::Result<T>;

/// An encoder of ENBT primitive scalars in the byte order named by a
/// type descriptor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BasicEncoder {
    endianness: Endianness,
}

impl BasicEncoder {
    /// Create an encoder for the given byte order.
    pub fn new(endianness: Endianness) -> Self {
        BasicEncoder { endianness }
    }

    /// A little endian encoder, the order of count prefixes and
    /// alias ids.
    pub fn le() -> Self {
        BasicEncoder::new(Endianness::Little)
    }

    /// A big endian encoder.
    pub fn be() -> Self {
        BasicEncoder::new(Endianness::Big)
    }

    /// Retrieve the byte order of this encoder.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Encode a single byte. The byte order is immaterial at this
    /// width; provided for symmetry.
    pub fn encode_u8<S>(&self, mut to: S, value: u8) -> Result<()>
    where
        S: Write,
    {
        to.write_all(&[value])
    }

    /// Encode an unsigned short value to the given destination.
    pub fn encode_u16<S>(&self, to: S, value: u16) -> Result<()>
    where
        S: Write,
    {
        ByteOrdered::runtime(to, self.endianness).write_u16(value)
    }

    /// Encode an unsigned int value to the given destination.
    pub fn encode_u32<S>(&self, to: S, value: u32) -> Result<()>
    where
        S: Write,
    {
        ByteOrdered::runtime(to, self.endianness).write_u32(value)
    }

    /// Encode an unsigned long value to the given destination.
    pub fn encode_u64<S>(&self, to: S, value: u64) -> Result<()>
    where
        S: Write,
    {
        ByteOrdered::runtime(to, self.endianness).write_u64(value)
    }

    /// Encode a signed short value to the given destination.
    pub fn encode_i16<S>(&self, to: S, value: i16) -> Result<()>
    where
        S: Write,
    {
        ByteOrdered::runtime(to, self.endianness).write_i16(value)
    }

    /// Encode a signed int value to the given destination.
    pub fn encode_i32<S>(&self, to: S, value: i32) -> Result<()>
    where
        S: Write,
    {
        ByteOrdered::runtime(to, self.endianness).write_i32(value)
    }

    /// Encode a signed long value to the given destination.
    pub fn encode_i64<S>(&self, to: S, value: i64) -> Result<()>
    where
        S: Write,
    {
        ByteOrdered::runtime(to, self.endianness).write_i64(value)
    }

    /// Encode a single precision float value to the given destination.
    pub fn encode_f32<S>(&self, to: S, value: f32) -> Result<()>
    where
        S: Write,
    {
        ByteOrdered::runtime(to, self.endianness).write_f32(value)
    }

    /// Encode a double precision float value to the given destination.
    pub fn encode_f64<S>(&self, to: S, value: f64) -> Result<()>
    where
        S: Write,
    {
        ByteOrdered::runtime(to, self.endianness).write_f64(value)
    }

    /// Encode a dense buffer of unsigned short values, as carried by
    /// 16-bit `sarray` payloads.
    pub fn encode_u16_slice<S>(&self, to: S, values: &[u16]) -> Result<()>
    where
        S: Write,
    {
        let mut ordered = ByteOrdered::runtime(to, self.endianness);
        for &value in values {
            ordered.write_u16(value)?;
        }
        Ok(())
    }

    /// Encode a dense buffer of unsigned int values, as carried by
    /// 32-bit `sarray` payloads.
    pub fn encode_u32_slice<S>(&self, to: S, values: &[u32]) -> Result<()>
    where
        S: Write,
    {
        let mut ordered = ByteOrdered::runtime(to, self.endianness);
        for &value in values {
            ordered.write_u32(value)?;
        }
        Ok(())
    }

    /// Encode a dense buffer of unsigned long values, as carried by
    /// 64-bit `sarray` payloads.
    pub fn encode_u64_slice<S>(&self, to: S, values: &[u64]) -> Result<()>
    where
        S: Write,
    {
        let mut ordered = ByteOrdered::runtime(to, self.endianness);
        for &value in values {
            ordered.write_u64(value)?;
        }
        Ok(())
    }
}

impl From<Endianness> for BasicEncoder {
    fn from(endianness: Endianness) -> Self {
        BasicEncoder::new(endianness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::BasicDecoder;

    #[test]
    fn scalar_payloads_follow_the_declared_order() {
        let mut le = Vec::new();
        BasicEncoder::le().encode_i32(&mut le, -7).unwrap();
        assert_eq!(le, [0xF9, 0xFF, 0xFF, 0xFF]);

        let mut be = Vec::new();
        BasicEncoder::be().encode_i32(&mut be, -7).unwrap();
        assert_eq!(be, [0xFF, 0xFF, 0xFF, 0xF9]);

        let mut out = Vec::new();
        BasicEncoder::be().encode_f64(&mut out, 1.5).unwrap();
        assert_eq!(out, 1.5f64.to_be_bytes());
    }

    #[test]
    fn alias_ids_are_two_little_endian_bytes() {
        let mut out = Vec::new();
        BasicEncoder::le().encode_u16(&mut out, 0x0102).unwrap();
        assert_eq!(out, [0x02, 0x01]);
    }

    #[test]
    fn dense_buffers_encode_per_element() {
        // the payload of a 16-bit sarray holding [-5, 0, 5, 500]
        let elements = [-5i16, 0, 5, 500].map(|v| v as u16);

        let mut out = Vec::new();
        BasicEncoder::le().encode_u16_slice(&mut out, &elements).unwrap();
        assert_eq!(out, [0xFB, 0xFF, 0x00, 0x00, 0x05, 0x00, 0xF4, 0x01]);

        out.clear();
        BasicEncoder::be().encode_u16_slice(&mut out, &elements).unwrap();
        assert_eq!(out, [0xFF, 0xFB, 0x00, 0x00, 0x00, 0x05, 0x01, 0xF4]);
    }

    #[test]
    fn buffers_roundtrip_through_the_decoder() {
        let elements = [1u32, 1 << 8, 1 << 16, 1 << 24];
        for encoder in [BasicEncoder::le(), BasicEncoder::be()] {
            let mut out = Vec::new();
            encoder.encode_u32_slice(&mut out, &elements).unwrap();

            let mut back = [0u32; 4];
            BasicDecoder::new(encoder.endianness())
                .decode_u32_into(&out[..], &mut back)
                .unwrap();
            assert_eq!(back, elements);
        }
    }
}
