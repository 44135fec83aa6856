//! Token writer for ENBT streams.
//!
//! The free functions emit fully materialized [`Value`] trees as
//! self-describing tokens. [`ValueWriteStream`] is the builder-style
//! surface for producing containers incrementally: compound and darray
//! builders reserve their count prefix and back-patch it on `finish`,
//! which is why the sink must be seekable.

use crate::element::SArrayElement;
use enbt_core::{alias, Endian, LenClass, Payload, TypeClass, TypeDescriptor, Value, VERSION};
use enbt_encoding::varint::{write_var_u32, write_var_u64};
use enbt_encoding::{
    endianness_of, write_compressed_len, write_define_len, write_descriptor, BasicEncoder,
};
use snafu::{Backtrace, ResultExt, Snafu};
use std::io::{Seek, SeekFrom, Write};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// A wire primitive could not be encoded.
    #[snafu(display("failed to encode a data piece"))]
    EncodeData {
        #[snafu(backtrace)]
        source: enbt_encoding::Error,
    },

    /// Raw payload bytes could not be written.
    #[snafu(display("could not write value data to writer"))]
    WriteValueData {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// The sink rejected a cursor move while back-patching.
    #[snafu(display("could not move sink cursor"))]
    SeekWriter {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// A homogeneous array builder received a mismatching element.
    #[snafu(display(
        "array of {:?} elements cannot hold an element described as {:?}",
        expected,
        got
    ))]
    ElementMismatch {
        expected: TypeDescriptor,
        got: TypeDescriptor,
        backtrace: Backtrace,
    },

    /// An array builder received more elements than it was opened for.
    #[snafu(display("array is full"))]
    ArrayFull { backtrace: Backtrace },

    /// An array builder was finished before all declared elements
    /// were written.
    #[snafu(display("array is missing {} declared elements", remaining))]
    MissingElements { remaining: u64, backtrace: Backtrace },

    /// The value's type class has no wire representation.
    #[snafu(display("{:?} values cannot be written", class))]
    Unwritable {
        class: TypeClass,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Write the one-byte stream version header.
pub fn write_version<W>(mut to: W) -> Result<()>
where
    W: Write,
{
    to.write_all(&[VERSION]).context(WriteValueDataSnafu)
}

/// Write one full token: the value's type descriptor followed by its
/// payload.
pub fn write_token<W>(to: &mut W, value: &Value) -> Result<()>
where
    W: Write,
{
    write_descriptor(&mut *to, value.descriptor()).context(EncodeDataSnafu)?;
    write_value(to, value)
}

/// Write a value's payload, assuming its descriptor has already been
/// emitted.
pub fn write_value<W>(to: &mut W, value: &Value) -> Result<()>
where
    W: Write,
{
    let descriptor = value.descriptor();
    let basic = BasicEncoder::new(endianness_of(descriptor.endian));
    match (descriptor.class, value.payload()) {
        (TypeClass::None | TypeClass::Bit | TypeClass::ReservedVector, _) => Ok(()),
        (TypeClass::Integer, payload) => {
            match payload {
                Payload::I8(v) => basic.encode_u8(to, *v as u8),
                Payload::U8(v) => basic.encode_u8(to, *v),
                Payload::I16(v) => basic.encode_i16(to, *v),
                Payload::U16(v) => basic.encode_u16(to, *v),
                Payload::I32(v) => basic.encode_i32(to, *v),
                Payload::U32(v) => basic.encode_u32(to, *v),
                Payload::I64(v) => basic.encode_i64(to, *v),
                Payload::U64(v) => basic.encode_u64(to, *v),
                _ => return UnwritableSnafu { class: descriptor.class }.fail(),
            }
            .context(WriteValueDataSnafu)
        }
        (TypeClass::Floating, Payload::F32(v)) => {
            basic.encode_f32(to, *v).context(WriteValueDataSnafu)
        }
        (TypeClass::Floating, Payload::F64(v)) => {
            basic.encode_f64(to, *v).context(WriteValueDataSnafu)
        }
        (TypeClass::VarInteger, payload) => {
            match payload {
                Payload::I32(v) => write_var_u32(to, *v as u32),
                Payload::U32(v) => write_var_u32(to, *v),
                Payload::I64(v) => write_var_u64(to, *v as u64),
                Payload::U64(v) => write_var_u64(to, *v),
                _ => return UnwritableSnafu { class: descriptor.class }.fail(),
            }
            .map(|_| ())
            .context(EncodeDataSnafu)
        }
        (TypeClass::Uuid, Payload::Uuid(u)) => {
            let mut bytes = *u.as_bytes();
            if descriptor.endian == Endian::Little {
                bytes.reverse();
            }
            to.write_all(&bytes).context(WriteValueDataSnafu)
        }
        (TypeClass::SArray, payload) => {
            match payload {
                Payload::U8Buf(buf) => {
                    write_compressed_len(&mut *to, buf.len() as u64).context(EncodeDataSnafu)?;
                    to.write_all(buf).context(WriteValueDataSnafu)
                }
                Payload::U16Buf(buf) => {
                    write_compressed_len(&mut *to, buf.len() as u64).context(EncodeDataSnafu)?;
                    basic.encode_u16_slice(to, buf).context(WriteValueDataSnafu)
                }
                Payload::U32Buf(buf) => {
                    write_compressed_len(&mut *to, buf.len() as u64).context(EncodeDataSnafu)?;
                    basic.encode_u32_slice(to, buf).context(WriteValueDataSnafu)
                }
                Payload::U64Buf(buf) => {
                    write_compressed_len(&mut *to, buf.len() as u64).context(EncodeDataSnafu)?;
                    basic.encode_u64_slice(to, buf).context(WriteValueDataSnafu)
                }
                _ => UnwritableSnafu { class: descriptor.class }.fail(),
            }
        }
        (TypeClass::Array, Payload::Items(items)) => write_array(to, descriptor, items),
        (TypeClass::DArray, Payload::Items(items)) => {
            write_define_len(&mut *to, items.len() as u64, descriptor).context(EncodeDataSnafu)?;
            for item in items.iter() {
                write_token(to, item)?;
            }
            Ok(())
        }
        (TypeClass::Compound, Payload::AliasedEntries(entries)) => {
            write_define_len(&mut *to, entries.len() as u64, descriptor)
                .context(EncodeDataSnafu)?;
            let le = BasicEncoder::le();
            for (alias, item) in entries {
                le.encode_u16(&mut *to, *alias).context(WriteValueDataSnafu)?;
                write_token(to, item)?;
            }
            Ok(())
        }
        (TypeClass::Compound, Payload::NamedEntries(entries)) => {
            write_define_len(&mut *to, entries.len() as u64, descriptor)
                .context(EncodeDataSnafu)?;
            for (name, item) in entries {
                write_string(to, name)?;
                write_token(to, item)?;
            }
            Ok(())
        }
        (TypeClass::Structure, Payload::Items(fields)) => {
            to.write_all(&[fields.len() as u8]).context(WriteValueDataSnafu)?;
            for field in fields.iter() {
                write_descriptor(&mut *to, field.descriptor()).context(EncodeDataSnafu)?;
            }
            for field in fields.iter() {
                write_value(to, field)?;
            }
            Ok(())
        }
        (TypeClass::Optional, Payload::Child(child)) => match child {
            Some(child) => write_token(to, child),
            None => Ok(()),
        },
        (TypeClass::LogItem, Payload::Child(Some(inner))) => {
            let mut buffered = Vec::new();
            write_token(&mut buffered, inner)?;
            write_compressed_len(&mut *to, buffered.len() as u64).context(EncodeDataSnafu)?;
            to.write_all(&buffered).context(WriteValueDataSnafu)
        }
        _ => UnwritableSnafu {
            class: descriptor.class,
        }
        .fail(),
    }
}

/// Write an inline compound key: a compressed length followed by the
/// UTF-8 bytes.
pub fn write_string<W>(to: &mut W, name: &str) -> Result<()>
where
    W: Write,
{
    write_compressed_len(&mut *to, name.len() as u64).context(EncodeDataSnafu)?;
    to.write_all(name.as_bytes()).context(WriteValueDataSnafu)
}

/// Write the associated-strings ("ASN") stream from the global alias
/// table: the version byte, a little-endian entry count, then each
/// string zero terminated.
pub fn write_asn_strings<W>(to: &mut W) -> Result<()>
where
    W: Write,
{
    write_version(&mut *to)?;
    let strings = alias::snapshot();
    let le = BasicEncoder::le();
    le.encode_u16(&mut *to, strings.len() as u16)
        .context(WriteValueDataSnafu)?;
    for s in &strings {
        to.write_all(s.as_bytes()).context(WriteValueDataSnafu)?;
        to.write_all(&[0]).context(WriteValueDataSnafu)?;
    }
    Ok(())
}

fn write_array<W>(to: &mut W, descriptor: TypeDescriptor, items: &[Value]) -> Result<()>
where
    W: Write,
{
    write_define_len(&mut *to, items.len() as u64, descriptor).context(EncodeDataSnafu)?;
    let first = match items.first() {
        Some(first) => first,
        None => return Ok(()),
    };
    let mut element = first.descriptor();
    if element.class == TypeClass::Bit {
        // bit elements pack eight per byte, least significant first
        element.signed = false;
        write_descriptor(&mut *to, element).context(EncodeDataSnafu)?;
        let mut acc = 0u8;
        let mut filled = 0u8;
        for item in items {
            if matches!(item.payload(), Payload::Bool(true)) {
                acc |= 1 << filled;
            }
            filled += 1;
            if filled == 8 {
                to.write_all(&[acc]).context(WriteValueDataSnafu)?;
                acc = 0;
                filled = 0;
            }
        }
        if filled > 0 {
            to.write_all(&[acc]).context(WriteValueDataSnafu)?;
        }
    } else {
        write_descriptor(&mut *to, element).context(EncodeDataSnafu)?;
        for item in items {
            write_value(to, item)?;
        }
    }
    Ok(())
}

/// A builder-style writer of one ENBT value into a seekable sink.
///
/// Unlike the free [`write_token`] function, this type can produce
/// containers without materializing them first. Compound and darray
/// builders declare a `Long` count prefix, fill it with a placeholder
/// and back-patch the final entry count, so the sink must implement
/// [`Seek`].
#[derive(Debug)]
pub struct ValueWriteStream<'w, W: Write + Seek> {
    to: &'w mut W,
    written: Option<TypeDescriptor>,
}

impl<'w, W> ValueWriteStream<'w, W>
where
    W: Write + Seek,
{
    /// Create a writer emitting one full token into `to`.
    pub fn new(to: &'w mut W) -> Self {
        ValueWriteStream { to, written: None }
    }

    /// The descriptor of the value written through this stream, once
    /// one has been written.
    pub fn written_descriptor(&self) -> Option<TypeDescriptor> {
        self.written
    }

    /// Write a fully materialized value.
    pub fn write(&mut self, value: &Value) -> Result<()> {
        write_token(self.to, value)?;
        self.written = Some(value.descriptor());
        Ok(())
    }

    /// Open a compound builder. Entry names are written as inline
    /// strings; the entry count is back-patched on `finish`.
    pub fn write_compound(&mut self) -> Result<CompoundWriter<'_, W>> {
        self.written = Some(TypeDescriptor::new(
            TypeClass::Compound,
            LenClass::Long,
            Endian::Little,
            false,
        ));
        CompoundWriter::open(self.to)
    }

    /// Open a heterogeneous array builder. The element count is
    /// back-patched on `finish`.
    pub fn write_darray(&mut self) -> Result<DArrayWriter<'_, W>> {
        self.written = Some(TypeDescriptor::new(
            TypeClass::DArray,
            LenClass::Long,
            Endian::Little,
            false,
        ));
        DArrayWriter::open(self.to)
    }

    /// Open a homogeneous array builder for exactly `len` elements.
    /// The first element written fixes the element type.
    pub fn write_array(&mut self, len: u64) -> Result<ArrayWriter<'_, W>> {
        self.written = Some(TypeDescriptor::new(
            TypeClass::Array,
            LenClass::fitting(len),
            Endian::Little,
            false,
        ));
        ArrayWriter::open(self.to, len)
    }

    /// Write a dense array of native integer elements in one call.
    pub fn write_sarray<T>(&mut self, items: &[T]) -> Result<()>
    where
        T: SArrayElement,
    {
        let descriptor = T::array_descriptor(Endian::native());
        write_descriptor(&mut *self.to, descriptor).context(EncodeDataSnafu)?;
        write_compressed_len(&mut *self.to, items.len() as u64).context(EncodeDataSnafu)?;
        let basic = BasicEncoder::new(endianness_of(descriptor.endian));
        for &item in items {
            T::encode(&basic, &mut *self.to, item).context(WriteValueDataSnafu)?;
        }
        self.written = Some(descriptor);
        Ok(())
    }
}

/// Reserve a `Long` define-length slot and return its position.
fn reserve_count<W: Write + Seek>(to: &mut W) -> Result<u64> {
    let len_pos = to.stream_position().context(SeekWriterSnafu)?;
    to.write_all(&[0u8; 8]).context(WriteValueDataSnafu)?;
    Ok(len_pos)
}

/// Back-patch a previously reserved count slot.
fn patch_count<W: Write + Seek>(to: &mut W, len_pos: u64, count: u64) -> Result<()> {
    let end = to.stream_position().context(SeekWriterSnafu)?;
    to.seek(SeekFrom::Start(len_pos)).context(SeekWriterSnafu)?;
    BasicEncoder::le()
        .encode_u64(&mut *to, count)
        .context(WriteValueDataSnafu)?;
    to.seek(SeekFrom::Start(end)).context(SeekWriterSnafu)?;
    Ok(())
}

/// Incremental writer of one compound value.
///
/// Dropping the builder without calling [`finish`](Self::finish) leaves
/// the count prefix zeroed; the builder performs no I/O on drop.
#[derive(Debug)]
pub struct CompoundWriter<'w, W: Write + Seek> {
    to: &'w mut W,
    len_pos: u64,
    items: u64,
}

impl<'w, W> CompoundWriter<'w, W>
where
    W: Write + Seek,
{
    fn open(to: &'w mut W) -> Result<Self> {
        let descriptor =
            TypeDescriptor::new(TypeClass::Compound, LenClass::Long, Endian::Little, false);
        write_descriptor(&mut *to, descriptor).context(EncodeDataSnafu)?;
        let len_pos = reserve_count(to)?;
        Ok(CompoundWriter {
            to,
            len_pos,
            items: 0,
        })
    }

    /// Write one entry from a materialized value.
    pub fn write(&mut self, name: &str, value: &Value) -> Result<&mut Self> {
        write_string(self.to, name)?;
        write_token(self.to, value)?;
        self.items += 1;
        Ok(self)
    }

    /// Write one entry through a nested builder.
    pub fn write_with<F>(&mut self, name: &str, f: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut ValueWriteStream<'_, W>) -> Result<()>,
    {
        write_string(self.to, name)?;
        let mut inner = ValueWriteStream::new(self.to);
        f(&mut inner)?;
        self.items += 1;
        Ok(self)
    }

    /// Back-patch the entry count and close the builder.
    pub fn finish(self) -> Result<()> {
        patch_count(self.to, self.len_pos, self.items)
    }
}

/// Incremental writer of one heterogeneous array.
///
/// Dropping the builder without calling [`finish`](Self::finish) leaves
/// the count prefix zeroed; the builder performs no I/O on drop.
#[derive(Debug)]
pub struct DArrayWriter<'w, W: Write + Seek> {
    to: &'w mut W,
    len_pos: u64,
    items: u64,
}

impl<'w, W> DArrayWriter<'w, W>
where
    W: Write + Seek,
{
    fn open(to: &'w mut W) -> Result<Self> {
        let descriptor =
            TypeDescriptor::new(TypeClass::DArray, LenClass::Long, Endian::Little, false);
        write_descriptor(&mut *to, descriptor).context(EncodeDataSnafu)?;
        let len_pos = reserve_count(to)?;
        Ok(DArrayWriter {
            to,
            len_pos,
            items: 0,
        })
    }

    /// Write one element from a materialized value.
    pub fn write(&mut self, value: &Value) -> Result<&mut Self> {
        write_token(self.to, value)?;
        self.items += 1;
        Ok(self)
    }

    /// Write one element through a nested builder.
    pub fn write_with<F>(&mut self, f: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut ValueWriteStream<'_, W>) -> Result<()>,
    {
        let mut inner = ValueWriteStream::new(self.to);
        f(&mut inner)?;
        self.items += 1;
        Ok(self)
    }

    /// Back-patch the element count and close the builder.
    pub fn finish(self) -> Result<()> {
        patch_count(self.to, self.len_pos, self.items)
    }
}

/// Incremental writer of one homogeneous array of a declared size.
///
/// The first element fixes the element descriptor; every further
/// element must match it. Bit elements are packed eight per byte.
#[derive(Debug)]
pub struct ArrayWriter<'w, W: Write + Seek> {
    to: &'w mut W,
    remaining: u64,
    element: Option<TypeDescriptor>,
    bit_acc: u8,
    bit_filled: u8,
}

impl<'w, W> ArrayWriter<'w, W>
where
    W: Write + Seek,
{
    fn open(to: &'w mut W, len: u64) -> Result<Self> {
        let descriptor =
            TypeDescriptor::new(TypeClass::Array, LenClass::fitting(len), Endian::Little, false);
        write_descriptor(&mut *to, descriptor).context(EncodeDataSnafu)?;
        write_define_len(&mut *to, len, descriptor).context(EncodeDataSnafu)?;
        Ok(ArrayWriter {
            to,
            remaining: len,
            element: None,
            bit_acc: 0,
            bit_filled: 0,
        })
    }

    /// Write one element.
    pub fn write(&mut self, value: &Value) -> Result<&mut Self> {
        if self.remaining == 0 {
            return ArrayFullSnafu.fail();
        }
        let mut got = value.descriptor();
        if got.class == TypeClass::Bit {
            got.signed = false;
        }
        match self.element {
            None => {
                write_descriptor(&mut *self.to, got).context(EncodeDataSnafu)?;
                self.element = Some(got);
            }
            Some(expected) if expected != got => {
                return ElementMismatchSnafu { expected, got }.fail();
            }
            Some(_) => {}
        }
        if got.class == TypeClass::Bit {
            if matches!(value.payload(), Payload::Bool(true)) {
                self.bit_acc |= 1 << self.bit_filled;
            }
            self.bit_filled += 1;
            if self.bit_filled == 8 {
                self.to.write_all(&[self.bit_acc]).context(WriteValueDataSnafu)?;
                self.bit_acc = 0;
                self.bit_filled = 0;
            }
        } else {
            write_value(self.to, value)?;
        }
        self.remaining -= 1;
        Ok(self)
    }

    /// Flush any partial bit byte and close the builder. Fails when
    /// fewer elements were written than declared.
    pub fn finish(self) -> Result<()> {
        if self.remaining != 0 {
            return MissingElementsSnafu {
                remaining: self.remaining,
            }
            .fail();
        }
        if self.bit_filled > 0 {
            self.to.write_all(&[self.bit_acc]).context(WriteValueDataSnafu)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn version_header_is_one_byte() {
        let mut out = Vec::new();
        write_version(&mut out).unwrap();
        assert_eq!(out, [0x10]);
    }

    #[test]
    fn scalar_tokens_have_descriptor_then_payload() {
        let mut out = Vec::new();
        write_token(&mut out, &Value::from(7i32).with_endian(Endian::Little)).unwrap();
        // integer | default | little | signed, then 4 payload bytes
        assert_eq!(out, [0b0001_1001, 0x07, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn big_endian_scalars_are_byte_swapped() {
        let mut out = Vec::new();
        write_token(&mut out, &Value::from(7i32).with_endian(Endian::Big)).unwrap();
        assert_eq!(out, [0b0001_1011, 0x00, 0x00, 0x00, 0x07]);
    }

    #[test]
    fn bit_packed_array_payload() {
        let bits = [true, false, true, true, false, false, false, false, true];
        let items: Vec<Value> = bits.iter().map(|&b| Value::bit(b)).collect();
        let array = Value::array(items).unwrap();

        let mut out = Vec::new();
        write_token(&mut out, &array).unwrap();
        let descriptor_byte = out[0];
        // array class in the high nibble
        assert_eq!(descriptor_byte >> 4, TypeClass::Array as u8);
        // count 9, element descriptor bit/unsigned, 2 payload bytes
        assert_eq!(
            &out[1..],
            [9, (TypeClass::Bit as u8) << 4, 0b0000_1101, 0b0000_0001]
        );
    }

    #[test]
    fn empty_arrays_have_no_element_descriptor() {
        let mut out = Vec::new();
        write_token(&mut out, &Value::array(vec![]).unwrap()).unwrap();
        assert_eq!(&out[1..], [0]);
    }

    #[test]
    fn optional_presence_controls_payload() {
        let mut out = Vec::new();
        write_token(&mut out, &Value::optional(None)).unwrap();
        assert_eq!(out.len(), 1);

        let mut out = Vec::new();
        write_token(&mut out, &Value::optional(Some(Value::from(1u8)))).unwrap();
        // optional descriptor, then a full u8 token
        assert_eq!(out.len(), 3);
        assert!(out[0] & 1 != 0);
    }

    #[test]
    fn compound_builder_backpatches_count() {
        let mut sink = Cursor::new(Vec::new());
        write_version(&mut sink).unwrap();
        let mut stream = ValueWriteStream::new(&mut sink);
        let mut compound = stream.write_compound().unwrap();
        compound.write("greet", &Value::from("hi")).unwrap();
        compound.write("n", &Value::from(7i32)).unwrap();
        compound.finish().unwrap();

        let bytes = sink.into_inner();
        // version, descriptor, 8-byte count prefix
        assert_eq!(bytes[0], 0x10);
        assert_eq!(bytes[1] >> 4, TypeClass::Compound as u8);
        assert_eq!(&bytes[2..10], [2, 0, 0, 0, 0, 0, 0, 0]);
        // first entry name follows the prefix
        assert_eq!(bytes[10], 5);
        assert_eq!(&bytes[11..16], b"greet");
    }

    #[test]
    fn array_builder_rejects_mixed_elements() {
        let mut sink = Cursor::new(Vec::new());
        let mut stream = ValueWriteStream::new(&mut sink);
        let mut array = stream.write_array(2).unwrap();
        array.write(&Value::from(1u8)).unwrap();
        assert!(matches!(
            array.write(&Value::from(2u16)),
            Err(Error::ElementMismatch { .. })
        ));
    }

    #[test]
    fn array_builder_enforces_declared_arity() {
        let mut sink = Cursor::new(Vec::new());
        let mut stream = ValueWriteStream::new(&mut sink);
        let mut array = stream.write_array(2).unwrap();
        array.write(&Value::from(1u8)).unwrap();
        assert!(matches!(
            array.finish(),
            Err(Error::MissingElements { remaining: 1, .. })
        ));
    }
}
