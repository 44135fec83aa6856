//! Pull-style stream cursor.
//!
//! [`ValueReadStream`] holds one consumed type descriptor and lets the
//! caller decide how to handle the payload: materialize it, step over
//! it, open a typed sub-cursor, or peek into children while keeping the
//! stream position untouched. All non-`peek` operations are final and
//! consume the current value.

use crate::element::SArrayElement;
use crate::lookup::{find_value_compound, index_array, index_static_array};
use crate::read::{
    read_string, read_value, AliasSnafu, AlreadyConsumedSnafu, DecodeDataSnafu, KeyNotFoundSnafu,
    OutOfRangeSnafu, ReadValueDataSnafu, Result, SeekReaderSnafu, UnexpectedClassSnafu,
};
use crate::skip::{fast_index_width, skip_token, skip_value};
use enbt_core::{alias, Endian, PathSegment, TypeClass, TypeDescriptor, Value};
use enbt_encoding::{
    endianness_of, read_compressed_len, read_define_len, read_descriptor, BasicDecoder,
};
use snafu::ResultExt;
use std::io::{Read, Seek, SeekFrom};

/// A lightweight reader over one value in a token stream.
///
/// The cursor is created on top of a seekable source positioned at a
/// token; creating it consumes the type descriptor. Every reading
/// operation except the `peek_*` family may be used once and advances
/// the underlying stream past the value.
#[derive(Debug)]
pub struct ValueReadStream<'s, S: Read + Seek> {
    from: &'s mut S,
    descriptor: TypeDescriptor,
    bit: Option<bool>,
    consumed: bool,
}

impl<'s, S> ValueReadStream<'s, S>
where
    S: Read + Seek,
{
    /// Consume the descriptor at the cursor and wrap the value that
    /// follows.
    pub fn new(from: &'s mut S) -> Result<Self> {
        let descriptor = read_descriptor(&mut *from).context(DecodeDataSnafu)?;
        Ok(ValueReadStream {
            from,
            descriptor,
            bit: None,
            consumed: false,
        })
    }

    fn with_descriptor(from: &'s mut S, descriptor: TypeDescriptor) -> Self {
        ValueReadStream {
            from,
            descriptor,
            bit: None,
            consumed: false,
        }
    }

    fn with_bit(from: &'s mut S, value: bool) -> Self {
        ValueReadStream {
            from,
            descriptor: TypeDescriptor::new(TypeClass::Bit, enbt_core::LenClass::Tiny, Endian::native(), value),
            bit: Some(value),
            consumed: false,
        }
    }

    /// The descriptor of the value at the cursor.
    pub fn descriptor(&self) -> TypeDescriptor {
        self.descriptor
    }

    fn begin(&mut self) -> Result<()> {
        if self.consumed {
            return AlreadyConsumedSnafu.fail();
        }
        self.consumed = true;
        Ok(())
    }

    /// Materialize the value at the cursor.
    pub fn read(&mut self) -> Result<Value> {
        self.begin()?;
        if let Some(bit) = self.bit {
            return Ok(Value::bit(bit));
        }
        read_value(self.from, self.descriptor)
    }

    /// Step over the value at the cursor without decoding it.
    pub fn skip(&mut self) -> Result<()> {
        self.begin()?;
        if self.bit.is_some() {
            return Ok(());
        }
        skip_value(self.from, self.descriptor)
    }

    /// Open a sub-cursor over a homogeneous array.
    pub fn read_array(&mut self) -> Result<ArrayCursor<'_, S>> {
        self.expect(TypeClass::Array, "array")?;
        self.begin()?;
        ArrayCursor::open(&mut *self.from, self.descriptor)
    }

    /// Open a sub-cursor over a heterogeneous array.
    pub fn read_darray(&mut self) -> Result<DArrayCursor<'_, S>> {
        self.expect(TypeClass::DArray, "darray")?;
        self.begin()?;
        DArrayCursor::open(&mut *self.from, self.descriptor)
    }

    /// Open a sub-cursor over a compound.
    pub fn read_compound(&mut self) -> Result<CompoundCursor<'_, S>> {
        self.expect(TypeClass::Compound, "compound")?;
        self.begin()?;
        CompoundCursor::open(&mut *self.from, self.descriptor)
    }

    /// Open a typed sub-cursor over a dense array of `T` elements.
    pub fn read_sarray<T>(&mut self) -> Result<SArrayCursor<'_, S, T>>
    where
        T: SArrayElement,
    {
        self.expect(TypeClass::SArray, "sarray")?;
        self.begin()?;
        SArrayCursor::open(&mut *self.from, self.descriptor)
    }

    /// Enter a log item, returning a cursor over the wrapped token.
    pub fn read_log_item(&mut self) -> Result<ValueReadStream<'_, S>> {
        self.expect(TypeClass::LogItem, "log item")?;
        self.begin()?;
        read_compressed_len(&mut *self.from).context(DecodeDataSnafu)?;
        ValueReadStream::new(&mut *self.from)
    }

    /// The element or entry count of the container at the cursor,
    /// without consuming it.
    pub fn peek_size(&mut self) -> Result<u64> {
        if self.consumed {
            return AlreadyConsumedSnafu.fail();
        }
        let start = self.from.stream_position().context(SeekReaderSnafu)?;
        let outcome = match self.descriptor.class {
            TypeClass::Array | TypeClass::DArray | TypeClass::Compound => {
                read_define_len(&mut *self.from, self.descriptor).context(DecodeDataSnafu)
            }
            TypeClass::SArray => {
                read_compressed_len(&mut *self.from).context(DecodeDataSnafu)
            }
            TypeClass::Optional => Ok(self.descriptor.signed as u64),
            TypeClass::LogItem => Ok(1),
            class => UnexpectedClassSnafu {
                expected: "sized container",
                class,
            }
            .fail(),
        };
        let restored = self
            .from
            .seek(SeekFrom::Start(start))
            .context(SeekReaderSnafu);
        match (outcome, restored) {
            (Ok(size), Ok(_)) => Ok(size),
            (Err(e), _) => Err(e),
            (_, Err(e)) => Err(e),
        }
    }

    /// Seek to the child addressed by one path segment, hand a fresh
    /// cursor over it to `f`, and restore the stream position afterwards
    /// on both success and failure. The current value stays unconsumed.
    pub fn peek_at<T, F>(&mut self, segment: impl Into<PathSegment>, f: F) -> Result<T>
    where
        F: FnOnce(&mut ValueReadStream<'_, S>) -> Result<T>,
    {
        if self.consumed {
            return AlreadyConsumedSnafu.fail();
        }
        let start = self.from.stream_position().context(SeekReaderSnafu)?;
        let outcome = self.peek_at_impl(segment.into(), f);
        let restored = self
            .from
            .seek(SeekFrom::Start(start))
            .context(SeekReaderSnafu);
        match (outcome, restored) {
            (Ok(value), Ok(_)) => Ok(value),
            (Err(e), _) => Err(e),
            (_, Err(e)) => Err(e),
        }
    }

    fn peek_at_impl<T, F>(&mut self, segment: PathSegment, f: F) -> Result<T>
    where
        F: FnOnce(&mut ValueReadStream<'_, S>) -> Result<T>,
    {
        match segment {
            PathSegment::Index(index) => {
                match index_array(&mut *self.from, index, self.descriptor)? {
                    Some(element) if element.class == TypeClass::Bit => {
                        let byte = BasicDecoder::le()
                            .decode_u8(&mut *self.from)
                            .context(ReadValueDataSnafu)?;
                        let mut inner =
                            ValueReadStream::with_bit(self.from, byte >> (index % 8) & 1 == 1);
                        f(&mut inner)
                    }
                    Some(element) => {
                        let mut inner = ValueReadStream::with_descriptor(self.from, element);
                        f(&mut inner)
                    }
                    None => {
                        let mut inner = ValueReadStream::new(&mut *self.from)?;
                        f(&mut inner)
                    }
                }
            }
            PathSegment::Name(key) => {
                self.expect(TypeClass::Compound, "compound")?;
                if find_value_compound(&mut *self.from, self.descriptor, &key)? {
                    let mut inner = ValueReadStream::new(&mut *self.from)?;
                    f(&mut inner)
                } else {
                    KeyNotFoundSnafu { key }.fail()
                }
            }
        }
    }

    /// Iterate the elements of an array, darray or dense array. The
    /// size callback fires once with the element count, then the item
    /// callback once per element; unconsumed items are skipped.
    pub fn iterate<SF, F>(&mut self, mut size_cb: SF, mut item_cb: F) -> Result<()>
    where
        SF: FnMut(u64),
        F: FnMut(&mut ValueReadStream<'_, S>) -> Result<()>,
    {
        self.begin()?;
        match self.descriptor.class {
            TypeClass::Array => {
                let count =
                    read_define_len(&mut *self.from, self.descriptor).context(DecodeDataSnafu)?;
                size_cb(count);
                if count == 0 {
                    return Ok(());
                }
                let element = read_descriptor(&mut *self.from).context(DecodeDataSnafu)?;
                if element.class == TypeClass::Bit {
                    let mut byte = 0u8;
                    for i in 0..count {
                        if i % 8 == 0 {
                            byte = BasicDecoder::le()
                                .decode_u8(&mut *self.from)
                                .context(ReadValueDataSnafu)?;
                        }
                        let mut inner =
                            ValueReadStream::with_bit(self.from, byte >> (i % 8) & 1 == 1);
                        item_cb(&mut inner)?;
                    }
                } else {
                    for _ in 0..count {
                        let mut inner = ValueReadStream::with_descriptor(self.from, element);
                        item_cb(&mut inner)?;
                        if !inner.consumed {
                            inner.skip()?;
                        }
                    }
                }
                Ok(())
            }
            TypeClass::DArray => {
                let count =
                    read_define_len(&mut *self.from, self.descriptor).context(DecodeDataSnafu)?;
                size_cb(count);
                for _ in 0..count {
                    let mut inner = ValueReadStream::new(&mut *self.from)?;
                    item_cb(&mut inner)?;
                    if !inner.consumed {
                        inner.skip()?;
                    }
                }
                Ok(())
            }
            TypeClass::SArray => {
                let count = read_compressed_len(&mut *self.from).context(DecodeDataSnafu)?;
                size_cb(count);
                let element = TypeDescriptor::new(
                    TypeClass::Integer,
                    self.descriptor.len,
                    self.descriptor.endian,
                    self.descriptor.signed,
                );
                for _ in 0..count {
                    let mut inner = ValueReadStream::with_descriptor(self.from, element);
                    item_cb(&mut inner)?;
                    if !inner.consumed {
                        inner.skip()?;
                    }
                }
                Ok(())
            }
            class => UnexpectedClassSnafu {
                expected: "array",
                class,
            }
            .fail(),
        }
    }

    /// Iterate the entries of a compound. Aliased keys are resolved
    /// through the global alias table; unconsumed values are skipped.
    pub fn iterate_entries<SF, F>(&mut self, mut size_cb: SF, mut entry_cb: F) -> Result<()>
    where
        SF: FnMut(u64),
        F: FnMut(&str, &mut ValueReadStream<'_, S>) -> Result<()>,
    {
        self.expect(TypeClass::Compound, "compound")?;
        self.begin()?;
        let count =
            read_define_len(&mut *self.from, self.descriptor).context(DecodeDataSnafu)?;
        size_cb(count);
        let aliased = self.descriptor.signed;
        for _ in 0..count {
            let name = if aliased {
                let id = BasicDecoder::le()
                    .decode_u16(&mut *self.from)
                    .context(ReadValueDataSnafu)?;
                alias::from_alias(id).context(AliasSnafu)?
            } else {
                read_string(&mut *self.from)?
            };
            let mut inner = ValueReadStream::new(&mut *self.from)?;
            entry_cb(&name, &mut inner)?;
            if !inner.consumed {
                inner.skip()?;
            }
        }
        Ok(())
    }

    /// Iterate any iterable value without knowing its kind upfront:
    /// compound entries go to `entry_cb`, array / darray / dense array
    /// elements and log-item payloads go to `item_cb`.
    pub fn blind_iterate<SF, EF, F>(
        &mut self,
        size_cb: SF,
        entry_cb: EF,
        item_cb: F,
    ) -> Result<()>
    where
        SF: FnMut(u64),
        EF: FnMut(&str, &mut ValueReadStream<'_, S>) -> Result<()>,
        F: FnMut(&mut ValueReadStream<'_, S>) -> Result<()>,
    {
        match self.descriptor.class {
            TypeClass::Compound => self.iterate_entries(size_cb, entry_cb),
            TypeClass::Array | TypeClass::DArray | TypeClass::SArray => {
                self.iterate(size_cb, item_cb)
            }
            TypeClass::LogItem => {
                let mut size_cb = size_cb;
                let mut item_cb = item_cb;
                let mut inner = self.read_log_item()?;
                size_cb(1);
                item_cb(&mut inner)?;
                if !inner.consumed {
                    inner.skip()?;
                }
                Ok(())
            }
            class => UnexpectedClassSnafu {
                expected: "iterable",
                class,
            }
            .fail(),
        }
    }

    fn expect(&self, class: TypeClass, expected: &'static str) -> Result<()> {
        if self.descriptor.class != class {
            return UnexpectedClassSnafu {
                expected,
                class: self.descriptor.class,
            }
            .fail();
        }
        Ok(())
    }
}

/// Sub-cursor over the elements of a homogeneous array.
#[derive(Debug)]
pub struct ArrayCursor<'s, S: Read + Seek> {
    from: &'s mut S,
    items: u64,
    current: u64,
    element: Option<TypeDescriptor>,
    payload_pos: u64,
    bit_byte: u8,
}

impl<'s, S> ArrayCursor<'s, S>
where
    S: Read + Seek,
{
    fn open(from: &'s mut S, descriptor: TypeDescriptor) -> Result<Self> {
        let items = read_define_len(&mut *from, descriptor).context(DecodeDataSnafu)?;
        let element = if items > 0 {
            Some(read_descriptor(&mut *from).context(DecodeDataSnafu)?)
        } else {
            None
        };
        let payload_pos = from.stream_position().context(SeekReaderSnafu)?;
        Ok(ArrayCursor {
            from,
            items,
            current: 0,
            element,
            payload_pos,
            bit_byte: 0,
        })
    }

    /// The number of elements in the array.
    pub fn size(&self) -> u64 {
        self.items
    }

    /// The index of the next element to be read.
    pub fn current_index(&self) -> u64 {
        self.current
    }

    /// The shared element descriptor, when the array is not empty.
    pub fn element_descriptor(&self) -> Option<TypeDescriptor> {
        self.element
    }

    /// Read the next element.
    pub fn read_one(&mut self) -> Result<Value> {
        if self.current == self.items {
            return OutOfRangeSnafu {
                index: self.current,
                len: self.items,
            }
            .fail();
        }
        let element = self.element.unwrap_or_default();
        let value = if element.class == TypeClass::Bit {
            if self.current % 8 == 0 {
                self.bit_byte = BasicDecoder::le()
                    .decode_u8(&mut *self.from)
                    .context(ReadValueDataSnafu)?;
            }
            Value::bit(self.bit_byte >> (self.current % 8) & 1 == 1)
        } else {
            read_value(&mut *self.from, element)?
        };
        self.current += 1;
        Ok(value)
    }

    /// Hand the next element to a callback as a cursor.
    pub fn read_one_with<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut ValueReadStream<'_, S>) -> Result<T>,
    {
        if self.current == self.items {
            return OutOfRangeSnafu {
                index: self.current,
                len: self.items,
            }
            .fail();
        }
        let element = self.element.unwrap_or_default();
        let result = if element.class == TypeClass::Bit {
            if self.current % 8 == 0 {
                self.bit_byte = BasicDecoder::le()
                    .decode_u8(&mut *self.from)
                    .context(ReadValueDataSnafu)?;
            }
            let mut inner = ValueReadStream::with_bit(
                self.from,
                self.bit_byte >> (self.current % 8) & 1 == 1,
            );
            f(&mut inner)?
        } else {
            let mut inner = ValueReadStream::with_descriptor(self.from, element);
            let value = f(&mut inner)?;
            if !inner.consumed {
                inner.skip()?;
            }
            value
        };
        self.current += 1;
        Ok(result)
    }

    /// Materialize all remaining elements.
    pub fn read_all(&mut self) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity((self.items - self.current) as usize);
        while self.current < self.items {
            values.push(self.read_one()?);
        }
        Ok(values)
    }

    /// Materialize the element at `index` without moving the cursor.
    pub fn peek_at(&mut self, index: u64) -> Result<Value> {
        if index >= self.items {
            return OutOfRangeSnafu {
                index,
                len: self.items,
            }
            .fail();
        }
        let element = self.element.unwrap_or_default();
        let start = self.from.stream_position().context(SeekReaderSnafu)?;
        let outcome = (|| {
            self.from
                .seek(SeekFrom::Start(self.payload_pos))
                .context(SeekReaderSnafu)?;
            if element.class == TypeClass::Bit {
                self.from
                    .seek(SeekFrom::Current((index / 8) as i64))
                    .context(SeekReaderSnafu)?;
                let byte = BasicDecoder::le()
                    .decode_u8(&mut *self.from)
                    .context(ReadValueDataSnafu)?;
                Ok(Value::bit(byte >> (index % 8) & 1 == 1))
            } else {
                index_static_array(&mut *self.from, index, element)?;
                read_value(&mut *self.from, element)
            }
        })();
        let restored = self
            .from
            .seek(SeekFrom::Start(start))
            .context(SeekReaderSnafu);
        match (outcome, restored) {
            (Ok(value), Ok(_)) => Ok(value),
            (Err(e), _) => Err(e),
            (_, Err(e)) => Err(e),
        }
    }

    /// Step over any unread elements, leaving the stream past the
    /// array.
    pub fn finish(self) -> Result<()> {
        let element = match self.element {
            Some(element) => element,
            None => return Ok(()),
        };
        if element.class == TypeClass::Bit {
            let end = self.payload_pos + (self.items + 7) / 8;
            self.from
                .seek(SeekFrom::Start(end))
                .context(SeekReaderSnafu)?;
            return Ok(());
        }
        let width = fast_index_width(element);
        if width != 0 {
            let end = self.payload_pos + self.items * width as u64;
            self.from
                .seek(SeekFrom::Start(end))
                .context(SeekReaderSnafu)?;
        } else {
            for _ in self.current..self.items {
                skip_value(&mut *self.from, element)?;
            }
        }
        Ok(())
    }
}

/// Sub-cursor over the elements of a heterogeneous array.
#[derive(Debug)]
pub struct DArrayCursor<'s, S: Read + Seek> {
    from: &'s mut S,
    items: u64,
    current: u64,
    payload_pos: u64,
}

impl<'s, S> DArrayCursor<'s, S>
where
    S: Read + Seek,
{
    fn open(from: &'s mut S, descriptor: TypeDescriptor) -> Result<Self> {
        let items = read_define_len(&mut *from, descriptor).context(DecodeDataSnafu)?;
        let payload_pos = from.stream_position().context(SeekReaderSnafu)?;
        Ok(DArrayCursor {
            from,
            items,
            current: 0,
            payload_pos,
        })
    }

    /// The number of elements in the array.
    pub fn size(&self) -> u64 {
        self.items
    }

    /// The index of the next element to be read.
    pub fn current_index(&self) -> u64 {
        self.current
    }

    /// Read the next element.
    pub fn read_one(&mut self) -> Result<Value> {
        self.read_one_with(|inner| inner.read())
    }

    /// Hand the next element to a callback as a cursor.
    pub fn read_one_with<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut ValueReadStream<'_, S>) -> Result<T>,
    {
        if self.current == self.items {
            return OutOfRangeSnafu {
                index: self.current,
                len: self.items,
            }
            .fail();
        }
        let mut inner = ValueReadStream::new(&mut *self.from)?;
        let value = f(&mut inner)?;
        if !inner.consumed {
            inner.skip()?;
        }
        self.current += 1;
        Ok(value)
    }

    /// Materialize all remaining elements.
    pub fn read_all(&mut self) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity((self.items - self.current) as usize);
        while self.current < self.items {
            values.push(self.read_one()?);
        }
        Ok(values)
    }

    /// Materialize the element at `index` without moving the cursor.
    pub fn peek_at(&mut self, index: u64) -> Result<Value> {
        if index >= self.items {
            return OutOfRangeSnafu {
                index,
                len: self.items,
            }
            .fail();
        }
        let start = self.from.stream_position().context(SeekReaderSnafu)?;
        let outcome = (|| {
            self.from
                .seek(SeekFrom::Start(self.payload_pos))
                .context(SeekReaderSnafu)?;
            for _ in 0..index {
                skip_token(&mut *self.from)?;
            }
            crate::read::read_token(&mut *self.from)
        })();
        let restored = self
            .from
            .seek(SeekFrom::Start(start))
            .context(SeekReaderSnafu);
        match (outcome, restored) {
            (Ok(value), Ok(_)) => Ok(value),
            (Err(e), _) => Err(e),
            (_, Err(e)) => Err(e),
        }
    }

    /// Step over any unread elements, leaving the stream past the
    /// array.
    pub fn finish(mut self) -> Result<()> {
        while self.current < self.items {
            skip_token(&mut *self.from)?;
            self.current += 1;
        }
        Ok(())
    }
}

/// Sub-cursor over the entries of a compound.
#[derive(Debug)]
pub struct CompoundCursor<'s, S: Read + Seek> {
    from: &'s mut S,
    descriptor: TypeDescriptor,
    items: u64,
    current: u64,
    start_pos: u64,
}

impl<'s, S> CompoundCursor<'s, S>
where
    S: Read + Seek,
{
    fn open(from: &'s mut S, descriptor: TypeDescriptor) -> Result<Self> {
        let start_pos = from.stream_position().context(SeekReaderSnafu)?;
        let items = read_define_len(&mut *from, descriptor).context(DecodeDataSnafu)?;
        Ok(CompoundCursor {
            from,
            descriptor,
            items,
            current: 0,
            start_pos,
        })
    }

    /// The number of entries in the compound.
    pub fn size(&self) -> u64 {
        self.items
    }

    /// The index of the next entry to be read.
    pub fn current_index(&self) -> u64 {
        self.current
    }

    fn read_name(&mut self) -> Result<String> {
        if self.descriptor.signed {
            let id = BasicDecoder::le()
                .decode_u16(&mut *self.from)
                .context(ReadValueDataSnafu)?;
            alias::from_alias(id).context(AliasSnafu)
        } else {
            read_string(&mut *self.from)
        }
    }

    /// Read the next entry as a `(name, value)` pair.
    pub fn read_one(&mut self) -> Result<(String, Value)> {
        self.read_one_with(|name, inner| Ok((name.to_owned(), inner.read()?)))
    }

    /// Hand the next entry to a callback as a name and a cursor.
    pub fn read_one_with<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&str, &mut ValueReadStream<'_, S>) -> Result<T>,
    {
        if self.current == self.items {
            return OutOfRangeSnafu {
                index: self.current,
                len: self.items,
            }
            .fail();
        }
        let name = self.read_name()?;
        let mut inner = ValueReadStream::new(&mut *self.from)?;
        let value = f(&name, &mut inner)?;
        if !inner.consumed {
            inner.skip()?;
        }
        self.current += 1;
        Ok(value)
    }

    /// Materialize the entry under `key` without moving the cursor.
    pub fn peek_at(&mut self, key: &str) -> Result<Value> {
        self.peek_at_with(key, |inner| inner.read())
    }

    /// Seek to the entry under `key`, hand it to the callback as a
    /// cursor, and restore the position afterwards.
    pub fn peek_at_with<T, F>(&mut self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut ValueReadStream<'_, S>) -> Result<T>,
    {
        let start = self.from.stream_position().context(SeekReaderSnafu)?;
        let outcome = (|| {
            self.from
                .seek(SeekFrom::Start(self.start_pos))
                .context(SeekReaderSnafu)?;
            if find_value_compound(&mut *self.from, self.descriptor, key)? {
                let mut inner = ValueReadStream::new(&mut *self.from)?;
                f(&mut inner)
            } else {
                KeyNotFoundSnafu {
                    key: key.to_owned(),
                }
                .fail()
            }
        })();
        let restored = self
            .from
            .seek(SeekFrom::Start(start))
            .context(SeekReaderSnafu);
        match (outcome, restored) {
            (Ok(value), Ok(_)) => Ok(value),
            (Err(e), _) => Err(e),
            (_, Err(e)) => Err(e),
        }
    }

    /// Step over any unread entries, leaving the stream past the
    /// compound.
    pub fn finish(mut self) -> Result<()> {
        while self.current < self.items {
            self.read_name()?;
            skip_token(&mut *self.from)?;
            self.current += 1;
        }
        Ok(())
    }
}

/// Typed sub-cursor over the elements of a dense array.
#[derive(Debug)]
pub struct SArrayCursor<'s, S: Read + Seek, T: SArrayElement> {
    from: &'s mut S,
    items: u64,
    current: u64,
    payload_pos: u64,
    basic: BasicDecoder,
    _element: std::marker::PhantomData<T>,
}

impl<'s, S, T> SArrayCursor<'s, S, T>
where
    S: Read + Seek,
    T: SArrayElement,
{
    fn open(from: &'s mut S, descriptor: TypeDescriptor) -> Result<Self> {
        if descriptor.len != T::LEN || descriptor.signed != T::SIGNED {
            return UnexpectedClassSnafu {
                expected: "matching dense element type",
                class: descriptor.class,
            }
            .fail();
        }
        let items = read_compressed_len(&mut *from).context(DecodeDataSnafu)?;
        let payload_pos = from.stream_position().context(SeekReaderSnafu)?;
        Ok(SArrayCursor {
            from,
            items,
            current: 0,
            payload_pos,
            basic: BasicDecoder::new(endianness_of(descriptor.endian)),
            _element: std::marker::PhantomData,
        })
    }

    /// The number of elements in the array.
    pub fn size(&self) -> u64 {
        self.items
    }

    /// The index of the next element to be read.
    pub fn current_index(&self) -> u64 {
        self.current
    }

    /// Read the next element.
    pub fn read_one(&mut self) -> Result<T> {
        if self.current == self.items {
            return OutOfRangeSnafu {
                index: self.current,
                len: self.items,
            }
            .fail();
        }
        let value = T::decode(&self.basic, &mut *self.from).context(ReadValueDataSnafu)?;
        self.current += 1;
        Ok(value)
    }

    /// Read all remaining elements.
    pub fn read_all(&mut self) -> Result<Vec<T>> {
        let mut values = Vec::with_capacity((self.items - self.current) as usize);
        while self.current < self.items {
            values.push(self.read_one()?);
        }
        Ok(values)
    }

    /// Read the element at `index` without moving the cursor.
    pub fn peek_at(&mut self, index: u64) -> Result<T> {
        if index >= self.items {
            return OutOfRangeSnafu {
                index,
                len: self.items,
            }
            .fail();
        }
        let start = self.from.stream_position().context(SeekReaderSnafu)?;
        let outcome = (|| {
            let offset = self.payload_pos + index * T::LEN.byte_width() as u64;
            self.from
                .seek(SeekFrom::Start(offset))
                .context(SeekReaderSnafu)?;
            T::decode(&self.basic, &mut *self.from).context(ReadValueDataSnafu)
        })();
        let restored = self
            .from
            .seek(SeekFrom::Start(start))
            .context(SeekReaderSnafu);
        match (outcome, restored) {
            (Ok(value), Ok(_)) => Ok(value),
            (Err(e), _) => Err(e),
            (_, Err(e)) => Err(e),
        }
    }

    /// Step over any unread elements, leaving the stream past the
    /// array.
    pub fn finish(self) -> Result<()> {
        let end = self.payload_pos + self.items * T::LEN.byte_width() as u64;
        self.from
            .seek(SeekFrom::Start(end))
            .context(SeekReaderSnafu)?;
        Ok(())
    }
}
