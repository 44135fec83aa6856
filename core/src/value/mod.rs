//! This module includes the ENBT value tree: a tagged union over one
//! type descriptor and a discriminated payload, with ownership of all
//! transitively contained values.
//!
//! See [`Value`].

use crate::alias;
use crate::alias::AliasError;
use crate::header::{
    Endian, InvalidDescriptorError, LenClass, PayloadMismatchSnafu, StructureAritySnafu,
    TypeClass, TypeDescriptor,
};
use smallvec::SmallVec;
use snafu::Snafu;
use std::borrow::Cow;
use std::collections::hash_map;
use std::collections::HashMap;

mod convert;

pub use self::convert::ConvertError;

/// An aggregation of one or more elements in a value.
pub type C<T> = SmallVec<[T; 2]>;

/// An error raised when accessing or mutating a value tree.
#[derive(Debug, Snafu, Clone, PartialEq)]
#[non_exhaustive]
pub enum AccessError {
    /// An element index points past the end of a container.
    #[snafu(display("index {} is out of range of container of {} elements", index, len))]
    OutOfRange { index: u64, len: u64 },

    /// A compound has no entry under the requested key.
    #[snafu(display("compound has no entry `{}`", key))]
    KeyNotFound { key: String },

    /// The operation requires a different type class.
    #[snafu(display("operation `{}` is not supported by {:?} values", operation, class))]
    TypeMismatch {
        operation: &'static str,
        class: TypeClass,
    },

    /// A homogeneous array rejected an element of a different type.
    #[snafu(display(
        "array of {:?} elements cannot hold an element described as {:?}",
        expected,
        got
    ))]
    ElementMismatch {
        expected: TypeDescriptor,
        got: TypeDescriptor,
    },

    /// An alias table lookup failed.
    #[snafu(display("alias lookup failed: {}", source))]
    Alias { source: AliasError },

    /// The container outgrew its declared length class.
    #[snafu(display("count {} does not fit length class {:?}", count, len))]
    Overflow { count: u64, len: LenClass },
}

impl From<AliasError> for AccessError {
    fn from(source: AliasError) -> Self {
        AccessError::Alias { source }
    }
}

/// The discriminated payload of an ENBT value.
///
/// Sign information for integers and dense buffers lives in the value's
/// descriptor, so buffers are stored as raw unsigned bit patterns at the
/// element width.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No data (`None` and `Bit` values, reserved classes).
    Empty,
    /// A single bit.
    Bool(bool),
    /// 8-bit signed integer.
    I8(i8),
    /// 8-bit unsigned integer.
    U8(u8),
    /// 16-bit signed integer.
    I16(i16),
    /// 16-bit unsigned integer.
    U16(u16),
    /// 32-bit signed integer.
    I32(i32),
    /// 32-bit unsigned integer.
    U32(u32),
    /// 64-bit signed integer.
    I64(i64),
    /// 64-bit unsigned integer.
    U64(u64),
    /// 32-bit floating point number.
    F32(f32),
    /// 64-bit floating point number.
    F64(f64),
    /// A universally unique identifier.
    Uuid(uuid::Uuid),
    /// Dense 8-bit element buffer.
    U8Buf(C<u8>),
    /// Dense 16-bit element buffer.
    U16Buf(C<u16>),
    /// Dense 32-bit element buffer.
    U32Buf(C<u32>),
    /// Dense 64-bit element buffer.
    U64Buf(C<u64>),
    /// Child sequence (`Array`, `DArray` and `Structure`).
    Items(Box<C<Value>>),
    /// Entries of an aliased compound, keyed by alias id.
    AliasedEntries(HashMap<u16, Value>),
    /// Entries of an inline-string compound.
    NamedEntries(HashMap<String, Value>),
    /// The child of an `Optional` or `LogItem` value.
    Child(Option<Box<Value>>),
}

/// An owned ENBT value: one type descriptor plus its payload.
///
/// A value exclusively owns its payload and all transitively contained
/// values; clones are deep. `From` conversions exist for every scalar
/// width, floats, booleans, UUIDs, strings and typed slices.
///
/// # Example
///
/// ```
/// # use enbt_core::value::Value;
/// let mut v = Value::compound();
/// v.insert("answer", Value::from(42i32)).unwrap();
/// assert_eq!(v["answer"].to_int::<i32>().unwrap(), 42);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    descriptor: TypeDescriptor,
    payload: Payload,
}

/// A utility macro for implementing the conversion from a scalar type
/// into an ENBT value.
macro_rules! impl_from_for_scalar {
    ($typ:ty, $variant:ident, $len:expr, $signed:expr) => {
        impl From<$typ> for Value {
            fn from(value: $typ) -> Self {
                Value {
                    descriptor: TypeDescriptor::new(
                        TypeClass::Integer,
                        $len,
                        Endian::native(),
                        $signed,
                    ),
                    payload: Payload::$variant(value),
                }
            }
        }
    };
}

impl_from_for_scalar!(i8, I8, LenClass::Tiny, true);
impl_from_for_scalar!(u8, U8, LenClass::Tiny, false);
impl_from_for_scalar!(i16, I16, LenClass::Short, true);
impl_from_for_scalar!(u16, U16, LenClass::Short, false);
impl_from_for_scalar!(i32, I32, LenClass::Default, true);
impl_from_for_scalar!(u32, U32, LenClass::Default, false);
impl_from_for_scalar!(i64, I64, LenClass::Long, true);
impl_from_for_scalar!(u64, U64, LenClass::Long, false);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value {
            descriptor: TypeDescriptor::new(
                TypeClass::Floating,
                LenClass::Default,
                Endian::native(),
                false,
            ),
            payload: Payload::F32(value),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value {
            descriptor: TypeDescriptor::new(
                TypeClass::Floating,
                LenClass::Long,
                Endian::native(),
                false,
            ),
            payload: Payload::F64(value),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::bit(value)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(value: uuid::Uuid) -> Self {
        Value {
            descriptor: TypeDescriptor::new(
                TypeClass::Uuid,
                LenClass::Tiny,
                Endian::native(),
                false,
            ),
            payload: Payload::Uuid(value),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::from(value.as_bytes())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::from(value.into_bytes())
    }
}

/// A utility macro for implementing the conversion from dense element
/// slices into `SArray` values. Signed elements are stored as raw
/// unsigned bit patterns with the descriptor's sign flag set.
macro_rules! impl_from_for_sarray {
    ($typ:ty, $store:ty, $variant:ident, $len:expr, $signed:expr) => {
        impl From<&[$typ]> for Value {
            fn from(values: &[$typ]) -> Self {
                Value {
                    descriptor: TypeDescriptor::new(
                        TypeClass::SArray,
                        $len,
                        Endian::native(),
                        $signed,
                    ),
                    payload: Payload::$variant(values.iter().map(|&v| v as $store).collect()),
                }
            }
        }

        impl From<Vec<$typ>> for Value {
            fn from(values: Vec<$typ>) -> Self {
                Value::from(values.as_slice())
            }
        }
    };
}

impl_from_for_sarray!(u8, u8, U8Buf, LenClass::Tiny, false);
impl_from_for_sarray!(i8, u8, U8Buf, LenClass::Tiny, true);
impl_from_for_sarray!(u16, u16, U16Buf, LenClass::Short, false);
impl_from_for_sarray!(i16, u16, U16Buf, LenClass::Short, true);
impl_from_for_sarray!(u32, u32, U32Buf, LenClass::Default, false);
impl_from_for_sarray!(i32, u32, U32Buf, LenClass::Default, true);
impl_from_for_sarray!(u64, u64, U64Buf, LenClass::Long, false);
impl_from_for_sarray!(i64, u64, U64Buf, LenClass::Long, true);

impl Default for Value {
    fn default() -> Self {
        Value::none()
    }
}

impl Value {
    /// Create a value of the `None` class.
    pub fn none() -> Self {
        Value {
            descriptor: TypeDescriptor::of(TypeClass::None),
            payload: Payload::Empty,
        }
    }

    /// Create a single-bit value. The bit itself travels in the
    /// descriptor's sign flag.
    pub fn bit(value: bool) -> Self {
        Value {
            descriptor: TypeDescriptor::new(
                TypeClass::Bit,
                LenClass::Tiny,
                Endian::native(),
                value,
            ),
            payload: Payload::Bool(value),
        }
    }

    /// Create a 32-bit signed variable integer.
    pub fn var_i32(value: i32) -> Self {
        Value {
            descriptor: TypeDescriptor::new(
                TypeClass::VarInteger,
                LenClass::Default,
                Endian::native(),
                true,
            ),
            payload: Payload::I32(value),
        }
    }

    /// Create a 32-bit unsigned variable integer.
    pub fn var_u32(value: u32) -> Self {
        Value {
            descriptor: TypeDescriptor::new(
                TypeClass::VarInteger,
                LenClass::Default,
                Endian::native(),
                false,
            ),
            payload: Payload::U32(value),
        }
    }

    /// Create a 64-bit signed variable integer.
    pub fn var_i64(value: i64) -> Self {
        Value {
            descriptor: TypeDescriptor::new(
                TypeClass::VarInteger,
                LenClass::Long,
                Endian::native(),
                true,
            ),
            payload: Payload::I64(value),
        }
    }

    /// Create a 64-bit unsigned variable integer.
    pub fn var_u64(value: u64) -> Self {
        Value {
            descriptor: TypeDescriptor::new(
                TypeClass::VarInteger,
                LenClass::Long,
                Endian::native(),
                false,
            ),
            payload: Payload::U64(value),
        }
    }

    /// Create an empty inline-string compound.
    pub fn compound() -> Self {
        Value {
            descriptor: TypeDescriptor::new(
                TypeClass::Compound,
                LenClass::Tiny,
                Endian::native(),
                false,
            ),
            payload: Payload::NamedEntries(HashMap::new()),
        }
    }

    /// Create an inline-string compound from a map of entries.
    pub fn compound_from(entries: HashMap<String, Value>) -> Self {
        Value {
            descriptor: TypeDescriptor::new(
                TypeClass::Compound,
                LenClass::fitting(entries.len() as u64),
                Endian::native(),
                false,
            ),
            payload: Payload::NamedEntries(entries),
        }
    }

    /// Create an empty aliased compound, whose keys are 16-bit ids into
    /// the global alias-string table.
    pub fn aliased_compound() -> Self {
        Value {
            descriptor: TypeDescriptor::new(
                TypeClass::Compound,
                LenClass::Tiny,
                Endian::native(),
                true,
            ),
            payload: Payload::AliasedEntries(HashMap::new()),
        }
    }

    /// Create an aliased compound from a map of alias id entries.
    pub fn aliased_compound_from(entries: HashMap<u16, Value>) -> Self {
        Value {
            descriptor: TypeDescriptor::new(
                TypeClass::Compound,
                LenClass::fitting(entries.len() as u64),
                Endian::native(),
                true,
            ),
            payload: Payload::AliasedEntries(entries),
        }
    }

    /// Create a homogeneous array from a list of elements.
    ///
    /// Fails with [`AccessError::ElementMismatch`] when the elements do
    /// not all share one type descriptor.
    pub fn array(items: Vec<Value>) -> Result<Self, AccessError> {
        if let Some(first) = items.first() {
            let expected = element_descriptor(first);
            for item in &items[1..] {
                let got = element_descriptor(item);
                if got != expected {
                    return ElementMismatchSnafu { expected, got }.fail();
                }
            }
        }
        Ok(Value {
            descriptor: TypeDescriptor::new(
                TypeClass::Array,
                LenClass::fitting(items.len() as u64),
                Endian::native(),
                false,
            ),
            payload: Payload::Items(Box::new(items.into())),
        })
    }

    /// Create a heterogeneous array from a list of elements.
    pub fn darray(items: Vec<Value>) -> Self {
        Value {
            descriptor: TypeDescriptor::new(
                TypeClass::DArray,
                LenClass::fitting(items.len() as u64),
                Endian::native(),
                false,
            ),
            payload: Payload::Items(Box::new(items.into())),
        }
    }

    /// Create a fixed-arity structure. The arity is limited to 15.
    pub fn structure(fields: Vec<Value>) -> Result<Self, InvalidDescriptorError> {
        if fields.len() > 15 {
            return StructureAritySnafu {
                arity: fields.len(),
            }
            .fail();
        }
        Ok(Value {
            descriptor: TypeDescriptor::new(
                TypeClass::Structure,
                LenClass::Tiny,
                Endian::native(),
                false,
            ),
            payload: Payload::Items(Box::new(fields.into())),
        })
    }

    /// Create an optional value. The descriptor's sign flag mirrors
    /// the presence of the child.
    pub fn optional(child: Option<Value>) -> Self {
        Value {
            descriptor: TypeDescriptor::new(
                TypeClass::Optional,
                LenClass::Tiny,
                Endian::native(),
                child.is_some(),
            ),
            payload: Payload::Child(child.map(Box::new)),
        }
    }

    /// Create a log item wrapping one inner value. Log items carry a
    /// byte-size prefix on the wire, so readers can step over them
    /// without decoding.
    pub fn log_item(inner: Value) -> Self {
        Value {
            descriptor: TypeDescriptor::new(
                TypeClass::LogItem,
                LenClass::Tiny,
                Endian::native(),
                false,
            ),
            payload: Payload::Child(Some(Box::new(inner))),
        }
    }

    /// Create an empty container of the given descriptor, presized to
    /// `count` elements (dense buffers are zero filled, item sequences
    /// only reserve).
    ///
    /// Fails when the descriptor is invalid or when `count` does not fit
    /// its declared length class.
    pub fn with_descriptor(
        descriptor: TypeDescriptor,
        count: u64,
    ) -> Result<Self, InvalidDescriptorError> {
        descriptor.validate()?;
        descriptor.check_count(count)?;
        let payload = match descriptor.class {
            TypeClass::SArray => match descriptor.len {
                LenClass::Tiny => Payload::U8Buf(SmallVec::from_elem(0, count as usize)),
                LenClass::Short => Payload::U16Buf(SmallVec::from_elem(0, count as usize)),
                LenClass::Default => Payload::U32Buf(SmallVec::from_elem(0, count as usize)),
                LenClass::Long => Payload::U64Buf(SmallVec::from_elem(0, count as usize)),
            },
            TypeClass::Array | TypeClass::DArray => {
                Payload::Items(Box::new(SmallVec::with_capacity(count as usize)))
            }
            TypeClass::Compound if descriptor.signed => Payload::AliasedEntries(HashMap::new()),
            TypeClass::Compound => Payload::NamedEntries(HashMap::new()),
            _ => return PayloadMismatchSnafu { class: descriptor.class }.fail(),
        };
        Ok(Value {
            descriptor,
            payload,
        })
    }

    /// Pair a descriptor with its payload, checking that they agree.
    ///
    /// This is the constructor used by stream readers, which already
    /// hold a decoded descriptor.
    pub fn new(
        descriptor: TypeDescriptor,
        payload: Payload,
    ) -> Result<Self, InvalidDescriptorError> {
        descriptor.validate()?;
        let matches = match (&descriptor.class, &payload) {
            (TypeClass::None | TypeClass::ReservedVector, Payload::Empty) => true,
            (TypeClass::Bit, Payload::Bool(b)) => *b == descriptor.signed,
            (TypeClass::Integer | TypeClass::VarInteger, p) => {
                integer_payload_width(p) == Some(descriptor.len)
            }
            (TypeClass::Floating, Payload::F32(_)) => descriptor.len == LenClass::Default,
            (TypeClass::Floating, Payload::F64(_)) => descriptor.len == LenClass::Long,
            (TypeClass::Uuid, Payload::Uuid(_)) => true,
            (TypeClass::SArray, Payload::U8Buf(_)) => descriptor.len == LenClass::Tiny,
            (TypeClass::SArray, Payload::U16Buf(_)) => descriptor.len == LenClass::Short,
            (TypeClass::SArray, Payload::U32Buf(_)) => descriptor.len == LenClass::Default,
            (TypeClass::SArray, Payload::U64Buf(_)) => descriptor.len == LenClass::Long,
            (TypeClass::Array | TypeClass::DArray | TypeClass::Structure, Payload::Items(_)) => {
                true
            }
            (TypeClass::Compound, Payload::AliasedEntries(_)) => descriptor.signed,
            (TypeClass::Compound, Payload::NamedEntries(_)) => !descriptor.signed,
            (TypeClass::Optional, Payload::Child(c)) => c.is_some() == descriptor.signed,
            (TypeClass::LogItem, Payload::Child(Some(_))) => true,
            _ => false,
        };
        if !matches {
            return PayloadMismatchSnafu {
                class: descriptor.class,
            }
            .fail();
        }
        match (descriptor.class, &payload) {
            (TypeClass::Structure, Payload::Items(fields)) => {
                if fields.len() > 15 {
                    return StructureAritySnafu {
                        arity: fields.len(),
                    }
                    .fail();
                }
            }
            (TypeClass::Array, Payload::Items(items)) => {
                if let Some(first) = items.first() {
                    let expected = element_descriptor(first);
                    if items[1..]
                        .iter()
                        .any(|item| element_descriptor(item) != expected)
                    {
                        return PayloadMismatchSnafu {
                            class: descriptor.class,
                        }
                        .fail();
                    }
                }
                descriptor.check_count(items.len() as u64)?;
            }
            _ => {
                if let Some(count) = payload_count(&payload) {
                    descriptor.check_count(count)?;
                }
            }
        }
        Ok(Value {
            descriptor,
            payload,
        })
    }

    /// Replace the declared payload byte order. Only meaningful for
    /// scalar, UUID and dense-buffer values; the in-memory
    /// representation is always native.
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.descriptor.endian = endian;
        self
    }

    /// The type descriptor of this value.
    pub fn descriptor(&self) -> TypeDescriptor {
        self.descriptor
    }

    /// The type class of this value.
    pub fn type_class(&self) -> TypeClass {
        self.descriptor.class
    }

    /// The discriminated payload of this value.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The number of contained elements: entries for compounds, elements
    /// for arrays and dense buffers, fields for structures, 0 or 1 for
    /// optionals, and 0 for scalars.
    pub fn len(&self) -> usize {
        payload_count(&self.payload).unwrap_or(0) as usize
    }

    /// Whether this value contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this is a `None` value.
    pub fn is_none(&self) -> bool {
        self.descriptor.class == TypeClass::None
    }

    /// Whether this is a homogeneous or heterogeneous array.
    pub fn is_array(&self) -> bool {
        matches!(
            self.descriptor.class,
            TypeClass::Array | TypeClass::DArray
        )
    }

    /// Whether this is a compound of either key form.
    pub fn is_compound(&self) -> bool {
        self.descriptor.class == TypeClass::Compound
    }

    /// Take the value out, leaving `None` in its place.
    pub fn take(&mut self) -> Value {
        std::mem::take(self)
    }

    /// The descriptor shared by this array's elements, when the array
    /// is non-empty.
    pub fn element_descriptor(&self) -> Option<TypeDescriptor> {
        match (&self.descriptor.class, &self.payload) {
            (TypeClass::Array, Payload::Items(items)) => {
                items.first().map(element_descriptor)
            }
            _ => None,
        }
    }

    /// Borrow the child at `index` of an array, darray or structure.
    pub fn get(&self, index: usize) -> Result<&Value, AccessError> {
        match &self.payload {
            Payload::Items(items) if self.descriptor.is_sequence() => {
                items.get(index).ok_or_else(|| {
                    OutOfRangeSnafu {
                        index: index as u64,
                        len: items.len() as u64,
                    }
                    .build()
                })
            }
            _ => TypeMismatchSnafu {
                operation: "get",
                class: self.descriptor.class,
            }
            .fail(),
        }
    }

    /// Mutably borrow the child at `index` of an array, darray or
    /// structure.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut Value, AccessError> {
        match &mut self.payload {
            Payload::Items(items) if self.descriptor.is_sequence() => {
                let len = items.len();
                items.get_mut(index).ok_or_else(|| {
                    OutOfRangeSnafu {
                        index: index as u64,
                        len: len as u64,
                    }
                    .build()
                })
            }
            _ => TypeMismatchSnafu {
                operation: "get_mut",
                class: self.descriptor.class,
            }
            .fail(),
        }
    }

    /// Materialize the element at `index`. For dense buffers this
    /// builds a fresh integer value of the element width and sign;
    /// for item sequences it clones the child.
    pub fn at(&self, index: usize) -> Result<Value, AccessError> {
        let sarray_oob = |len: usize| {
            OutOfRangeSnafu {
                index: index as u64,
                len: len as u64,
            }
            .build()
        };
        match &self.payload {
            Payload::U8Buf(buf) => {
                let v = *buf.get(index).ok_or_else(|| sarray_oob(buf.len()))?;
                Ok(if self.descriptor.signed {
                    Value::from(v as i8)
                } else {
                    Value::from(v)
                })
            }
            Payload::U16Buf(buf) => {
                let v = *buf.get(index).ok_or_else(|| sarray_oob(buf.len()))?;
                Ok(if self.descriptor.signed {
                    Value::from(v as i16)
                } else {
                    Value::from(v)
                })
            }
            Payload::U32Buf(buf) => {
                let v = *buf.get(index).ok_or_else(|| sarray_oob(buf.len()))?;
                Ok(if self.descriptor.signed {
                    Value::from(v as i32)
                } else {
                    Value::from(v)
                })
            }
            Payload::U64Buf(buf) => {
                let v = *buf.get(index).ok_or_else(|| sarray_oob(buf.len()))?;
                Ok(if self.descriptor.signed {
                    Value::from(v as i64)
                } else {
                    Value::from(v)
                })
            }
            _ => self.get(index).cloned(),
        }
    }

    /// Borrow the entry under `key` of a compound. Aliased compounds
    /// translate the key through the global alias table first.
    pub fn get_named(&self, key: &str) -> Result<&Value, AccessError> {
        match &self.payload {
            Payload::NamedEntries(entries) => entries.get(key).ok_or_else(|| {
                KeyNotFoundSnafu {
                    key: key.to_owned(),
                }
                .build()
            }),
            Payload::AliasedEntries(entries) => {
                let alias = alias::to_alias(key)?;
                entries.get(&alias).ok_or_else(|| {
                    KeyNotFoundSnafu {
                        key: key.to_owned(),
                    }
                    .build()
                })
            }
            _ => TypeMismatchSnafu {
                operation: "get_named",
                class: self.descriptor.class,
            }
            .fail(),
        }
    }

    /// Mutably borrow the entry under `key` of a compound.
    pub fn get_named_mut(&mut self, key: &str) -> Result<&mut Value, AccessError> {
        match &mut self.payload {
            Payload::NamedEntries(entries) => entries.get_mut(key).ok_or_else(|| {
                KeyNotFoundSnafu {
                    key: key.to_owned(),
                }
                .build()
            }),
            Payload::AliasedEntries(entries) => {
                let alias = alias::to_alias(key)?;
                entries.get_mut(&alias).ok_or_else(|| {
                    KeyNotFoundSnafu {
                        key: key.to_owned(),
                    }
                    .build()
                })
            }
            _ => TypeMismatchSnafu {
                operation: "get_named_mut",
                class: self.descriptor.class,
            }
            .fail(),
        }
    }

    /// Whether a compound holds an entry under `key`. Returns `false`
    /// for aliased compounds when the key has no alias at all.
    pub fn contains_key(&self, key: &str) -> bool {
        match &self.payload {
            Payload::NamedEntries(entries) => entries.contains_key(key),
            Payload::AliasedEntries(entries) => match alias::to_alias(key) {
                Ok(alias) => entries.contains_key(&alias),
                Err(_) => false,
            },
            _ => false,
        }
    }

    /// Append an element to an array or darray.
    ///
    /// Homogeneous arrays reject elements whose descriptor differs from
    /// the current element descriptor; the first push fixes it. The
    /// declared length class grows as needed.
    pub fn push(&mut self, child: Value) -> Result<(), AccessError> {
        match self.descriptor.class {
            TypeClass::Array => {
                if let Payload::Items(items) = &self.payload {
                    if let Some(first) = items.first() {
                        let expected = element_descriptor(first);
                        let got = element_descriptor(&child);
                        if got != expected {
                            return ElementMismatchSnafu { expected, got }.fail();
                        }
                    }
                }
            }
            TypeClass::DArray => {}
            class => {
                return TypeMismatchSnafu {
                    operation: "push",
                    class,
                }
                .fail()
            }
        }
        if let Payload::Items(items) = &mut self.payload {
            items.push(child);
            let fitting = LenClass::fitting(items.len() as u64);
            if fitting > self.descriptor.len {
                self.descriptor.len = fitting;
            }
        }
        Ok(())
    }

    /// Remove and return the last element of an array or darray.
    pub fn pop(&mut self) -> Option<Value> {
        match (&self.descriptor.class, &mut self.payload) {
            (TypeClass::Array | TypeClass::DArray, Payload::Items(items)) => items.pop(),
            _ => None,
        }
    }

    /// Resize an array, darray or dense buffer to `count` elements.
    ///
    /// Item sequences grow with default values of the element
    /// descriptor, dense buffers grow zero filled. The declared length
    /// class is recomputed to the smallest that fits.
    pub fn resize(&mut self, count: usize) -> Result<(), AccessError> {
        match (&self.descriptor.class, &mut self.payload) {
            (TypeClass::Array | TypeClass::DArray, Payload::Items(items)) => {
                if count > items.len() {
                    let filler = match items.first() {
                        Some(first) => default_of(element_descriptor(first))?,
                        None => Value::none(),
                    };
                    items.resize(count, filler);
                } else {
                    items.truncate(count);
                }
                self.descriptor.len = LenClass::fitting(count as u64);
                Ok(())
            }
            (TypeClass::SArray, Payload::U8Buf(buf)) => {
                buf.resize(count, 0);
                Ok(())
            }
            (TypeClass::SArray, Payload::U16Buf(buf)) => {
                buf.resize(count, 0);
                Ok(())
            }
            (TypeClass::SArray, Payload::U32Buf(buf)) => {
                buf.resize(count, 0);
                Ok(())
            }
            (TypeClass::SArray, Payload::U64Buf(buf)) => {
                buf.resize(count, 0);
                Ok(())
            }
            (class, _) => TypeMismatchSnafu {
                operation: "resize",
                class: *class,
            }
            .fail(),
        }
    }

    /// Remove and return the element at `index` of an array or darray.
    pub fn remove(&mut self, index: usize) -> Result<Value, AccessError> {
        match (&self.descriptor.class, &mut self.payload) {
            (TypeClass::Array | TypeClass::DArray, Payload::Items(items)) => {
                if index >= items.len() {
                    return OutOfRangeSnafu {
                        index: index as u64,
                        len: items.len() as u64,
                    }
                    .fail();
                }
                Ok(items.remove(index))
            }
            (class, _) => TypeMismatchSnafu {
                operation: "remove",
                class: *class,
            }
            .fail(),
        }
    }

    /// Insert an entry into a compound, returning the previous value
    /// under the key if any. Aliased compounds translate the key through
    /// the global alias table, and may grow their count prefix only up
    /// to the 16-bit class.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: Value,
    ) -> Result<Option<Value>, AccessError> {
        let key = key.into();
        match &mut self.payload {
            Payload::NamedEntries(entries) => {
                let prior = entries.insert(key, value);
                let fitting = LenClass::fitting(entries.len() as u64);
                if fitting > self.descriptor.len {
                    self.descriptor.len = fitting;
                }
                Ok(prior)
            }
            Payload::AliasedEntries(entries) => {
                let alias = alias::to_alias(&key)?;
                let prior = entries.insert(alias, value);
                let fitting = LenClass::fitting(entries.len() as u64);
                if fitting > LenClass::Short {
                    return OverflowSnafu {
                        count: entries.len() as u64,
                        len: self.descriptor.len,
                    }
                    .fail();
                }
                if fitting > self.descriptor.len {
                    self.descriptor.len = fitting;
                }
                Ok(prior)
            }
            _ => TypeMismatchSnafu {
                operation: "insert",
                class: self.descriptor.class,
            }
            .fail(),
        }
    }

    /// Insert an entry into an aliased compound by alias id directly.
    pub fn insert_alias(
        &mut self,
        alias: u16,
        value: Value,
    ) -> Result<Option<Value>, AccessError> {
        match &mut self.payload {
            Payload::AliasedEntries(entries) => {
                let prior = entries.insert(alias, value);
                let fitting = LenClass::fitting(entries.len() as u64);
                if fitting > self.descriptor.len {
                    self.descriptor.len = fitting;
                }
                Ok(prior)
            }
            _ => TypeMismatchSnafu {
                operation: "insert_alias",
                class: self.descriptor.class,
            }
            .fail(),
        }
    }

    /// Remove an entry of a compound by key, returning it if present.
    pub fn remove_entry(&mut self, key: &str) -> Result<Option<Value>, AccessError> {
        match &mut self.payload {
            Payload::NamedEntries(entries) => Ok(entries.remove(key)),
            Payload::AliasedEntries(entries) => {
                let alias = alias::to_alias(key)?;
                Ok(entries.remove(&alias))
            }
            _ => TypeMismatchSnafu {
                operation: "remove_entry",
                class: self.descriptor.class,
            }
            .fail(),
        }
    }

    /// Replace the child of an optional value, toggling the presence
    /// flag accordingly.
    pub fn set_optional(&mut self, child: Option<Value>) -> Result<(), AccessError> {
        match self.descriptor.class {
            TypeClass::Optional => {
                self.descriptor.signed = child.is_some();
                self.payload = Payload::Child(child.map(Box::new));
                Ok(())
            }
            class => TypeMismatchSnafu {
                operation: "set_optional",
                class,
            }
            .fail(),
        }
    }

    /// Borrow the child of an optional or log-item value.
    pub fn child(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Child(child) => child.as_deref(),
            _ => None,
        }
    }

    /// View a dense 8-bit unsigned buffer as a UTF-8 string.
    pub fn to_str(&self) -> Result<Cow<'_, str>, ConvertError> {
        match &self.payload {
            Payload::U8Buf(buf) if !self.descriptor.signed => {
                std::str::from_utf8(buf).map(Cow::Borrowed).map_err(|_| {
                    ConvertError::new("utf-8 string", self.descriptor.class)
                })
            }
            _ => Err(ConvertError::new("utf-8 string", self.descriptor.class)),
        }
    }

    /// Iterate over `(name, child)` pairs.
    ///
    /// Sequence containers yield empty names; aliased compounds resolve
    /// names through the global alias table at iteration time, so each
    /// item is a `Result` that fails when an alias is missing from the
    /// table. Scalars yield nothing.
    pub fn iter(&self) -> Iter<'_> {
        let inner = match &self.payload {
            Payload::Items(items) => IterInner::Items(items.iter()),
            Payload::AliasedEntries(entries) => IterInner::Aliased(entries.iter()),
            Payload::NamedEntries(entries) => IterInner::Named(entries.iter()),
            Payload::Child(Some(child)) => IterInner::Child(Some(&**child)),
            _ => IterInner::Empty,
        };
        Iter { inner }
    }
}

/// Iterator over the `(name, child)` pairs of a value.
#[derive(Debug)]
pub struct Iter<'a> {
    inner: IterInner<'a>,
}

#[derive(Debug)]
enum IterInner<'a> {
    Empty,
    Items(std::slice::Iter<'a, Value>),
    Aliased(hash_map::Iter<'a, u16, Value>),
    Named(hash_map::Iter<'a, String, Value>),
    Child(Option<&'a Value>),
}

impl<'a> Iterator for Iter<'a> {
    type Item = Result<(Cow<'a, str>, &'a Value), AccessError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            IterInner::Empty => None,
            IterInner::Items(items) => items.next().map(|v| Ok((Cow::Borrowed(""), v))),
            IterInner::Aliased(entries) => entries.next().map(|(alias, v)| {
                let name = alias::from_alias(*alias)?;
                Ok((Cow::Owned(name), v))
            }),
            IterInner::Named(entries) => entries
                .next()
                .map(|(name, v)| Ok((Cow::Borrowed(name.as_str()), v))),
            IterInner::Child(child) => child.take().map(|v| Ok((Cow::Borrowed(""), v))),
        }
    }
}

impl std::ops::Index<usize> for Value {
    type Output = Value;

    /// Borrow the child at `index`, panicking when the index is out of
    /// range or the value is not a sequence container. Use
    /// [`Value::get`] for a fallible lookup.
    fn index(&self, index: usize) -> &Value {
        match self.get(index) {
            Ok(v) => v,
            Err(e) => panic!("{}", e),
        }
    }
}

impl std::ops::Index<&str> for Value {
    type Output = Value;

    /// Borrow the entry under `key`, panicking when the key is absent
    /// or the value is not a compound. Use [`Value::get_named`] for a
    /// fallible lookup.
    fn index(&self, key: &str) -> &Value {
        match self.get_named(key) {
            Ok(v) => v,
            Err(e) => panic!("{}", e),
        }
    }
}

/// The descriptor an element contributes to array homogeneity checks.
/// Bit elements carry their value in the sign flag, so it is masked out.
fn element_descriptor(value: &Value) -> TypeDescriptor {
    let mut descriptor = value.descriptor();
    if descriptor.class == TypeClass::Bit {
        descriptor.signed = false;
    }
    descriptor
}

/// A default value of the given descriptor, used as filler when
/// growing homogeneous arrays.
fn default_of(descriptor: TypeDescriptor) -> Result<Value, AccessError> {
    let payload = match descriptor.class {
        TypeClass::None => Payload::Empty,
        TypeClass::Bit => {
            return Ok(Value::bit(false));
        }
        TypeClass::Integer | TypeClass::VarInteger => match (descriptor.len, descriptor.signed) {
            (LenClass::Tiny, true) => Payload::I8(0),
            (LenClass::Tiny, false) => Payload::U8(0),
            (LenClass::Short, true) => Payload::I16(0),
            (LenClass::Short, false) => Payload::U16(0),
            (LenClass::Default, true) => Payload::I32(0),
            (LenClass::Default, false) => Payload::U32(0),
            (LenClass::Long, true) => Payload::I64(0),
            (LenClass::Long, false) => Payload::U64(0),
        },
        TypeClass::Floating => match descriptor.len {
            LenClass::Default => Payload::F32(0.),
            _ => Payload::F64(0.),
        },
        TypeClass::Uuid => Payload::Uuid(uuid::Uuid::nil()),
        TypeClass::SArray => match descriptor.len {
            LenClass::Tiny => Payload::U8Buf(C::new()),
            LenClass::Short => Payload::U16Buf(C::new()),
            LenClass::Default => Payload::U32Buf(C::new()),
            LenClass::Long => Payload::U64Buf(C::new()),
        },
        TypeClass::Array | TypeClass::DArray => Payload::Items(Box::new(C::new())),
        TypeClass::Compound if descriptor.signed => Payload::AliasedEntries(HashMap::new()),
        TypeClass::Compound => Payload::NamedEntries(HashMap::new()),
        TypeClass::Optional => Payload::Child(None),
        class => {
            return TypeMismatchSnafu {
                operation: "default element",
                class,
            }
            .fail()
        }
    };
    let mut descriptor = descriptor;
    if descriptor.class == TypeClass::Optional {
        descriptor.signed = false;
    }
    Ok(Value {
        descriptor,
        payload,
    })
}

fn integer_payload_width(payload: &Payload) -> Option<LenClass> {
    match payload {
        Payload::I8(_) | Payload::U8(_) => Some(LenClass::Tiny),
        Payload::I16(_) | Payload::U16(_) => Some(LenClass::Short),
        Payload::I32(_) | Payload::U32(_) => Some(LenClass::Default),
        Payload::I64(_) | Payload::U64(_) => Some(LenClass::Long),
        _ => None,
    }
}

fn payload_count(payload: &Payload) -> Option<u64> {
    match payload {
        Payload::U8Buf(buf) => Some(buf.len() as u64),
        Payload::U16Buf(buf) => Some(buf.len() as u64),
        Payload::U32Buf(buf) => Some(buf.len() as u64),
        Payload::U64Buf(buf) => Some(buf.len() as u64),
        Payload::Items(items) => Some(items.len() as u64),
        Payload::AliasedEntries(entries) => Some(entries.len() as u64),
        Payload::NamedEntries(entries) => Some(entries.len() as u64),
        Payload::Child(child) => Some(child.is_some() as u64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_construction_carries_width_and_sign() {
        let v = Value::from(-5i16);
        assert_eq!(v.type_class(), TypeClass::Integer);
        assert_eq!(v.descriptor().len, LenClass::Short);
        assert!(v.descriptor().signed);

        let v = Value::from(5u64);
        assert_eq!(v.descriptor().len, LenClass::Long);
        assert!(!v.descriptor().signed);

        let v = Value::from(2.5f32);
        assert_eq!(v.type_class(), TypeClass::Floating);
        assert_eq!(v.descriptor().len, LenClass::Default);
    }

    #[test]
    fn strings_become_byte_sarrays() {
        let v = Value::from("hi");
        assert_eq!(v.type_class(), TypeClass::SArray);
        assert_eq!(v.descriptor().len, LenClass::Tiny);
        assert_eq!(v.len(), 2);
        assert_eq!(v.to_str().unwrap(), "hi");
    }

    #[test]
    fn sarray_indexing_materializes_elements() {
        let v = Value::from(&[-1i16, 20, 300][..]);
        assert_eq!(v.at(0).unwrap(), Value::from(-1i16));
        assert_eq!(v.at(2).unwrap(), Value::from(300i16));
        assert!(matches!(
            v.at(3),
            Err(AccessError::OutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn array_enforces_homogeneity() {
        let mut arr = Value::array(vec![Value::from(1u8), Value::from(2u8)]).unwrap();
        assert!(arr.push(Value::from(3u8)).is_ok());
        assert!(matches!(
            arr.push(Value::from(4u16)),
            Err(AccessError::ElementMismatch { .. })
        ));
        assert_eq!(arr.len(), 3);

        // the first push fixes the element type
        let mut empty = Value::array(vec![]).unwrap();
        empty.push(Value::from(1.5f64)).unwrap();
        assert!(matches!(
            empty.push(Value::from(1u8)),
            Err(AccessError::ElementMismatch { .. })
        ));
    }

    #[test]
    fn mixed_elements_fail_array_construction() {
        assert!(matches!(
            Value::array(vec![Value::from(1u8), Value::from("x")]),
            Err(AccessError::ElementMismatch { .. })
        ));
    }

    #[test]
    fn bit_arrays_are_homogeneous_regardless_of_value() {
        let arr = Value::array(vec![Value::bit(true), Value::bit(false), Value::bit(true)]);
        assert!(arr.is_ok());
    }

    #[test]
    fn resize_recomputes_minimal_length_class() {
        let mut arr = Value::darray(vec![]);
        arr.resize(300).unwrap();
        assert_eq!(arr.len(), 300);
        assert_eq!(arr.descriptor().len, LenClass::Short);
        arr.resize(2).unwrap();
        assert_eq!(arr.descriptor().len, LenClass::Tiny);
    }

    #[test]
    fn sarray_resize_zero_fills() {
        let mut v = Value::from(&[7u32][..]);
        v.resize(3).unwrap();
        assert_eq!(v.at(1).unwrap(), Value::from(0u32));
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn compound_insert_lookup_remove() {
        let mut v = Value::compound();
        assert!(v.insert("a", Value::from(1u8)).unwrap().is_none());
        assert!(v.insert("a", Value::from(2u8)).unwrap().is_some());
        assert!(v.contains_key("a"));
        assert_eq!(v.get_named("a").unwrap(), &Value::from(2u8));
        assert!(matches!(
            v.get_named("b"),
            Err(AccessError::KeyNotFound { .. })
        ));
        assert_eq!(v.remove_entry("a").unwrap(), Some(Value::from(2u8)));
        assert!(v.is_empty());
    }

    #[test]
    fn tiny_compound_overflows_at_construction() {
        let descriptor =
            TypeDescriptor::new(TypeClass::Compound, LenClass::Tiny, Endian::native(), false);
        assert!(Value::with_descriptor(descriptor, 300).is_err());
    }

    #[test]
    fn optional_toggles_presence() {
        let mut v = Value::optional(None);
        assert!(!v.descriptor().signed);
        assert!(v.child().is_none());
        v.set_optional(Some(Value::from(1u8))).unwrap();
        assert!(v.descriptor().signed);
        assert_eq!(v.child(), Some(&Value::from(1u8)));

        // empty optionals compare equal, present and empty do not
        assert_eq!(Value::optional(None), Value::optional(None));
        assert_ne!(Value::optional(None), Value::optional(Some(Value::none())));
    }

    #[test]
    fn structure_arity_is_limited() {
        assert!(Value::structure(vec![Value::none(); 15]).is_ok());
        assert!(matches!(
            Value::structure(vec![Value::none(); 16]),
            Err(InvalidDescriptorError::StructureArity { .. })
        ));
    }

    #[test]
    fn moves_leave_none_behind() {
        let mut v = Value::from(3u32);
        let taken = v.take();
        assert_eq!(taken, Value::from(3u32));
        assert!(v.is_none());
    }

    #[test]
    fn iteration_over_sequences_yields_empty_names() {
        let arr = Value::darray(vec![Value::from(1u8), Value::from("x")]);
        let pairs: Vec<_> = arr.iter().map(|r| r.unwrap()).collect();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|(name, _)| name.is_empty()));
    }
}
