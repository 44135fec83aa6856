//! Arithmetic coercion of values into native numeric types.

use super::{Payload, Value};
use crate::header::TypeClass;
use num_traits::NumCast;
use snafu::Snafu;

/// An error raised when a value cannot be coerced into the requested
/// numeric type.
#[derive(Debug, Snafu, Clone, PartialEq)]
#[snafu(display("could not convert {:?} value into a {}", original, requested))]
pub struct ConvertError {
    /// The requested type.
    requested: &'static str,
    /// The type class of the value where the conversion was attempted.
    original: TypeClass,
}

impl ConvertError {
    pub(crate) fn new(requested: &'static str, original: TypeClass) -> Self {
        ConvertError {
            requested,
            original,
        }
    }
}

impl Value {
    /// Coerce this value into an integer type through standard numeric
    /// casting.
    ///
    /// `None` yields zero and `Bit` yields 0 or 1. Conversion from
    /// non-numeric values, or a cast that cannot represent the value,
    /// fails with [`ConvertError`].
    pub fn to_int<T>(&self) -> Result<T, ConvertError>
    where
        T: NumCast,
    {
        let fail = || ConvertError::new(std::any::type_name::<T>(), self.descriptor.class);
        match self.payload {
            Payload::Empty if self.descriptor.class == TypeClass::None => {
                T::from(0u8).ok_or_else(fail)
            }
            Payload::Bool(b) => T::from(b as u8).ok_or_else(fail),
            Payload::I8(v) => T::from(v).ok_or_else(fail),
            Payload::U8(v) => T::from(v).ok_or_else(fail),
            Payload::I16(v) => T::from(v).ok_or_else(fail),
            Payload::U16(v) => T::from(v).ok_or_else(fail),
            Payload::I32(v) => T::from(v).ok_or_else(fail),
            Payload::U32(v) => T::from(v).ok_or_else(fail),
            Payload::I64(v) => T::from(v).ok_or_else(fail),
            Payload::U64(v) => T::from(v).ok_or_else(fail),
            Payload::F32(v) => T::from(v).ok_or_else(fail),
            Payload::F64(v) => T::from(v).ok_or_else(fail),
            _ => Err(fail()),
        }
    }

    /// Coerce this value into a 32-bit floating point number.
    pub fn to_float32(&self) -> Result<f32, ConvertError> {
        self.to_int()
    }

    /// Coerce this value into a 64-bit floating point number.
    pub fn to_float64(&self) -> Result<f64, ConvertError> {
        self.to_int()
    }

    /// Coerce this value into a boolean: numeric values map to their
    /// comparison against zero, `None` is `false`.
    pub fn to_bool(&self) -> Result<bool, ConvertError> {
        let fail = || ConvertError::new("bool", self.descriptor.class);
        match self.payload {
            Payload::Empty if self.descriptor.class == TypeClass::None => Ok(false),
            Payload::Bool(b) => Ok(b),
            Payload::I8(v) => Ok(v != 0),
            Payload::U8(v) => Ok(v != 0),
            Payload::I16(v) => Ok(v != 0),
            Payload::U16(v) => Ok(v != 0),
            Payload::I32(v) => Ok(v != 0),
            Payload::U32(v) => Ok(v != 0),
            Payload::I64(v) => Ok(v != 0),
            Payload::U64(v) => Ok(v != 0),
            Payload::F32(v) => Ok(v != 0.),
            Payload::F64(v) => Ok(v != 0.),
            _ => Err(fail()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_and_narrowing_casts() {
        assert_eq!(Value::from(200u8).to_int::<i64>().unwrap(), 200);
        assert_eq!(Value::from(-1i32).to_int::<i64>().unwrap(), -1);
        assert_eq!(Value::from(2.75f64).to_int::<i32>().unwrap(), 2);
        assert_eq!(Value::from(7i8).to_float64().unwrap(), 7.0);
        // a narrowing cast that cannot represent the value fails
        assert!(Value::from(-1i32).to_int::<u8>().is_err());
    }

    #[test]
    fn none_and_bits_are_numeric_zeroes() {
        assert_eq!(Value::none().to_int::<u32>().unwrap(), 0);
        assert_eq!(Value::bit(true).to_int::<u32>().unwrap(), 1);
        assert_eq!(Value::bit(false).to_int::<u32>().unwrap(), 0);
        assert!(!Value::none().to_bool().unwrap());
        assert!(Value::from(3u8).to_bool().unwrap());
    }

    #[test]
    fn var_integers_are_numeric() {
        assert_eq!(Value::var_i64(-9).to_int::<i64>().unwrap(), -9);
        assert_eq!(Value::var_u32(9).to_int::<u8>().unwrap(), 9);
    }

    #[test]
    fn non_numeric_values_do_not_convert() {
        assert!(Value::from("text").to_int::<i32>().is_err());
        assert!(Value::compound().to_float32().is_err());
        assert!(Value::from(uuid::Uuid::nil()).to_int::<u64>().is_err());
    }
}
