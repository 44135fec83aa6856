//! This crate contains the core value model of the ENBT
//! ("Enchanted Named Binary Tag") binary serialization format.
//!
//! It comprises the [type descriptor](header::TypeDescriptor) carried by
//! every token on the wire, the owned [value tree](value::Value) with
//! indexing, iteration and arithmetic coercion, the process-wide
//! [alias-string table](alias) used by aliased compounds, and
//! [paths](path::ValuePath) for addressing sub-values.
//!
//! The wire codec itself lives in the `enbt-encoding` crate, and the
//! streaming reader and writer in `enbt-parser`.

pub mod alias;
pub mod header;
pub mod path;
pub mod value;

pub use crate::header::{Endian, InvalidDescriptorError, LenClass, TypeClass, TypeDescriptor};
pub use crate::path::{PathSegment, ValuePath};
pub use crate::value::{AccessError, ConvertError, Payload, Value};

/// The one-byte stream version this library reads and writes.
/// The high nibble is the major version and the low nibble the minor.
pub const VERSION: u8 = 0x10;
