//! This crate contains the wire-level encoding and decoding primitives
//! of the ENBT binary format: byte-order-aware scalar codecs, the two
//! length prefix encodings, the variable-integer codec and the type
//! descriptor codec.
//!
//! The value model lives in `enbt-core` and the streaming reader and
//! writer in `enbt-parser`.

pub mod decode;
pub mod encode;
pub mod error;
pub mod length;
pub mod typeid;
pub mod varint;

pub use crate::decode::BasicDecoder;
pub use crate::encode::BasicEncoder;
pub use crate::error::{Error, Result};
pub use crate::length::{
    read_compressed_len, read_define_len, write_compressed_len, write_define_len,
};
pub use crate::typeid::{read_descriptor, write_descriptor};

use byteordered::Endianness;
use enbt_core::Endian;

/// Map a descriptor byte order flag onto the byteordered vocabulary.
pub fn endianness_of(endian: Endian) -> Endianness {
    match endian {
        Endian::Little => Endianness::Little,
        Endian::Big => Endianness::Big,
    }
}
