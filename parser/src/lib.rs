//! This crate works on top of the ENBT encoding primitives to provide
//! the streaming surface of the format: a token writer with
//! back-patching container builders, a token reader that materializes
//! value trees, a skipper that steps over tokens without decoding, a
//! pull-style cursor with peek support, and path lookup into a stream.
//!
//! A stream starts with a one-byte version header, then holds one
//! self-describing token per value. Reading a file end to end:
//!
//! ```no_run
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut source = std::io::BufReader::new(std::fs::File::open("save.enbt")?);
//! let value = enbt_parser::read::read_file(&mut source)?;
//! # let _ = value;
//! # Ok(())
//! # }
//! ```

pub mod cursor;
pub mod element;
pub mod lookup;
pub mod read;
pub mod skip;
pub mod write;

pub use crate::cursor::ValueReadStream;
pub use crate::element::SArrayElement;
pub use crate::lookup::{find_value_compound, get_value_path, index_array, move_to_value_path};
pub use crate::read::{check_version, read_asn_strings, read_file, read_token, read_value};
pub use crate::skip::{skip_token, skip_value};
pub use crate::write::{
    write_asn_strings, write_token, write_value, write_version, ValueWriteStream,
};
