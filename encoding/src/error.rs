//! Crate-level error types.

use enbt_core::{InvalidDescriptorError, LenClass};
use snafu::{Backtrace, Snafu};

/// Type alias for a result from this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The main error type for wire-level encoding and decoding failures.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    /// The descriptor byte names a type class outside the format.
    #[snafu(display("unknown type class {} in descriptor byte", value))]
    UnknownTypeClass { value: u8, backtrace: Backtrace },

    /// The decoded descriptor violates a structural invariant.
    #[snafu(display("malformed type descriptor: {}", source))]
    MalformedDescriptor { source: InvalidDescriptorError },

    /// A domain variant does not fit the reserved 56-bit space.
    #[snafu(display("domain variant {} does not fit any descriptor width", variant))]
    DomainVariantWidth { variant: u64, backtrace: Backtrace },

    /// A variable integer ran past its maximum byte count.
    #[snafu(display("variable integer exceeds {} bytes", max_bytes))]
    VarIntegerOverrun {
        max_bytes: usize,
        backtrace: Backtrace,
    },

    /// A length does not fit the 62-bit compressed length space.
    #[snafu(display("length {} cannot be compressed into 62 bits", value))]
    LengthOverflow { value: u64, backtrace: Backtrace },

    /// A count does not fit the width declared by the length class.
    #[snafu(display("count {} does not fit length class {:?}", count, len))]
    CountOverflow {
        count: u64,
        len: LenClass,
        backtrace: Backtrace,
    },

    /// The underlying stream failed.
    #[snafu(display("I/O failure on the underlying stream"))]
    Io {
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        use snafu::IntoError;
        IoSnafu.into_error(source)
    }
}
