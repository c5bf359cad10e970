//! The central ledger of all encode/decode failures.

use std::fmt;

/// Errors produced while encoding or decoding MessagePack values, or while
/// registering extension types.
#[derive(Debug)]
pub enum Error {
    /// Unsupported host-value kind on encode, a non-string map key under
    /// `str_keys`, an invalid option argument, or a decoder function that
    /// returned the wrong shape.
    Type(String),
    /// Malformed wire data: truncated input, the reserved `0xc1` tag,
    /// invalid UTF-8 in a string, or an unknown ext id.
    Value(String),
    /// An integer or length field does not fit the wire format's range.
    Overflow(String),
    /// A container cycle was detected, or `max_depth` was exceeded.
    Recursion,
    /// The decode input cannot be viewed as bytes.
    Buffer(String),
    /// Underlying file-stream I/O failure.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Type(msg) => write!(f, "type error: {msg}"),
            Error::Value(msg) => write!(f, "value error: {msg}"),
            Error::Overflow(msg) => write!(f, "overflow error: {msg}"),
            Error::Recursion => write!(f, "recursion limit exceeded or cycle detected"),
            Error::Buffer(msg) => write!(f, "buffer error: {msg}"),
            Error::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Specialized `Result` for codec operations.
pub type Result<T> = std::result::Result<T, Error>;
