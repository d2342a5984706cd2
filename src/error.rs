//! Library error types.
//!
use std::fmt;
use std::str::Utf8Error;

use serde::{de, ser};

/// A cose-pack Result, normally returning a cose-pack [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A cose-pack error. Encompasses any issue that can happen during
/// encoding, decoding, or envelope validation.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Input ended before the current item was complete.
    LengthTooShort {
        /// What step of the decoding we were on when it failed.
        step: &'static str,
        /// How many bytes were actually left
        actual: usize,
        /// How many bytes the item still needed
        expected: usize,
    },
    /// Input or encoded output was larger than the maximum allowed size.
    LengthTooLong {
        /// The maximum allowed size
        max: usize,
        /// The actual size
        actual: usize,
    },
    /// An array, map, nesting level, or integer hit a hard codec limit.
    ParseLimit(String),
    /// The byte stream isn't valid for this format: a bad additional-info
    /// value, a reserved simple value, or an encoder refusal.
    BadEncode(String),
    /// A text string wasn't valid UTF-8.
    BadUtf8(Utf8Error),
    /// A map key wasn't an integer or a text string.
    BadKey(String),
    /// An envelope's outer tag didn't match the expected tag number. `actual`
    /// is `None` when the top-level item wasn't tagged at all.
    TagMismatch {
        /// The tag number the envelope requires
        expected: u64,
        /// The tag number actually present, if any
        actual: Option<u64>,
    },
    /// A protected header failed validation.
    BadHeader(String),
    /// A structure didn't have the required shape: wrong arity, wrong field
    /// type, or a malformed key descriptor.
    FailValidate(String),
    /// Occurs when serde serialization or deserialization fails
    SerdeFail(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::LengthTooShort {
                step,
                actual,
                expected,
            } => write!(
                f,
                "Expected {} more bytes, but only {} remain on step [{}]",
                expected, actual, step
            ),
            Error::LengthTooLong { max, actual } => write!(
                f,
                "Data too long: was {} bytes, maximum allowed is {}",
                actual, max
            ),
            Error::ParseLimit(ref err) => write!(f, "Hit parsing limit: {}", err),
            Error::BadEncode(ref err) => write!(f, "Data encoding failure: {}", err),
            Error::BadUtf8(ref err) => write!(f, "Text string wasn't valid UTF-8: {}", err),
            Error::BadKey(ref err) => write!(f, "Bad map key: {}", err),
            Error::TagMismatch { expected, actual } => match actual {
                Some(actual) => write!(
                    f,
                    "Expected tag {}, but data was tagged with {}",
                    expected, actual
                ),
                None => write!(f, "Expected tag {}, but data wasn't tagged", expected),
            },
            Error::BadHeader(ref err) => f.write_str(err),
            Error::FailValidate(ref err) => write!(f, "Failed validation: {}", err),
            Error::SerdeFail(ref msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::BadUtf8(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<Utf8Error> for Error {
    fn from(e: Utf8Error) -> Self {
        Self::BadUtf8(e)
    }
}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}
