//! Error kinds shared by the arithmetic engine and its foreign surfaces.
//!
//! Every variant has a stable numeric code (see [`Error::code`]) which is what
//! crosses the C boundary in `pyfrac_error.code`.

use std::ffi::NulError;
use std::os::raw::c_int;
use std::str::Utf8Error;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("division by zero")]
    DivisionByZero,

    #[error("malformed fraction {input:?}: {reason}")]
    MalformedFraction { input: String, reason: &'static str },

    #[error("allocation failure")]
    AllocationFailure,

    #[error("invalid base {0}: expected 2..=36")]
    InvalidBase(u32),

    #[error("exponent too large")]
    ExponentTooLarge,

    #[error("exponent must be an integer, got {0}")]
    NonIntegerExponent(String),

    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unknown name {0:?}")]
    UnknownName(String),

    #[error("invalid bytecode: {0}")]
    InvalidBytecode(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("invalid UTF-8 in argument: {0}")]
    InvalidUtf8(#[from] Utf8Error),

    #[error("null pointer passed as {0}")]
    NullPointer(&'static str),

    #[error("string contains an interior NUL byte")]
    InteriorNul,

    #[error("panic in native code: {0}")]
    Panic(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable code reported through the C ABI. Zero is reserved for success.
    pub fn code(&self) -> c_int {
        match self {
            Error::DivisionByZero => 1,
            Error::MalformedFraction { .. } => 2,
            Error::AllocationFailure => 3,
            Error::InvalidBase(_) => 4,
            Error::ExponentTooLarge => 5,
            Error::NonIntegerExponent(_) => 6,
            Error::Syntax { .. } => 7,
            Error::UnknownName(_) => 8,
            Error::InvalidBytecode(_) => 9,
            Error::InvalidOptions(_) => 10,
            Error::InvalidUtf8(_) => 11,
            Error::NullPointer(_) => 12,
            Error::InteriorNul => 13,
            Error::Panic(_) => 14,
        }
    }

    pub(crate) fn malformed(input: &str, reason: &'static str) -> Error {
        Error::MalformedFraction {
            input: input.to_string(),
            reason,
        }
    }

    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Error {
        Error::Syntax {
            offset,
            message: message.into(),
        }
    }
}

impl From<NulError> for Error {
    fn from(_: NulError) -> Error {
        Error::InteriorNul
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::InvalidOptions(e.to_string())
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Error {
        Error::AllocationFailure
    }
}
