//! Crate-wide error type.
//!
//! Grounded on `parquet2::error::ParquetError`, widened from its two
//! variants to the five kinds the shredding/assembly engine needs to
//! distinguish: a malformed record can't be blamed on the same thing as
//! a malformed byte stream.

use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// A record does not conform to its schema: a required field is
    /// missing, or a non-repeated field received an array.
    SchemaMismatch(String),
    /// The on-disk byte stream violates an invariant: bad magic, a level
    /// above its maximum, a length that doesn't add up.
    CorruptStream(String),
    /// A recognized-but-unimplemented encoding, page type, or
    /// compression algorithm.
    Unsupported(String),
    /// The underlying byte source failed.
    Io(std::io::Error),
    /// The schema description itself is invalid: missing typeLength,
    /// conflicting repetition flags, duplicate field names.
    InvalidConfig(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SchemaMismatch(msg) => write!(f, "schema mismatch: {msg}"),
            Error::CorruptStream(msg) => write!(f, "corrupt stream: {msg}"),
            Error::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
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

impl From<parquet_format_safe::thrift::Error> for Error {
    fn from(e: parquet_format_safe::thrift::Error) -> Self {
        Error::CorruptStream(format!("thrift decode error: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

macro_rules! schema_err {
    ($fmt:expr) => (crate::error::Error::SchemaMismatch($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (crate::error::Error::SchemaMismatch(format!($fmt, $($args),*)));
}

macro_rules! corrupt_err {
    ($fmt:expr) => (crate::error::Error::CorruptStream($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (crate::error::Error::CorruptStream(format!($fmt, $($args),*)));
}

macro_rules! config_err {
    ($fmt:expr) => (crate::error::Error::InvalidConfig($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (crate::error::Error::InvalidConfig(format!($fmt, $($args),*)));
}

macro_rules! unsupported_err {
    ($fmt:expr) => (crate::error::Error::Unsupported($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (crate::error::Error::Unsupported(format!($fmt, $($args),*)));
}

pub(crate) use config_err;
pub(crate) use corrupt_err;
pub(crate) use schema_err;
pub(crate) use unsupported_err;
