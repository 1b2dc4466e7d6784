//! Primitive/logical type enumeration and the thrift-facing enums
//! (repetition, encoding, compression) that sit alongside them.
//!
//! Grounded on `parquet2::schema::types::{PhysicalType, LogicalType,
//! ConvertedType}` and `parquet2::parquet_bridge` (the thrift <-> Rust
//! enum bridges), collapsed into one module since this crate does not
//! carry the converted-type/logical-type split `parquet2` needs for
//! Arrow interop.

use crate::error::{corrupt_err, unsupported_err, Error, Result};
use parquet_format_safe::{
    CompressionCodec, Encoding as TEncoding, FieldRepetitionType, Type as TType,
};

/// Repetition of a schema node, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Repetition {
    Required,
    Optional,
    Repeated,
}

impl From<Repetition> for FieldRepetitionType {
    fn from(r: Repetition) -> Self {
        match r {
            Repetition::Required => FieldRepetitionType::REQUIRED,
            Repetition::Optional => FieldRepetitionType::OPTIONAL,
            Repetition::Repeated => FieldRepetitionType::REPEATED,
        }
    }
}

impl TryFrom<FieldRepetitionType> for Repetition {
    type Error = Error;

    fn try_from(r: FieldRepetitionType) -> Result<Self> {
        Ok(match r {
            FieldRepetitionType::REQUIRED => Repetition::Required,
            FieldRepetitionType::OPTIONAL => Repetition::Optional,
            FieldRepetitionType::REPEATED => Repetition::Repeated,
            other => return Err(corrupt_err!("unknown FieldRepetitionType {:?}", other)),
        })
    }
}

/// Primitive physical types, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    Int96,
    Float,
    Double,
    ByteArray,
    FixedLenByteArray,
}

impl From<PhysicalType> for TType {
    fn from(t: PhysicalType) -> Self {
        match t {
            PhysicalType::Boolean => TType::BOOLEAN,
            PhysicalType::Int32 => TType::INT32,
            PhysicalType::Int64 => TType::INT64,
            PhysicalType::Int96 => TType::INT96,
            PhysicalType::Float => TType::FLOAT,
            PhysicalType::Double => TType::DOUBLE,
            PhysicalType::ByteArray => TType::BYTE_ARRAY,
            PhysicalType::FixedLenByteArray => TType::FIXED_LEN_BYTE_ARRAY,
        }
    }
}

impl TryFrom<TType> for PhysicalType {
    type Error = Error;

    fn try_from(t: TType) -> Result<Self> {
        Ok(match t {
            TType::BOOLEAN => PhysicalType::Boolean,
            TType::INT32 => PhysicalType::Int32,
            TType::INT64 => PhysicalType::Int64,
            TType::INT96 => PhysicalType::Int96,
            TType::FLOAT => PhysicalType::Float,
            TType::DOUBLE => PhysicalType::Double,
            TType::BYTE_ARRAY => PhysicalType::ByteArray,
            TType::FIXED_LEN_BYTE_ARRAY => PhysicalType::FixedLenByteArray,
            other => return Err(corrupt_err!("unknown physical Type {:?}", other)),
        })
    }
}

/// Logical/converted types recognized at the core level, per spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    Utf8,
    Date,
    TimestampMillis,
    TimestampMicros,
    Interval,
    Bson,
}

/// Value encoding used on a leaf. Only `Plain` is produced by this
/// crate's writer; `Rle`/`BitPacked` are recognized on read because
/// `parquet-format-safe`'s `Encoding` enum names them for level
/// streams, and `PlainDictionary`/others are rejected as
/// [`Error::Unsupported`], per spec.md §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Plain,
    Rle,
    BitPacked,
}

impl From<Encoding> for TEncoding {
    fn from(e: Encoding) -> Self {
        match e {
            Encoding::Plain => TEncoding::PLAIN,
            Encoding::Rle => TEncoding::RLE,
            Encoding::BitPacked => TEncoding::BIT_PACKED,
        }
    }
}

impl TryFrom<TEncoding> for Encoding {
    type Error = Error;

    fn try_from(e: TEncoding) -> Result<Self> {
        Ok(match e {
            TEncoding::PLAIN => Encoding::Plain,
            TEncoding::RLE => Encoding::Rle,
            TEncoding::BIT_PACKED => Encoding::BitPacked,
            other => return Err(unsupported_err!("encoding {:?} is not implemented", other)),
        })
    }
}

/// Compression algorithm named on a leaf, per spec.md §6. `Lzo` is
/// recognized but always rejected when actually used, matching
/// spec.md's "LZO is recognized but unimplemented".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    Uncompressed,
    Snappy,
    Gzip,
    Brotli,
    Lz4,
    Lzo,
}

impl From<Compression> for CompressionCodec {
    fn from(c: Compression) -> Self {
        match c {
            Compression::Uncompressed => CompressionCodec::UNCOMPRESSED,
            Compression::Snappy => CompressionCodec::SNAPPY,
            Compression::Gzip => CompressionCodec::GZIP,
            Compression::Brotli => CompressionCodec::BROTLI,
            Compression::Lz4 => CompressionCodec::LZ4,
            Compression::Lzo => CompressionCodec::LZO,
        }
    }
}

impl TryFrom<CompressionCodec> for Compression {
    type Error = Error;

    fn try_from(c: CompressionCodec) -> Result<Self> {
        Ok(match c {
            CompressionCodec::UNCOMPRESSED => Compression::Uncompressed,
            CompressionCodec::SNAPPY => Compression::Snappy,
            CompressionCodec::GZIP => Compression::Gzip,
            CompressionCodec::BROTLI => Compression::Brotli,
            CompressionCodec::LZ4 => Compression::Lz4,
            CompressionCodec::LZO => Compression::Lzo,
            other => return Err(unsupported_err!("compression {:?} is not implemented", other)),
        })
    }
}
