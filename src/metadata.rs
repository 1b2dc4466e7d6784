//! File and row-group metadata: spec.md §4.8. Thin wrappers over the
//! `parquet-format-safe` thrift structs that give them a typed,
//! `Schema`-aware accessor surface instead of raw `Option<Vec<T>>`
//! fields.
//!
//! Grounded on `parquet2::metadata::{FileMetaData, RowGroupMetaData,
//! ColumnChunkMetaData}`.

use crate::error::{corrupt_err, Result};
use crate::schema::node::ColumnDescriptor;
use crate::schema::thrift::{from_thrift, to_thrift};
use crate::schema::{Compression, Schema};
use crate::statistics::ColumnStatistics;
use parquet_format_safe::{ColumnChunk, ColumnMetaData, KeyValue as TKeyValue, RowGroup, Statistics as TStatistics};

pub use parquet_format_safe::KeyValue;

/// A single column chunk's on-disk placement and summary statistics.
#[derive(Debug, Clone)]
pub struct ColumnChunkMetaData {
    path: Vec<String>,
    compression: Compression,
    num_values: i64,
    total_compressed_size: i64,
    total_uncompressed_size: i64,
    data_page_offset: i64,
    statistics: Option<ColumnStatistics>,
}

impl ColumnChunkMetaData {
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn num_values(&self) -> i64 {
        self.num_values
    }

    pub fn compressed_size(&self) -> i64 {
        self.total_compressed_size
    }

    pub fn uncompressed_size(&self) -> i64 {
        self.total_uncompressed_size
    }

    pub fn data_page_offset(&self) -> i64 {
        self.data_page_offset
    }

    pub fn statistics(&self) -> Option<&ColumnStatistics> {
        self.statistics.as_ref()
    }

    pub(crate) fn new(
        descriptor: &ColumnDescriptor,
        compression: Compression,
        num_values: i64,
        total_compressed_size: i64,
        total_uncompressed_size: i64,
        data_page_offset: i64,
        statistics: Option<ColumnStatistics>,
    ) -> Self {
        Self {
            path: descriptor.path.clone(),
            compression,
            num_values,
            total_compressed_size,
            total_uncompressed_size,
            data_page_offset,
            statistics,
        }
    }

    pub(crate) fn to_thrift(&self, descriptor: &ColumnDescriptor) -> ColumnChunk {
        let meta = ColumnMetaData {
            type_: descriptor.physical_type.into(),
            encodings: vec![crate::schema::Encoding::Plain.into(), crate::schema::Encoding::Rle.into()],
            path_in_schema: self.path.clone(),
            codec: self.compression.into(),
            num_values: self.num_values,
            total_uncompressed_size: self.total_uncompressed_size,
            total_compressed_size: self.total_compressed_size,
            key_value_metadata: None,
            data_page_offset: self.data_page_offset,
            index_page_offset: None,
            dictionary_page_offset: None,
            statistics: self.statistics.as_ref().map(statistics_to_thrift),
            encoding_stats: None,
            bloom_filter_offset: None,
        };
        ColumnChunk {
            file_path: None,
            file_offset: self.data_page_offset,
            meta_data: Some(meta),
            offset_index_offset: None,
            offset_index_length: None,
            column_index_offset: None,
            column_index_length: None,
            crypto_metadata: None,
            encrypted_column_metadata: None,
        }
    }

    pub(crate) fn try_from_thrift(schema: &Schema, chunk: ColumnChunk) -> Result<Self> {
        let meta = chunk
            .meta_data
            .ok_or_else(|| corrupt_err!("ColumnChunk is missing its meta_data"))?;
        let descriptor = schema
            .leaf_by_path(&meta.path_in_schema)
            .ok_or_else(|| corrupt_err!("column chunk path {:?} is not in the schema", meta.path_in_schema))?;
        let compression = Compression::try_from(meta.codec)?;
        let statistics = meta
            .statistics
            .map(|s| statistics_from_thrift(&s, descriptor))
            .transpose()?;
        Ok(Self {
            path: meta.path_in_schema,
            compression,
            num_values: meta.num_values,
            total_compressed_size: meta.total_compressed_size,
            total_uncompressed_size: meta.total_uncompressed_size,
            data_page_offset: meta.data_page_offset,
            statistics,
        })
    }
}

fn statistics_to_thrift(stats: &ColumnStatistics) -> TStatistics {
    let encode = |v: &crate::value::Value| crate::encoding::plain::encode(std::slice::from_ref(v), value_physical_type(v)).ok();
    TStatistics {
        max: stats.max.as_ref().and_then(encode),
        min: stats.min.as_ref().and_then(encode),
        null_count: Some(stats.null_count),
        distinct_count: Some(stats.distinct_count),
        max_value: None,
        min_value: None,
    }
}

fn value_physical_type(v: &crate::value::Value) -> crate::schema::PhysicalType {
    use crate::schema::PhysicalType;
    use crate::value::Value;
    match v {
        Value::Boolean(_) => PhysicalType::Boolean,
        Value::Int32(_) => PhysicalType::Int32,
        Value::Int64(_) => PhysicalType::Int64,
        Value::Int96(_) => PhysicalType::Int96,
        Value::Float(_) => PhysicalType::Float,
        Value::Double(_) => PhysicalType::Double,
        Value::Bytes(_) | Value::FixedLenBytes(_) => PhysicalType::ByteArray,
        Value::Null | Value::Group(_) | Value::List(_) => unreachable!("statistics never observe container values"),
    }
}

fn statistics_from_thrift(stats: &TStatistics, descriptor: &ColumnDescriptor) -> Result<ColumnStatistics> {
    let decode_one = |bytes: &[u8]| -> Result<crate::value::Value> {
        let mut values = crate::encoding::plain::decode(bytes, descriptor.physical_type, descriptor.type_length, 1)?;
        Ok(values.remove(0))
    };
    Ok(ColumnStatistics {
        null_count: stats.null_count.unwrap_or(0),
        distinct_count: stats.distinct_count.unwrap_or(0),
        min: stats.min.as_deref().map(decode_one).transpose()?,
        max: stats.max.as_deref().map(decode_one).transpose()?,
    })
}

/// One row group's column chunks plus row count.
#[derive(Debug, Clone)]
pub struct RowGroupMetaData {
    columns: Vec<ColumnChunkMetaData>,
    num_rows: i64,
}

impl RowGroupMetaData {
    pub fn columns(&self) -> &[ColumnChunkMetaData] {
        &self.columns
    }

    pub fn num_rows(&self) -> i64 {
        self.num_rows
    }

    pub fn column(&self, i: usize) -> &ColumnChunkMetaData {
        &self.columns[i]
    }

    pub(crate) fn new(columns: Vec<ColumnChunkMetaData>, num_rows: i64) -> Self {
        Self { columns, num_rows }
    }

    pub(crate) fn to_thrift(&self, schema: &Schema) -> RowGroup {
        let total_byte_size = self.columns.iter().map(|c| c.total_compressed_size).sum();
        RowGroup {
            columns: self
                .columns
                .iter()
                .zip(schema.leaves())
                .map(|(c, d)| c.to_thrift(d))
                .collect(),
            total_byte_size,
            num_rows: self.num_rows,
            sorting_columns: None,
            file_offset: None,
            total_compressed_size: None,
            ordinal: None,
        }
    }

    pub(crate) fn try_from_thrift(schema: &Schema, group: RowGroup) -> Result<Self> {
        let columns = group
            .columns
            .into_iter()
            .map(|c| ColumnChunkMetaData::try_from_thrift(schema, c))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            columns,
            num_rows: group.num_rows,
        })
    }
}

/// Whole-file metadata: schema plus every row group, per spec.md §4.8.
#[derive(Debug, Clone)]
pub struct FileMetaData {
    pub schema: Schema,
    pub row_groups: Vec<RowGroupMetaData>,
    pub num_rows: i64,
    pub created_by: Option<String>,
    pub key_value_metadata: Option<Vec<KeyValue>>,
}

const WRITER_VERSION: i32 = 1;

impl FileMetaData {
    pub(crate) fn to_thrift(&self) -> parquet_format_safe::FileMetaData {
        parquet_format_safe::FileMetaData {
            version: WRITER_VERSION,
            schema: to_thrift(&self.schema),
            num_rows: self.num_rows,
            row_groups: self.row_groups.iter().map(|g| g.to_thrift(&self.schema)).collect(),
            key_value_metadata: self.key_value_metadata.clone(),
            created_by: self.created_by.clone(),
            column_orders: None,
            encryption_algorithm: None,
            footer_signing_key_metadata: None,
        }
    }

    pub(crate) fn try_from_thrift(meta: parquet_format_safe::FileMetaData) -> Result<Self> {
        let schema = from_thrift(&meta.schema)?;
        let row_groups = meta
            .row_groups
            .into_iter()
            .map(|g| RowGroupMetaData::try_from_thrift(&schema, g))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            schema,
            row_groups,
            num_rows: meta.num_rows,
            created_by: meta.created_by,
            key_value_metadata: meta.key_value_metadata,
        })
    }
}

/// Builds a `KeyValue` entry the way every writer in the ecosystem
/// does, as a convenience for callers assembling `key_value_metadata`.
pub fn key_value(key: impl Into<String>, value: impl Into<String>) -> KeyValue {
    TKeyValue {
        key: key.into(),
        value: Some(value.into()),
    }
}
