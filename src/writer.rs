//! The public writer surface, spec.md §6: `openWriter`/`write`/`close`.
//! Grounded on `parquet2::write::file::FileWriter`'s start/write/end
//! lifecycle, collapsed around this crate's `WriteBuffer` (a whole row
//! group's already-shredded columns) instead of a per-column page
//! iterator, since this crate shreds records directly rather than
//! re-encoding pre-shredded Arrow arrays.

use crate::error::{config_err, Result};
use crate::metadata::{ColumnChunkMetaData, FileMetaData, KeyValue, RowGroupMetaData};
use crate::page::{encode_page, PageVersion};
use crate::schema::Compression;
use crate::schema::Schema;
use crate::shred::WriteBuffer;
use parquet_format_safe::thrift::protocol::{TCompactOutputProtocol, TOutputProtocol};
use std::io::Write;

const PARQUET_MAGIC: [u8; 4] = *b"PAR1";
const FOOTER_SIZE: u64 = 8;

/// Knobs spec.md §6 names: which data page layout to emit, which
/// compression codec, and the advisory row-group size a caller should
/// flush a [`WriteBuffer`] at (this writer itself writes whatever
/// buffer it's handed as exactly one row group; batching rows into
/// row groups of that size is the caller's responsibility, mirroring
/// `parquet2::write::WriteOptions`).
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    pub use_v2_pages: bool,
    pub compression: Compression,
    pub row_group_size: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            use_v2_pages: false,
            compression: Compression::Uncompressed,
            row_group_size: 1024 * 1024,
        }
    }
}

/// Writes a Parquet file: magic, one or more row groups, footer.
/// Use [`FileWriter::start`] to write the header, [`FileWriter::write_row_group`]
/// once per row group, and [`FileWriter::end`] to write the footer.
pub struct FileWriter<W: Write> {
    writer: W,
    schema: Schema,
    options: WriteOptions,
    created_by: Option<String>,
    offset: u64,
    row_groups: Vec<RowGroupMetaData>,
}

impl<W: Write> FileWriter<W> {
    pub fn new(writer: W, schema: Schema, options: WriteOptions, created_by: Option<String>) -> Self {
        Self {
            writer,
            schema,
            options,
            created_by,
            offset: 0,
            row_groups: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn start(&mut self) -> Result<()> {
        self.writer.write_all(&PARQUET_MAGIC)?;
        self.offset = PARQUET_MAGIC.len() as u64;
        Ok(())
    }

    /// Writes one row group's worth of already-shredded columns.
    pub fn write_row_group(&mut self, buffer: &WriteBuffer) -> Result<()> {
        if self.offset == 0 {
            return Err(config_err!("FileWriter::start must be called before writing a row group"));
        }
        if buffer.columns.len() != self.schema.num_columns() {
            return Err(config_err!(
                "row group has {} columns, schema has {}",
                buffer.columns.len(),
                self.schema.num_columns()
            ));
        }

        let version = if self.options.use_v2_pages { PageVersion::V2 } else { PageVersion::V1 };
        let mut columns = Vec::with_capacity(buffer.columns.len());

        for (col, descriptor) in buffer.columns.iter().zip(self.schema.leaves()) {
            let start_offset = self.offset;
            let page = encode_page(col, descriptor, 0, col.count(), version, descriptor.compression)?;

            let mut header_bytes = Vec::new();
            {
                let mut protocol = TCompactOutputProtocol::new(&mut header_bytes);
                page.header.write_to_out_protocol(&mut protocol)?;
                protocol.flush()?;
            }
            self.writer.write_all(&header_bytes)?;
            self.writer.write_all(&page.buffer)?;
            self.offset += (header_bytes.len() + page.buffer.len()) as u64;

            columns.push(ColumnChunkMetaData::new(
                descriptor,
                descriptor.compression,
                col.count() as i64,
                page.header.compressed_page_size as i64 + header_bytes.len() as i64,
                page.header.uncompressed_page_size as i64 + header_bytes.len() as i64,
                start_offset as i64,
                Some(col.stats.finish()),
            ));
        }

        self.row_groups.push(RowGroupMetaData::new(columns, buffer.num_rows as i64));
        Ok(())
    }

    /// Writes the footer and returns the total file size and the
    /// underlying writer.
    pub fn end(mut self, key_value_metadata: Option<Vec<KeyValue>>) -> Result<(u64, W)> {
        let num_rows = self.row_groups.iter().map(|g| g.num_rows()).sum();
        let metadata = FileMetaData {
            schema: self.schema,
            row_groups: self.row_groups,
            num_rows,
            created_by: self.created_by,
            key_value_metadata,
        };

        let mut footer_bytes = Vec::new();
        {
            let mut protocol = TCompactOutputProtocol::new(&mut footer_bytes);
            metadata.to_thrift().write_to_out_protocol(&mut protocol)?;
            protocol.flush()?;
        }
        self.writer.write_all(&footer_bytes)?;

        let mut trailer = [0u8; FOOTER_SIZE as usize];
        trailer[..4].copy_from_slice(&(footer_bytes.len() as i32).to_le_bytes());
        trailer[4..].copy_from_slice(&PARQUET_MAGIC);
        self.writer.write_all(&trailer)?;

        let total = self.offset + footer_bytes.len() as u64 + FOOTER_SIZE;
        Ok((total, self.writer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::FileReader;
    use crate::schema::{FieldDef, PhysicalType};
    use crate::shred::shred_record;
    use crate::value::Value;
    use std::io::Cursor;

    fn schema() -> Schema {
        Schema::new(vec![
            ("id", FieldDef::required_leaf(PhysicalType::Int64)),
            ("name", FieldDef::required_leaf(PhysicalType::ByteArray).optional()),
        ])
        .unwrap()
    }

    #[test]
    fn writes_and_reads_back_a_single_row_group() {
        let schema = schema();
        let mut buffer = WriteBuffer::new(&schema);
        for i in 0..5i64 {
            let name = if i == 2 { Value::Null } else { Value::utf8(format!("row-{i}")) };
            shred_record(&schema, &Value::group([("id", Value::Int64(i)), ("name", name)]), &mut buffer).unwrap();
        }

        let mut writer = FileWriter::new(Cursor::new(Vec::new()), schema, WriteOptions::default(), Some("test-writer".into()));
        writer.start().unwrap();
        writer.write_row_group(&buffer).unwrap();
        let (_size, cursor) = writer.end(None).unwrap();

        let mut reader = FileReader::new(cursor).unwrap();
        assert_eq!(reader.metadata().num_rows, 5);
        let records = reader.read_row_group(0).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[2].as_group().unwrap().get("name"), Some(&Value::Null));
    }

    #[test]
    fn rejects_row_group_with_wrong_column_count() {
        let schema = schema();
        let mut writer = FileWriter::new(Cursor::new(Vec::new()), schema, WriteOptions::default(), None);
        writer.start().unwrap();
        let mismatched = WriteBuffer {
            columns: vec![Default::default()],
            num_rows: 0,
        };
        let err = writer.write_row_group(&mismatched).unwrap_err();
        assert!(matches!(err, crate::error::Error::InvalidConfig(_)));
    }
}
