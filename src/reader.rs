//! The public reader surface, spec.md §6: `openReader`/`getCursor`/
//! `close`. Grounded on `parquet2::read::metadata::read_metadata`'s
//! footer-scanning algorithm (read a fixed-size tail, validate magic,
//! locate the footer from the length it encodes) and on
//! `parquet2::read::page::read_page_header`'s use of
//! `TCompactInputProtocol` directly over the chunk bytes, since the
//! compact protocol is self-delimiting and does not need a pre-scanned
//! length.

use crate::assemble::materialize_records;
use crate::error::{corrupt_err, Result};
use crate::metadata::FileMetaData;
use crate::page::decode_page;
use crate::shred::{ColumnBuffer, WriteBuffer};
use crate::value::Value;
use parquet_format_safe::thrift::protocol::TCompactInputProtocol;
use parquet_format_safe::{FileMetaData as TFileMetaData, PageHeader};
use std::io::{Cursor, Read, Seek, SeekFrom};

const PARQUET_MAGIC: [u8; 4] = *b"PAR1";
const FOOTER_SIZE: u64 = 8;
const DEFAULT_FOOTER_READ_SIZE: u64 = 64 * 1024;

fn stream_len<R: Seek>(reader: &mut R) -> Result<u64> {
    let current = reader.stream_position()?;
    let len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(current))?;
    Ok(len)
}

/// Reads a file's footer metadata, per spec.md §4.8's layout.
pub fn read_metadata<R: Read + Seek>(reader: &mut R) -> Result<FileMetaData> {
    let file_size = stream_len(reader)?;
    if file_size < FOOTER_SIZE {
        return Err(corrupt_err!("file is smaller than the footer"));
    }

    let tail_len = DEFAULT_FOOTER_READ_SIZE.min(file_size);
    reader.seek(SeekFrom::End(-(tail_len as i64)))?;
    let mut tail = vec![0u8; tail_len as usize];
    reader.read_exact(&mut tail)?;

    if tail[tail.len() - 4..] != PARQUET_MAGIC {
        return Err(corrupt_err!("footer magic is missing or corrupt"));
    }
    let metadata_len = i32::from_le_bytes(tail[tail.len() - 8..tail.len() - 4].try_into().unwrap());
    if metadata_len < 0 {
        return Err(corrupt_err!("footer metadata length is negative"));
    }
    let footer_and_metadata_len = FOOTER_SIZE + metadata_len as u64;
    if footer_and_metadata_len > file_size {
        return Err(corrupt_err!("footer metadata length overruns the file"));
    }

    let t_metadata = if footer_and_metadata_len <= tail_len {
        let start = tail.len() - footer_and_metadata_len as usize;
        let mut cursor = Cursor::new(&tail[start..tail.len() - FOOTER_SIZE as usize]);
        let mut protocol = TCompactInputProtocol::new(&mut cursor, usize::MAX);
        TFileMetaData::read_from_in_protocol(&mut protocol)?
    } else {
        reader.seek(SeekFrom::End(-(footer_and_metadata_len as i64)))?;
        let mut buf = vec![0u8; metadata_len as usize];
        reader.read_exact(&mut buf)?;
        let mut cursor = Cursor::new(buf);
        let mut protocol = TCompactInputProtocol::new(&mut cursor, usize::MAX);
        TFileMetaData::read_from_in_protocol(&mut protocol)?
    };

    FileMetaData::try_from_thrift(t_metadata)
}

/// Validates the leading magic, per spec.md §4.8/§6.
fn check_header<R: Read + Seek>(reader: &mut R) -> Result<()> {
    reader.seek(SeekFrom::Start(0))?;
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != PARQUET_MAGIC {
        return Err(corrupt_err!("file header magic is missing or corrupt"));
    }
    Ok(())
}

/// Reads one row group's worth of column chunks back into a
/// [`WriteBuffer`], looping pages per chunk until its declared
/// compressed size is exhausted (spec.md §4.6).
fn read_row_group_buffer<R: Read + Seek>(reader: &mut R, metadata: &FileMetaData, row_group_index: usize) -> Result<WriteBuffer> {
    let group = metadata
        .row_groups
        .get(row_group_index)
        .ok_or_else(|| corrupt_err!("row group index {} out of range", row_group_index))?;
    let mut columns = Vec::with_capacity(metadata.schema.num_columns());

    for (chunk, descriptor) in group.columns().iter().zip(metadata.schema.leaves()) {
        let mut remaining = chunk.compressed_size();
        reader.seek(SeekFrom::Start(chunk.data_page_offset() as u64))?;

        let mut buffer = ColumnBuffer::default();
        while remaining > 0 {
            let mut header_protocol = CountingReader::new(reader.by_ref());
            let mut protocol = TCompactInputProtocol::new(&mut header_protocol, usize::MAX);
            let header = PageHeader::read_from_in_protocol(&mut protocol)?;
            let header_len = header_protocol.count();

            let mut body = vec![0u8; header.compressed_page_size as usize];
            reader.read_exact(&mut body)?;

            let decoded = decode_page(&header, &body, descriptor, descriptor.compression)?;
            buffer.d_levels.extend(decoded.d_levels);
            buffer.r_levels.extend(decoded.r_levels);
            for value in decoded.values {
                buffer.stats.observe(&value, descriptor.physical_type);
                buffer.values.push(value);
            }

            remaining -= (header_len + body.len()) as i64;
        }
        columns.push(buffer);
    }

    Ok(WriteBuffer {
        columns,
        num_rows: group.num_rows() as usize,
    })
}

/// A thin wrapper counting bytes pulled through it, so the page loop
/// can tell how many bytes a self-delimiting thrift header consumed
/// without pre-scanning its length.
struct CountingReader<R> {
    inner: R,
    count: usize,
}

impl<R> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, count: 0 }
    }
    fn count(&self) -> usize {
        self.count
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n;
        Ok(n)
    }
}

/// Reads a whole Parquet file, one row group at a time.
#[derive(Debug)]
pub struct FileReader<R: Read + Seek> {
    reader: R,
    metadata: FileMetaData,
}

impl<R: Read + Seek> FileReader<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        check_header(&mut reader)?;
        let metadata = read_metadata(&mut reader)?;
        Ok(Self { reader, metadata })
    }

    pub fn metadata(&self) -> &FileMetaData {
        &self.metadata
    }

    pub fn num_row_groups(&self) -> usize {
        self.metadata.row_groups.len()
    }

    /// Reads and materializes row group `index` in full.
    pub fn read_row_group(&mut self, index: usize) -> Result<Vec<Value>> {
        let buffer = read_row_group_buffer(&mut self.reader, &self.metadata, index)?;
        materialize_records(&self.metadata.schema, &buffer)
    }

    /// Reads every row group in file order.
    pub fn read_all(&mut self) -> Result<Vec<Value>> {
        let mut out = Vec::with_capacity(self.metadata.num_rows as usize);
        for i in 0..self.num_row_groups() {
            out.extend(self.read_row_group(i)?);
        }
        Ok(out)
    }

    pub fn close(self) -> R {
        self.reader
    }
}
