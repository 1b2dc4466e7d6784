//! Data pages: spec.md §4.6. A page bundles one column chunk's
//! repetition levels, definition levels, and values for a slice of
//! rows into a single (optionally compressed) byte buffer, framed by
//! a `PageHeader`. Two page layouts are supported, matching the
//! Parquet format: V1 wraps each level stream in its own 4-byte
//! little-endian length prefix and compresses the whole body; V2
//! gives level lengths directly in the header and never compresses
//! the level streams, only the values.
//!
//! Grounded on `parquet2::page::{DataPageHeader, CompressedDataPage}`
//! for the V1/V2 split, with the dictionary-page and page-index
//! machinery it also carries dropped (spec.md's non-goals: no
//! dictionary encoding, no page indexes).

use crate::compression::create_codec;
use crate::encoding::{bitpacking, hybrid_rle, plain};
use crate::error::{corrupt_err, unsupported_err, Result};
use crate::schema::node::ColumnDescriptor;
use crate::schema::{Compression, Encoding};
use crate::shred::ColumnBuffer;
use crate::value::Value;
use parquet_format_safe::{DataPageHeader, DataPageHeaderV2, Encoding as TEncoding, PageHeader, PageType};

/// Which of the two on-disk data page layouts to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageVersion {
    V1,
    V2,
}

fn level_num_bits(level_max: i16) -> u8 {
    bitpacking::bit_width(level_max as u32)
}

fn encode_levels(levels: &[i16], level_max: i16) -> Vec<u8> {
    let mut out = Vec::new();
    hybrid_rle::encode(levels, level_num_bits(level_max), &mut out);
    out
}

fn decode_levels(bytes: &[u8], level_max: i16, count: usize) -> Vec<i16> {
    hybrid_rle::decode(bytes, level_num_bits(level_max), count)
}

fn with_length_prefix(bytes: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

/// One encoded, possibly-compressed page ready to be written out.
pub struct EncodedPage {
    pub header: PageHeader,
    pub buffer: Vec<u8>,
}

/// Encodes the rows `[start, end)` of `column` into one data page.
pub fn encode_page(
    column: &ColumnBuffer,
    descriptor: &ColumnDescriptor,
    start: usize,
    end: usize,
    version: PageVersion,
    compression: Compression,
) -> Result<EncodedPage> {
    let d_levels = &column.d_levels[start..end];
    let r_levels = &column.r_levels[start..end];
    let num_values = d_levels.len();
    let num_nulls = d_levels.iter().filter(|&&d| d != descriptor.d_level_max).count();

    let value_start = column.d_levels[..start].iter().filter(|&&d| d == descriptor.d_level_max).count();
    let value_end = value_start + (num_values - num_nulls);
    let values = &column.values[value_start..value_end];
    let values_bytes = plain::encode(values, descriptor.physical_type)?;

    let rep_bytes = if descriptor.r_level_max > 0 {
        encode_levels(r_levels, descriptor.r_level_max)
    } else {
        Vec::new()
    };
    let def_bytes = if descriptor.d_level_max > 0 {
        encode_levels(d_levels, descriptor.d_level_max)
    } else {
        Vec::new()
    };

    match version {
        PageVersion::V1 => {
            let mut body = Vec::new();
            if descriptor.r_level_max > 0 {
                with_length_prefix(&rep_bytes, &mut body);
            }
            if descriptor.d_level_max > 0 {
                with_length_prefix(&def_bytes, &mut body);
            }
            body.extend_from_slice(&values_bytes);

            let uncompressed_size = body.len();
            let compressed = compress_body(&body, compression)?;

            let header = PageHeader {
                type_: PageType::DATA_PAGE,
                uncompressed_page_size: uncompressed_size as i32,
                compressed_page_size: compressed.len() as i32,
                crc: None,
                data_page_header: Some(DataPageHeader {
                    num_values: num_values as i32,
                    encoding: TEncoding::PLAIN,
                    definition_level_encoding: TEncoding::RLE,
                    repetition_level_encoding: TEncoding::RLE,
                    statistics: None,
                }),
                index_page_header: None,
                dictionary_page_header: None,
                data_page_header_v2: None,
            };
            Ok(EncodedPage { header, buffer: compressed })
        }
        PageVersion::V2 => {
            let compressed_values = compress_body(&values_bytes, compression)?;
            let is_compressed = compression != Compression::Uncompressed;

            let mut body = Vec::with_capacity(rep_bytes.len() + def_bytes.len() + compressed_values.len());
            body.extend_from_slice(&rep_bytes);
            body.extend_from_slice(&def_bytes);
            body.extend_from_slice(&compressed_values);

            let uncompressed_size = rep_bytes.len() + def_bytes.len() + values_bytes.len();

            let header = PageHeader {
                type_: PageType::DATA_PAGE_V2,
                uncompressed_page_size: uncompressed_size as i32,
                compressed_page_size: body.len() as i32,
                crc: None,
                data_page_header: None,
                index_page_header: None,
                dictionary_page_header: None,
                data_page_header_v2: Some(DataPageHeaderV2 {
                    num_values: num_values as i32,
                    num_nulls: num_nulls as i32,
                    num_rows: num_values as i32,
                    encoding: TEncoding::PLAIN,
                    definition_levels_byte_length: def_bytes.len() as i32,
                    repetition_levels_byte_length: rep_bytes.len() as i32,
                    is_compressed: Some(is_compressed),
                    statistics: None,
                }),
            };
            Ok(EncodedPage { header, buffer: body })
        }
    }
}

fn compress_body(body: &[u8], compression: Compression) -> Result<Vec<u8>> {
    match create_codec(compression)? {
        None => Ok(body.to_vec()),
        Some(mut codec) => {
            let mut out = Vec::new();
            codec.compress(body, &mut out)?;
            Ok(out)
        }
    }
}

fn decompress_body(body: &[u8], compression: Compression, uncompressed_size: usize) -> Result<Vec<u8>> {
    match create_codec(compression)? {
        None => Ok(body.to_vec()),
        Some(mut codec) => {
            let mut out = vec![0u8; uncompressed_size];
            codec.decompress(body, &mut out)?;
            Ok(out)
        }
    }
}

/// A decoded page's contribution to a column: the triples the
/// assembler consumes, already split out from the wire framing.
#[derive(Debug)]
pub struct DecodedPage {
    pub d_levels: Vec<i16>,
    pub r_levels: Vec<i16>,
    pub values: Vec<Value>,
}

/// Reverses [`encode_page`].
pub fn decode_page(header: &PageHeader, buffer: &[u8], descriptor: &ColumnDescriptor, compression: Compression) -> Result<DecodedPage> {
    match header.type_ {
        PageType::DATA_PAGE => {
            let h = header
                .data_page_header
                .as_ref()
                .ok_or_else(|| corrupt_err!("DATA_PAGE header missing data_page_header"))?;
            if h.encoding != TEncoding::PLAIN {
                return Err(unsupported_err!("encoding {:?} is not implemented", h.encoding));
            }
            let num_values = h.num_values as usize;
            let body = decompress_body(buffer, compression, header.uncompressed_page_size as usize)?;
            let mut pos = 0usize;

            let r_levels = if descriptor.r_level_max > 0 {
                let (levels, consumed) = read_length_prefixed_levels(&body[pos..], descriptor.r_level_max, num_values)?;
                pos += consumed;
                levels
            } else {
                vec![0i16; num_values]
            };
            let d_levels = if descriptor.d_level_max > 0 {
                let (levels, consumed) = read_length_prefixed_levels(&body[pos..], descriptor.d_level_max, num_values)?;
                pos += consumed;
                levels
            } else {
                vec![0i16; num_values]
            };

            let num_present = d_levels.iter().filter(|&&d| d == descriptor.d_level_max).count();
            let values = plain::decode(&body[pos..], descriptor.physical_type, descriptor.type_length, num_present)?;
            Ok(DecodedPage { d_levels, r_levels, values })
        }
        PageType::DATA_PAGE_V2 => {
            let h = header
                .data_page_header_v2
                .as_ref()
                .ok_or_else(|| corrupt_err!("DATA_PAGE_V2 header missing data_page_header_v2"))?;
            if h.encoding != TEncoding::PLAIN {
                return Err(unsupported_err!("encoding {:?} is not implemented", h.encoding));
            }
            let num_values = h.num_values as usize;
            let rep_len = h.repetition_levels_byte_length as usize;
            let def_len = h.definition_levels_byte_length as usize;

            let rep_bytes = &buffer[..rep_len];
            let def_bytes = &buffer[rep_len..rep_len + def_len];
            let is_compressed = h.is_compressed.unwrap_or(true);
            let values_compressed = &buffer[rep_len + def_len..];
            let uncompressed_values_len = header.uncompressed_page_size as usize - rep_len - def_len;
            let values_bytes = if is_compressed {
                decompress_body(values_compressed, compression, uncompressed_values_len)?
            } else {
                values_compressed.to_vec()
            };

            let r_levels = if descriptor.r_level_max > 0 {
                decode_levels(rep_bytes, descriptor.r_level_max, num_values)
            } else {
                vec![0i16; num_values]
            };
            let d_levels = if descriptor.d_level_max > 0 {
                decode_levels(def_bytes, descriptor.d_level_max, num_values)
            } else {
                vec![0i16; num_values]
            };

            let num_present = num_values - h.num_nulls as usize;
            let values = plain::decode(&values_bytes, descriptor.physical_type, descriptor.type_length, num_present)?;
            Ok(DecodedPage { d_levels, r_levels, values })
        }
        other => Err(unsupported_err!("page type {:?} is not implemented", other)),
    }
}

fn read_length_prefixed_levels(bytes: &[u8], level_max: i16, count: usize) -> Result<(Vec<i16>, usize)> {
    if bytes.len() < 4 {
        return Err(corrupt_err!("page body ended before a level stream's length prefix"));
    }
    let len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let rle_bytes = bytes.get(4..4 + len).ok_or_else(|| corrupt_err!("level stream length prefix overruns the page body"))?;
    Ok((decode_levels(rle_bytes, level_max, count), 4 + len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, PhysicalType, Schema};
    use crate::shred::{shred_record, WriteBuffer};
    use crate::value::Value;

    fn schema() -> Schema {
        Schema::new(vec![
            ("id", FieldDef::required_leaf(PhysicalType::Int64)),
            ("tag", FieldDef::required_leaf(PhysicalType::ByteArray).optional()),
        ])
        .unwrap()
    }

    fn buffer() -> (Schema, WriteBuffer) {
        let schema = schema();
        let mut buffer = WriteBuffer::new(&schema);
        for i in 0..10 {
            let tag = if i % 3 == 0 { Value::Null } else { Value::utf8(format!("t{i}")) };
            shred_record(&schema, &Value::group([("id", Value::Int64(i)), ("tag", tag)]), &mut buffer).unwrap();
        }
        (schema, buffer)
    }

    #[test]
    fn v1_page_round_trips() {
        let (schema, buffer) = buffer();
        let descriptor = schema.leaf_by_path(&["tag".to_string()]).unwrap();
        let col = &buffer.columns[1];

        let page = encode_page(col, descriptor, 0, col.count(), PageVersion::V1, Compression::Uncompressed).unwrap();
        let decoded = decode_page(&page.header, &page.buffer, descriptor, Compression::Uncompressed).unwrap();

        assert_eq!(decoded.d_levels, col.d_levels);
        assert_eq!(decoded.r_levels, col.r_levels);
        assert_eq!(decoded.values, col.values);
    }

    #[test]
    fn v2_page_round_trips_with_compression() {
        let (schema, buffer) = buffer();
        let descriptor = schema.leaf_by_path(&["tag".to_string()]).unwrap();
        let col = &buffer.columns[1];

        let page = encode_page(col, descriptor, 0, col.count(), PageVersion::V2, Compression::Uncompressed).unwrap();
        let decoded = decode_page(&page.header, &page.buffer, descriptor, Compression::Uncompressed).unwrap();

        assert_eq!(decoded.d_levels, col.d_levels);
        assert_eq!(decoded.values, col.values);
    }

    #[test]
    fn required_column_has_no_level_streams() {
        let (schema, buffer) = buffer();
        let descriptor = schema.leaf_by_path(&["id".to_string()]).unwrap();
        let col = &buffer.columns[0];

        let page = encode_page(col, descriptor, 0, col.count(), PageVersion::V1, Compression::Uncompressed).unwrap();
        let decoded = decode_page(&page.header, &page.buffer, descriptor, Compression::Uncompressed).unwrap();
        assert_eq!(decoded.values, col.values);
    }
}
