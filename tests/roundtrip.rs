//! End-to-end coverage through the public write/read surface.

use dremel_parquet::schema::node::group;
use dremel_parquet::schema::{Compression, FieldDef, PhysicalType, Schema};
use dremel_parquet::shred::{shred_record, WriteBuffer};
use dremel_parquet::value::Value;
use dremel_parquet::writer::{FileWriter, WriteOptions};
use dremel_parquet::FileReader;
use std::io::Cursor;

/// The nested `Document { links { Backward*, Forward* }, name* { language* { code, country? }, url? } }`
/// shape from the Dremel paper's own worked example.
fn dremel_schema() -> Schema {
    Schema::new(vec![
        ("docid", FieldDef::required_leaf(PhysicalType::Int64)),
        (
            "links",
            group(vec![
                ("backward", FieldDef::required_leaf(PhysicalType::Int64).repeated()),
                ("forward", FieldDef::required_leaf(PhysicalType::Int64).repeated()),
            ])
            .optional(),
        ),
        (
            "name",
            group(vec![
                (
                    "language",
                    group(vec![
                        ("code", FieldDef::required_leaf(PhysicalType::ByteArray)),
                        ("country", FieldDef::required_leaf(PhysicalType::ByteArray).optional()),
                    ])
                    .repeated(),
                ),
                ("url", FieldDef::required_leaf(PhysicalType::ByteArray).optional()),
            ])
            .repeated(),
        ),
    ])
    .unwrap()
}

fn write_file(schema: &Schema, records: &[Value], options: WriteOptions) -> Vec<u8> {
    let mut buffer = WriteBuffer::new(schema);
    for record in records {
        shred_record(schema, record, &mut buffer).unwrap();
    }
    let mut writer = FileWriter::new(Cursor::new(Vec::new()), schema.clone(), options, Some("test".into()));
    writer.start().unwrap();
    writer.write_row_group(&buffer).unwrap();
    let (_size, cursor) = writer.end(None).unwrap();
    cursor.into_inner()
}

// S1: the Dremel paper's own worked example round-trips through a real file.
#[test]
fn s1_dremel_paper_example_round_trips_through_a_file() {
    let schema = dremel_schema();

    let r1 = Value::group([
        ("docid", Value::Int64(10)),
        (
            "links",
            Value::group([("forward", Value::List(vec![Value::Int64(20), Value::Int64(40), Value::Int64(60)]))]),
        ),
        (
            "name",
            Value::List(vec![
                Value::group([
                    (
                        "language",
                        Value::List(vec![
                            Value::group([("code", Value::utf8("en-us")), ("country", Value::utf8("us"))]),
                            Value::group([("code", Value::utf8("en"))]),
                        ]),
                    ),
                    ("url", Value::utf8("http://A")),
                ]),
                Value::group([("url", Value::utf8("http://B"))]),
                Value::group([("language", Value::List(vec![Value::group([("code", Value::utf8("en-gb")), ("country", Value::utf8("gb"))])]))]),
            ]),
        ),
    ]);

    let r2 = Value::group([
        ("docid", Value::Int64(20)),
        (
            "links",
            Value::group([
                ("backward", Value::List(vec![Value::Int64(10), Value::Int64(30)])),
                ("forward", Value::List(vec![Value::Int64(80)])),
            ]),
        ),
    ]);

    let bytes = write_file(&schema, &[r1.clone(), r2.clone()], WriteOptions::default());
    let mut reader = FileReader::new(Cursor::new(bytes)).unwrap();
    let records = reader.read_all().unwrap();

    assert_eq!(records.len(), 2);
    let doc1 = records[0].as_group().unwrap();
    let name = doc1.get("name").unwrap().as_list().unwrap();
    let lang0 = name[0].as_group().unwrap().get("language").unwrap().as_list().unwrap();
    assert_eq!(
        lang0[0].as_group().unwrap().get("country").unwrap().as_utf8(),
        Some("us")
    );
    assert_eq!(lang0[1].as_group().unwrap().get("country"), Some(&Value::Null));

    let doc2 = records[1].as_group().unwrap();
    let links2 = doc2.get("links").unwrap().as_group().unwrap();
    assert_eq!(
        links2.get("backward").unwrap().as_list().unwrap(),
        &[Value::Int64(10), Value::Int64(30)]
    );
    assert_eq!(doc1.get("links").unwrap().as_group().unwrap().get("backward"), Some(&Value::Null));
}

// S2: an absent optional nested group and an absent repeated field both
// canonicalize to an explicit Value::Null on read, even though the
// shredder accepted a bare omitted key as input.
#[test]
fn s2_absent_optional_nested_group_canonicalizes_to_null() {
    let schema = dremel_schema();
    let sparse = Value::group([("docid", Value::Int64(1))]);

    let bytes = write_file(&schema, &[sparse], WriteOptions::default());
    let mut reader = FileReader::new(Cursor::new(bytes)).unwrap();
    let records = reader.read_all().unwrap();

    let doc = records[0].as_group().unwrap();
    assert_eq!(doc.get("links"), Some(&Value::Null));
    assert_eq!(doc.get("name"), Some(&Value::Null));
}

// S4: the page codec round-trips through a real file for every
// version/compression combination the crate supports.
#[test]
fn s4_page_codec_round_trips_across_versions_and_compressors() {
    let schema = Schema::new(vec![
        ("id", FieldDef::required_leaf(PhysicalType::Int32)),
        ("tag", FieldDef::required_leaf(PhysicalType::ByteArray).optional()),
    ])
    .unwrap();
    let records: Vec<Value> = (0..50)
        .map(|i| {
            let tag = if i % 4 == 0 { Value::Null } else { Value::utf8(format!("tag-{i}")) };
            Value::group([("id", Value::Int32(i)), ("tag", tag)])
        })
        .collect();

    let mut compressors = vec![Compression::Uncompressed];
    #[cfg(feature = "snappy")]
    compressors.push(Compression::Snappy);
    #[cfg(feature = "gzip")]
    compressors.push(Compression::Gzip);
    #[cfg(feature = "lz4")]
    compressors.push(Compression::Lz4);
    #[cfg(feature = "brotli")]
    compressors.push(Compression::Brotli);

    for compression in compressors {
        for use_v2_pages in [false, true] {
            let options = WriteOptions {
                use_v2_pages,
                compression,
                ..WriteOptions::default()
            };
            let bytes = write_file(&schema, &records, options);
            let mut reader = FileReader::new(Cursor::new(bytes)).unwrap();
            let out = reader.read_all().unwrap();
            assert_eq!(out.len(), records.len(), "compression={compression:?} v2={use_v2_pages}");
            assert_eq!(
                out[0].as_group().unwrap().get("tag"),
                Some(&Value::Null),
                "compression={compression:?} v2={use_v2_pages}"
            );
            assert_eq!(
                out[1].as_group().unwrap().get("tag"),
                Some(&Value::utf8("tag-1")),
                "compression={compression:?} v2={use_v2_pages}"
            );
            assert_eq!(
                out[2].as_group().unwrap().get("id"),
                Some(&Value::Int32(2)),
                "compression={compression:?} v2={use_v2_pages}"
            );
        }
    }
}

// S5: min/max/null_count/distinct_count survive a write-then-read
// round trip through the thrift-encoded footer, not just in-memory.
#[test]
fn s5_statistics_survive_the_footer_round_trip() {
    let schema = Schema::new(vec![("value", FieldDef::required_leaf(PhysicalType::Int64).optional())]).unwrap();
    let records = vec![
        Value::group([("value", Value::Int64(5))]),
        Value::group([("value", Value::Null)]),
        Value::group([("value", Value::Int64(-3))]),
        Value::group([("value", Value::Int64(5))]),
    ];

    let bytes = write_file(&schema, &records, WriteOptions::default());
    let mut reader = FileReader::new(Cursor::new(bytes)).unwrap();
    let stats = reader.metadata().row_groups[0].column(0).statistics().unwrap();

    assert_eq!(stats.null_count, 1);
    assert_eq!(stats.distinct_count, 2);
    assert_eq!(stats.min, Some(Value::Int64(-3)));
    assert_eq!(stats.max, Some(Value::Int64(5)));
}

// S6: corrupt input is rejected rather than silently misread.
mod s6_corrupt_input {
    use super::*;
    use dremel_parquet::error::Error;
    use dremel_parquet::page::{decode_page, encode_page, PageVersion};
    use dremel_parquet::shred::shred_record;

    fn single_column_schema() -> Schema {
        Schema::new(vec![("id", FieldDef::required_leaf(PhysicalType::Int32))]).unwrap()
    }

    #[test]
    fn a_level_stream_envelope_length_exceeding_the_page_body_is_rejected() {
        let schema = Schema::new(vec![("tag", FieldDef::required_leaf(PhysicalType::ByteArray).optional())]).unwrap();
        let mut buffer = WriteBuffer::new(&schema);
        shred_record(&schema, &Value::group([("tag", Value::utf8("x"))]), &mut buffer).unwrap();

        let descriptor = schema.leaf(0);
        let page = encode_page(&buffer.columns[0], descriptor, 0, 1, PageVersion::V1, Compression::Uncompressed).unwrap();

        // Corrupt the definition-level envelope's 4-byte length prefix to
        // claim far more bytes than the page body actually holds.
        let mut corrupted = page.buffer.clone();
        corrupted[0..4].copy_from_slice(&u32::MAX.to_le_bytes());

        let err = decode_page(&page.header, &corrupted, descriptor, Compression::Uncompressed).unwrap_err();
        assert!(matches!(err, Error::CorruptStream(_)));
    }

    #[test]
    fn a_page_header_declaring_an_unsupported_encoding_is_rejected() {
        let schema = single_column_schema();
        let mut buffer = WriteBuffer::new(&schema);
        shred_record(&schema, &Value::group([("id", Value::Int32(1))]), &mut buffer).unwrap();

        let descriptor = schema.leaf(0);
        let mut page = encode_page(&buffer.columns[0], descriptor, 0, 1, PageVersion::V1, Compression::Uncompressed).unwrap();
        page.header.data_page_header.as_mut().unwrap().encoding = parquet_format_safe::Encoding::DELTA_BINARY_PACKED;

        let err = decode_page(&page.header, &page.buffer, descriptor, Compression::Uncompressed).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }
}
