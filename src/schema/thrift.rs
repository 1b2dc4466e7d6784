//! Schema <-> on-disk `SchemaElement` sequence, per spec.md §4.1 and
//! §4.8 ("schema serialization into the on-disk schema-element
//! sequence"). Grounded on `parquet2::schema::io_thrift::{to_thrift,
//! from_thrift}`.

use super::node::{ColumnDescriptor, FieldDef, Schema, SchemaNode};
use super::types::{Compression, Encoding, LogicalType, PhysicalType, Repetition};
use crate::error::{corrupt_err, Result};
use parquet_format_safe::{ConvertedType, SchemaElement, Type as TType};

const ROOT_NAME: &str = "schema";

fn converted_type_of(lt: LogicalType) -> ConvertedType {
    match lt {
        LogicalType::Utf8 => ConvertedType::UTF8,
        LogicalType::Date => ConvertedType::DATE,
        LogicalType::TimestampMillis => ConvertedType::TIMESTAMP_MILLIS,
        LogicalType::TimestampMicros => ConvertedType::TIMESTAMP_MICROS,
        LogicalType::Interval => ConvertedType::INTERVAL,
        LogicalType::Bson => ConvertedType::BSON,
    }
}

fn logical_type_of(ct: ConvertedType) -> Result<LogicalType> {
    Ok(match ct {
        ConvertedType::UTF8 => LogicalType::Utf8,
        ConvertedType::DATE => LogicalType::Date,
        ConvertedType::TIMESTAMP_MILLIS => LogicalType::TimestampMillis,
        ConvertedType::TIMESTAMP_MICROS => LogicalType::TimestampMicros,
        ConvertedType::INTERVAL => LogicalType::Interval,
        ConvertedType::BSON => LogicalType::Bson,
        other => return Err(corrupt_err!("unrecognized converted_type {:?}", other)),
    })
}

/// Serializes a schema into the pre-order `SchemaElement` sequence
/// spec.md §4.1 describes: the root carries the total number of
/// top-level fields, and every group element carries its own child
/// count.
pub fn to_thrift(schema: &Schema) -> Vec<SchemaElement> {
    let mut out = vec![SchemaElement {
        type_: None,
        type_length: None,
        repetition_type: None,
        name: ROOT_NAME.to_string(),
        num_children: Some(schema.root_fields().len() as i32),
        converted_type: None,
        scale: None,
        precision: None,
        field_id: None,
        logical_type: None,
    }];
    for node in schema.root_fields() {
        push_node(node, &mut out);
    }
    out
}

fn push_node(node: &SchemaNode, out: &mut Vec<SchemaElement>) {
    match node {
        SchemaNode::Group {
            name,
            repetition,
            children,
            ..
        } => {
            out.push(SchemaElement {
                type_: None,
                type_length: None,
                repetition_type: Some((*repetition).into()),
                name: name.clone(),
                num_children: Some(children.len() as i32),
                converted_type: None,
                scale: None,
                precision: None,
                field_id: None,
                logical_type: None,
            });
            for child in children {
                push_node(child, out);
            }
        }
        SchemaNode::Leaf {
            name,
            repetition,
            physical_type,
            logical_type,
            type_length,
            ..
        } => {
            out.push(SchemaElement {
                type_: Some((*physical_type).into()),
                type_length: *type_length,
                repetition_type: Some((*repetition).into()),
                name: name.clone(),
                num_children: None,
                converted_type: logical_type.map(converted_type_of),
                scale: None,
                precision: None,
                field_id: None,
                logical_type: None,
            });
        }
    }
}

/// Reconstructs a [`Schema`] from the flat `SchemaElement` sequence
/// read off disk. The inverse of [`to_thrift`].
pub fn from_thrift(elements: &[SchemaElement]) -> Result<Schema> {
    if elements.is_empty() {
        return Err(corrupt_err!("schema has no elements"));
    }
    let root_children = elements[0]
        .num_children
        .ok_or_else(|| corrupt_err!("root schema element has no num_children"))?
        as usize;

    let mut cursor = 1usize;
    let mut fields = Vec::with_capacity(root_children);
    for _ in 0..root_children {
        let (name, def, consumed) = parse_node(&elements[cursor..])?;
        fields.push((name, def));
        cursor += consumed;
    }
    if cursor != elements.len() {
        return Err(corrupt_err!(
            "schema element sequence has {} trailing elements",
            elements.len() - cursor
        ));
    }
    let borrowed: Vec<(&str, FieldDef)> = fields.iter().map(|(n, d)| (n.as_str(), d.clone())).collect();
    Schema::new(borrowed).map_err(|e| corrupt_err!("schema reconstructed from file is invalid: {}", e))
}

fn parse_node(elements: &[SchemaElement]) -> Result<(String, FieldDef, usize)> {
    let e = elements
        .first()
        .ok_or_else(|| corrupt_err!("schema element sequence ended early"))?;
    let repetition: Repetition = e
        .repetition_type
        .ok_or_else(|| corrupt_err!("schema element {:?} has no repetition_type", e.name))?
        .try_into()?;
    let (optional, repeated) = match repetition {
        Repetition::Required => (false, false),
        Repetition::Optional => (true, false),
        Repetition::Repeated => (false, true),
    };

    if let Some(n) = e.num_children {
        // group
        let n = n as usize;
        let mut cursor = 1usize;
        let mut fields = Vec::with_capacity(n);
        for _ in 0..n {
            let (name, def, consumed) = parse_node(&elements[cursor..])?;
            fields.push((name, def));
            cursor += consumed;
        }
        Ok((
            e.name.clone(),
            FieldDef::Group {
                optional,
                repeated,
                fields,
            },
            cursor,
        ))
    } else {
        let physical_type: PhysicalType = e
            .type_
            .ok_or_else(|| corrupt_err!("leaf schema element {:?} has no type", e.name))?
            .try_into()?;
        let logical_type = e.converted_type.map(logical_type_of).transpose()?;
        Ok((
            e.name.clone(),
            FieldDef::Leaf {
                physical_type,
                optional,
                repeated,
                type_length: e.type_length,
                logical_type,
                compression: Compression::Uncompressed,
            },
            1,
        ))
    }
}

#[allow(dead_code)]
fn encoding_of(_: &ColumnDescriptor) -> Encoding {
    Encoding::Plain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::node::group;

    #[test]
    fn round_trips_through_thrift() {
        let schema = Schema::new(vec![
            ("id", FieldDef::required_leaf(PhysicalType::Int64)),
            (
                "tags",
                FieldDef::required_leaf(PhysicalType::ByteArray)
                    .with_logical_type(LogicalType::Utf8)
                    .repeated(),
            ),
            (
                "meta",
                group(vec![(
                    "label",
                    FieldDef::required_leaf(PhysicalType::ByteArray)
                        .with_logical_type(LogicalType::Utf8)
                        .optional(),
                )])
                .optional(),
            ),
        ])
        .unwrap();

        let elements = to_thrift(&schema);
        let restored = from_thrift(&elements).unwrap();

        assert_eq!(schema.num_columns(), restored.num_columns());
        for (a, b) in schema.leaves().iter().zip(restored.leaves().iter()) {
            assert_eq!(a.path, b.path);
            assert_eq!(a.physical_type, b.physical_type);
            assert_eq!(a.d_level_max, b.d_level_max);
            assert_eq!(a.r_level_max, b.r_level_max);
        }
    }
}
