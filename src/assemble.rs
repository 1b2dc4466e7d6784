//! The Dremel assembler: spec.md §4.3. Reconstructs records from the
//! `(value?, dLevel, rLevel)` streams [`crate::shred`] produced, and
//! also exposes a single-column projection for callers that only need
//! one leaf's values.
//!
//! Like the shredder, there is no direct `parquet2` analogue (it never
//! assembles records, only Arrow arrays), so this is grounded on the
//! same Dremel paper record-assembly procedure spec.md §4.3 restates,
//! read in reverse against [`crate::shred::shred_node`]: presence and
//! repetition of every non-leaf node are always decided by its
//! leftmost leaf, because the shredder always visits a subtree's
//! leaves in the same fixed order and stamps an absent subtree's
//! placeholders with one identical `(d, r)` pair.

use crate::error::{corrupt_err, schema_err, Result};
use crate::schema::node::ColumnDescriptor;
use crate::schema::{Repetition, Schema, SchemaNode};
use crate::shred::ColumnBuffer;
use crate::value::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct Token {
    d: i16,
    r: i16,
    value: Option<Value>,
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn has_more(&self) -> bool {
        self.pos < self.tokens.len()
    }

    fn next(&mut self) -> &Token {
        let t = &self.tokens[self.pos];
        self.pos += 1;
        t
    }
}

fn build_tokens(column: &ColumnBuffer, d_level_max: i16) -> Vec<Token> {
    let mut values = column.values.iter();
    column
        .d_levels
        .iter()
        .zip(&column.r_levels)
        .map(|(&d, &r)| {
            let value = if d == d_level_max {
                Some(values.next().expect("value count matches d==dLevelMax count").clone())
            } else {
                None
            };
            Token { d, r, value }
        })
        .collect()
}

/// Splits a column's flat token stream into per-row index ranges: a
/// new row starts at every `rLevel == 0` after the first token.
fn split_rows(tokens: &[Token]) -> Vec<(usize, usize)> {
    let mut starts = vec![0];
    for (i, t) in tokens.iter().enumerate().skip(1) {
        if t.r == 0 {
            starts.push(i);
        }
    }
    let mut bounds = Vec::with_capacity(starts.len());
    for w in 0..starts.len() {
        let end = starts.get(w + 1).copied().unwrap_or(tokens.len());
        bounds.push((starts[w], end));
    }
    bounds
}

/// Reconstructs every record in `buffer` against `schema`, per
/// spec.md §4.3.
pub fn materialize_records(schema: &Schema, buffer: &crate::shred::WriteBuffer) -> Result<Vec<Value>> {
    let num_rows = buffer.num_rows;
    let mut per_column_tokens = Vec::with_capacity(schema.num_columns());
    let mut per_column_bounds = Vec::with_capacity(schema.num_columns());
    for (column, descriptor) in buffer.columns.iter().zip(schema.leaves()) {
        let tokens = build_tokens(column, descriptor.d_level_max);
        let bounds = split_rows(&tokens);
        if bounds.len() != num_rows {
            return Err(corrupt_err!(
                "column {:?} has {} rows, expected {}",
                descriptor.path,
                bounds.len(),
                num_rows
            ));
        }
        per_column_tokens.push(tokens);
        per_column_bounds.push(bounds);
    }

    let mut out = Vec::with_capacity(num_rows);
    for row in 0..num_rows {
        let mut cursors: Vec<Cursor> = per_column_tokens
            .iter()
            .zip(&per_column_bounds)
            .map(|(tokens, bounds)| {
                let (s, e) = bounds[row];
                Cursor {
                    tokens: &tokens[s..e],
                    pos: 0,
                }
            })
            .collect();

        let mut leaf_idx = 0usize;
        let mut fields = BTreeMap::new();
        for node in schema.root_fields() {
            fields.insert(node.name().to_owned(), assemble_field(schema, node, &mut leaf_idx, &mut cursors));
        }
        out.push(Value::Group(fields));
    }
    Ok(out)
}

/// Consumes exactly the tokens belonging to one occurrence of `node`
/// (one call per appearance of this field in its enclosing scope) and
/// returns its value. For a `Repeated` node this already collects the
/// whole list; callers never loop over `assemble_field` themselves.
fn assemble_field(schema: &Schema, node: &SchemaNode, leaf_idx: &mut usize, cursors: &mut [Cursor]) -> Value {
    match node {
        SchemaNode::Leaf { repetition, .. } => {
            let idx = *leaf_idx;
            *leaf_idx += 1;
            let descriptor = schema.leaf(idx);
            match repetition {
                Repetition::Repeated => {
                    let first = cursors[idx].next().clone();
                    match first.value {
                        None => Value::Null,
                        Some(v) => {
                            let mut elements = vec![v];
                            while cursors[idx].has_more() && cursors[idx].peek().r == descriptor.r_level_max {
                                let t = cursors[idx].next();
                                elements.push(t.value.clone().expect("repeated element token always carries a value"));
                            }
                            Value::List(elements)
                        }
                    }
                }
                Repetition::Optional | Repetition::Required => {
                    cursors[idx].next().value.clone().unwrap_or(Value::Null)
                }
            }
        }
        SchemaNode::Group {
            repetition,
            children,
            d_level_max,
            r_level_max,
            ..
        } => {
            let start_idx = *leaf_idx;
            match repetition {
                Repetition::Required => {
                    let mut fields = BTreeMap::new();
                    for child in children {
                        fields.insert(child.name().to_owned(), assemble_field(schema, child, leaf_idx, cursors));
                    }
                    Value::Group(fields)
                }
                Repetition::Optional => {
                    if cursors[start_idx].peek().d < *d_level_max {
                        skip_absent(children, leaf_idx, cursors);
                        Value::Null
                    } else {
                        let mut fields = BTreeMap::new();
                        for child in children {
                            fields.insert(child.name().to_owned(), assemble_field(schema, child, leaf_idx, cursors));
                        }
                        Value::Group(fields)
                    }
                }
                Repetition::Repeated => {
                    if cursors[start_idx].peek().d < *d_level_max {
                        skip_absent(children, leaf_idx, cursors);
                        Value::Null
                    } else {
                        let mut elements = Vec::new();
                        loop {
                            *leaf_idx = start_idx;
                            let mut fields = BTreeMap::new();
                            for child in children {
                                fields.insert(child.name().to_owned(), assemble_field(schema, child, leaf_idx, cursors));
                            }
                            elements.push(Value::Group(fields));
                            if cursors[start_idx].has_more() && cursors[start_idx].peek().r == *r_level_max {
                                continue;
                            }
                            break;
                        }
                        Value::List(elements)
                    }
                }
            }
        }
    }
}

/// Consumes the one placeholder token per leaf an absent optional or
/// repeated ancestor leaves behind, without producing a value.
fn skip_absent(nodes: &[SchemaNode], leaf_idx: &mut usize, cursors: &mut [Cursor]) {
    for node in nodes {
        match node {
            SchemaNode::Leaf { .. } => {
                cursors[*leaf_idx].next();
                *leaf_idx += 1;
            }
            SchemaNode::Group { children, .. } => skip_absent(children, leaf_idx, cursors),
        }
    }
}

/// Builds the single-ancestor-chain schema a lone column needs to
/// reconstruct its own nesting in isolation, from the cumulative level
/// information [`ColumnDescriptor::level_at`] already carries.
fn path_schema_node(descriptor: &ColumnDescriptor) -> SchemaNode {
    let n = descriptor.path.len();
    let mut node = SchemaNode::Leaf {
        name: descriptor.path[n - 1].clone(),
        repetition: descriptor.repetitions[n - 1],
        physical_type: descriptor.physical_type,
        logical_type: descriptor.logical_type,
        type_length: descriptor.type_length,
        compression: descriptor.compression,
        encoding: descriptor.encoding,
    };
    for i in (0..n - 1).rev() {
        let (d_level_max, r_level_max) = descriptor.level_at[i];
        node = SchemaNode::Group {
            name: descriptor.path[i].clone(),
            repetition: descriptor.repetitions[i],
            children: vec![node],
            d_level_max,
            r_level_max,
        };
    }
    node
}

/// A lazily-evaluated projection of one column's values, one entry per
/// row, nested only as far as that column's own repeated ancestors go
/// — spec.md §4.3's "read a single column back out without
/// materializing the whole record".
pub struct ColumnValues<'a> {
    descriptor: &'a ColumnDescriptor,
    synthetic_root: SchemaNode,
    tokens: Vec<Token>,
    bounds: std::vec::IntoIter<(usize, usize)>,
}

impl<'a> Iterator for ColumnValues<'a> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let (s, e) = self.bounds.next()?;
        let mut cursors = [Cursor {
            tokens: &self.tokens[s..e],
            pos: 0,
        }];
        let mut leaf_idx = 0usize;
        Some(assemble_field_standalone(&self.synthetic_root, &mut leaf_idx, &mut cursors, self.descriptor))
    }
}

/// Like [`assemble_field`] but for the single-column synthetic chain,
/// where there is no [`Schema`] to look descriptors up in.
fn assemble_field_standalone(
    node: &SchemaNode,
    leaf_idx: &mut usize,
    cursors: &mut [Cursor],
    descriptor: &ColumnDescriptor,
) -> Value {
    match node {
        SchemaNode::Leaf { repetition, .. } => {
            let idx = *leaf_idx;
            *leaf_idx += 1;
            match repetition {
                Repetition::Repeated => {
                    let first = cursors[idx].next().clone();
                    match first.value {
                        None => Value::Null,
                        Some(v) => {
                            let mut elements = vec![v];
                            while cursors[idx].has_more() && cursors[idx].peek().r == descriptor.r_level_max {
                                let t = cursors[idx].next();
                                elements.push(t.value.clone().expect("repeated element token always carries a value"));
                            }
                            Value::List(elements)
                        }
                    }
                }
                Repetition::Optional | Repetition::Required => {
                    cursors[idx].next().value.clone().unwrap_or(Value::Null)
                }
            }
        }
        SchemaNode::Group {
            repetition,
            children,
            d_level_max,
            r_level_max,
            ..
        } => {
            let start_idx = *leaf_idx;
            let child = &children[0];
            match repetition {
                Repetition::Required => assemble_field_standalone(child, leaf_idx, cursors, descriptor),
                Repetition::Optional => {
                    if cursors[start_idx].peek().d < *d_level_max {
                        skip_absent(children, leaf_idx, cursors);
                        Value::Null
                    } else {
                        Value::Group(BTreeMap::from([(
                            child.name().to_owned(),
                            assemble_field_standalone(child, leaf_idx, cursors, descriptor),
                        )]))
                    }
                }
                Repetition::Repeated => {
                    if cursors[start_idx].peek().d < *d_level_max {
                        skip_absent(children, leaf_idx, cursors);
                        Value::Null
                    } else {
                        let mut elements = Vec::new();
                        loop {
                            *leaf_idx = start_idx;
                            let v = assemble_field_standalone(child, leaf_idx, cursors, descriptor);
                            elements.push(Value::Group(BTreeMap::from([(child.name().to_owned(), v)])));
                            if cursors[start_idx].has_more() && cursors[start_idx].peek().r == *r_level_max {
                                continue;
                            }
                            break;
                        }
                        Value::List(elements)
                    }
                }
            }
        }
    }
}

/// Projects one column's values out of `column`, per spec.md §4.3.
pub fn materialize_column<'a>(
    schema: &'a Schema,
    column: &ColumnBuffer,
    path: &[String],
    num_rows: usize,
) -> Result<ColumnValues<'a>> {
    let descriptor = schema
        .leaf_by_path(path)
        .ok_or_else(|| schema_err!("no such column {:?}", path))?;
    let tokens = build_tokens(column, descriptor.d_level_max);
    let bounds = split_rows(&tokens);
    if bounds.len() != num_rows {
        return Err(corrupt_err!(
            "column {:?} has {} rows, expected {}",
            path,
            bounds.len(),
            num_rows
        ));
    }
    Ok(ColumnValues {
        descriptor,
        synthetic_root: path_schema_node(descriptor),
        tokens,
        bounds: bounds.into_iter(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{group, FieldDef, LogicalType, PhysicalType};
    use crate::shred::{shred_record, WriteBuffer};

    fn dremel_schema() -> Schema {
        Schema::new(vec![
            ("DocId", FieldDef::required_leaf(PhysicalType::Int64)),
            (
                "Links",
                group(vec![
                    ("Backward", FieldDef::required_leaf(PhysicalType::Int64).repeated()),
                    ("Forward", FieldDef::required_leaf(PhysicalType::Int64).repeated()),
                ])
                .optional(),
            ),
            (
                "Name",
                group(vec![
                    (
                        "Language",
                        group(vec![
                            ("Code", FieldDef::required_leaf(PhysicalType::ByteArray).with_logical_type(LogicalType::Utf8)),
                            ("Country", FieldDef::required_leaf(PhysicalType::ByteArray).with_logical_type(LogicalType::Utf8).optional()),
                        ])
                        .repeated(),
                    ),
                    ("Url", FieldDef::required_leaf(PhysicalType::ByteArray).with_logical_type(LogicalType::Utf8).optional()),
                ])
                .repeated(),
            ),
        ])
        .unwrap()
    }

    fn record_a() -> Value {
        Value::group([
            ("DocId", Value::Int64(10)),
            ("Links", Value::group([("Forward", Value::List(vec![Value::Int64(20), Value::Int64(40), Value::Int64(60)]))])),
            (
                "Name",
                Value::List(vec![
                    Value::group([
                        ("Language", Value::List(vec![
                            Value::group([("Code", Value::utf8("en-us")), ("Country", Value::utf8("us"))]),
                            Value::group([("Code", Value::utf8("en"))]),
                        ])),
                        ("Url", Value::utf8("http://A")),
                    ]),
                    Value::group([("Url", Value::utf8("http://B"))]),
                    Value::group([("Language", Value::List(vec![
                        Value::group([("Code", Value::utf8("en-gb")), ("Country", Value::utf8("gb"))]),
                    ]))]),
                ]),
            ),
        ])
    }

    fn record_b() -> Value {
        Value::group([
            ("DocId", Value::Int64(20)),
            ("Links", Value::group([
                ("Backward", Value::List(vec![Value::Int64(10), Value::Int64(30)])),
                ("Forward", Value::List(vec![Value::Int64(80)])),
            ])),
            ("Name", Value::List(vec![Value::group([("Url", Value::utf8("http://C"))])])),
        ])
    }

    // Reconstruction always makes an absent optional/repeated field an
    // explicit `Value::Null` entry (spec.md §9's canonicalization rule),
    // while the shred-side fixtures above legitimately omit the key
    // instead — both are accepted on the way in, but only the explicit
    // form comes back out, so the expected shape below fills every
    // field `record_a`/`record_b` leave out.
    fn expected_a() -> Value {
        Value::group([
            ("DocId", Value::Int64(10)),
            ("Links", Value::group([
                ("Backward", Value::Null),
                ("Forward", Value::List(vec![Value::Int64(20), Value::Int64(40), Value::Int64(60)])),
            ])),
            (
                "Name",
                Value::List(vec![
                    Value::group([
                        ("Language", Value::List(vec![
                            Value::group([("Code", Value::utf8("en-us")), ("Country", Value::utf8("us"))]),
                            Value::group([("Code", Value::utf8("en")), ("Country", Value::Null)]),
                        ])),
                        ("Url", Value::utf8("http://A")),
                    ]),
                    Value::group([("Language", Value::Null), ("Url", Value::utf8("http://B"))]),
                    Value::group([
                        ("Language", Value::List(vec![
                            Value::group([("Code", Value::utf8("en-gb")), ("Country", Value::utf8("gb"))]),
                        ])),
                        ("Url", Value::Null),
                    ]),
                ]),
            ),
        ])
    }

    fn expected_b() -> Value {
        Value::group([
            ("DocId", Value::Int64(20)),
            ("Links", Value::group([
                ("Backward", Value::List(vec![Value::Int64(10), Value::Int64(30)])),
                ("Forward", Value::List(vec![Value::Int64(80)])),
            ])),
            ("Name", Value::List(vec![
                Value::group([("Language", Value::Null), ("Url", Value::utf8("http://C"))]),
            ])),
        ])
    }

    #[test]
    fn round_trips_the_dremel_paper_example() {
        let schema = dremel_schema();
        let mut buffer = WriteBuffer::new(&schema);
        shred_record(&schema, &record_a(), &mut buffer).unwrap();
        shred_record(&schema, &record_b(), &mut buffer).unwrap();

        let records = materialize_records(&schema, &buffer).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], expected_a());
        assert_eq!(records[1], expected_b());
    }

    #[test]
    fn absent_optional_group_round_trips_as_null() {
        let schema = dremel_schema();
        let mut buffer = WriteBuffer::new(&schema);
        let record = Value::group([("DocId", Value::Int64(1))]);
        shred_record(&schema, &record, &mut buffer).unwrap();

        let records = materialize_records(&schema, &buffer).unwrap();
        assert_eq!(
            records[0],
            Value::group([("DocId", Value::Int64(1)), ("Links", Value::Null), ("Name", Value::Null)])
        );
    }

    #[test]
    fn materialize_single_column_matches_full_record() {
        let schema = dremel_schema();
        let mut buffer = WriteBuffer::new(&schema);
        shred_record(&schema, &record_a(), &mut buffer).unwrap();
        shred_record(&schema, &record_b(), &mut buffer).unwrap();

        let idx = schema.leaves().iter().position(|l| l.path == ["Links".to_string(), "Forward".to_string()]).unwrap();
        let path = vec!["Links".to_string(), "Forward".to_string()];
        let values: Vec<Value> = materialize_column(&schema, &buffer.columns[idx], &path, 2).unwrap().collect();

        assert_eq!(
            values,
            vec![
                Value::group([("Forward", Value::List(vec![Value::Int64(20), Value::Int64(40), Value::Int64(60)]))]),
                Value::group([("Forward", Value::List(vec![Value::Int64(80)]))]),
            ]
        );
    }
}
