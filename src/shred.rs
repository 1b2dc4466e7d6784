//! The Dremel shredder: spec.md §4.2. Walks a record against the
//! schema tree in schema (declaration) order and appends one
//! `(value?, dLevel, rLevel)` triple per leaf per emission to that
//! leaf's column buffer.
//!
//! There is no prior art for this in `parquet2` — it operates on
//! pre-shredded Arrow arrays, never on a generic nested record — so
//! this module is grounded instead on the Dremel paper's own
//! recursive-shred formulation (the one spec.md §4.2 restates as
//! emission rules 1-5) and on `parquet2::metadata::ColumnDescriptor`
//! for the per-leaf `(dLevelMax, rLevelMax, path)` triple it walks
//! against.

use crate::schema::{Schema, SchemaNode};
use crate::statistics::StatisticsBuilder;
use crate::value::Value;
use crate::error::{schema_err, Result};

/// The per-leaf, per-row-group accumulation buffer spec.md §3 calls a
/// "column stream" while it's still being written.
#[derive(Debug, Clone, Default)]
pub struct ColumnBuffer {
    pub values: Vec<Value>,
    pub d_levels: Vec<i16>,
    pub r_levels: Vec<i16>,
    pub stats: StatisticsBuilder,
}

impl ColumnBuffer {
    pub fn count(&self) -> usize {
        self.d_levels.len()
    }
}

/// Accumulates shredded columns across `shred_record` calls until a
/// row group is closed, per spec.md §3's write-buffer lifecycle.
#[derive(Debug, Clone)]
pub struct WriteBuffer {
    pub columns: Vec<ColumnBuffer>,
    pub num_rows: usize,
}

impl WriteBuffer {
    pub fn new(schema: &Schema) -> Self {
        Self {
            columns: vec![ColumnBuffer::default(); schema.num_columns()],
            num_rows: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }
}

/// Appends `record`'s contribution to every leaf column and increments
/// the row count by one. `record` is the value bound to each top-level
/// field name; schema-level groups wrap it the same way any nested
/// group does.
pub fn shred_record(schema: &Schema, record: &Value, buffer: &mut WriteBuffer) -> Result<()> {
    let fields = record
        .as_group()
        .ok_or_else(|| schema_err!("top-level record must be a group of named fields"))?;

    let mut leaf_idx = 0usize;
    for node in schema.root_fields() {
        let value = fields.get(node.name());
        shred_node(schema, node, value, 0, 0, &mut leaf_idx, buffer)?;
    }
    buffer.num_rows += 1;
    Ok(())
}

fn shred_node(
    schema: &Schema,
    node: &SchemaNode,
    value: Option<&Value>,
    d: i16,
    r: i16,
    leaf_idx: &mut usize,
    buffer: &mut WriteBuffer,
) -> Result<()> {
    match node {
        SchemaNode::Leaf { repetition, .. } => {
            use crate::schema::Repetition::*;
            match (*repetition, value) {
                (Repeated, None) => {
                    emit_leaf(schema, *leaf_idx, None, d, r, buffer);
                    *leaf_idx += 1;
                }
                (Repeated, Some(v)) => {
                    let elements = coerce_to_list(v, node.name())?;
                    if elements.is_empty() {
                        emit_leaf(schema, *leaf_idx, None, d, r, buffer);
                    } else {
                        let r_max = schema.leaf(*leaf_idx).r_level_max;
                        for (i, elem) in elements.iter().enumerate() {
                            if elem.is_null() {
                                return Err(schema_err!(
                                    "repeated leaf {:?} has a null element",
                                    node.name()
                                ));
                            }
                            let this_r = if i == 0 { r } else { r_max };
                            emit_leaf(schema, *leaf_idx, Some(elem.clone()), d + 1, this_r, buffer);
                        }
                    }
                    *leaf_idx += 1;
                }
                (Optional, None) | (Optional, Some(Value::Null)) => {
                    emit_leaf(schema, *leaf_idx, None, d, r, buffer);
                    *leaf_idx += 1;
                }
                (Optional, Some(v)) => {
                    reject_array(v, node.name())?;
                    emit_leaf(schema, *leaf_idx, Some(v.clone()), d + 1, r, buffer);
                    *leaf_idx += 1;
                }
                (Required, None) | (Required, Some(Value::Null)) => {
                    return Err(schema_err!("required field {:?} is missing", node.name()));
                }
                (Required, Some(v)) => {
                    reject_array(v, node.name())?;
                    emit_leaf(schema, *leaf_idx, Some(v.clone()), d, r, buffer);
                    *leaf_idx += 1;
                }
            }
            Ok(())
        }
        SchemaNode::Group {
            repetition,
            children,
            name,
            ..
        } => {
            use crate::schema::Repetition::*;
            match (*repetition, value) {
                (Repeated, None) => shred_absent_subtree(schema, children, d, r, leaf_idx, buffer),
                (Repeated, Some(v)) => {
                    let elements = coerce_to_list(v, name)?;
                    if elements.is_empty() {
                        shred_absent_subtree(schema, children, d, r, leaf_idx, buffer)
                    } else {
                        let r_max = node.r_level_max();
                        for (i, elem) in elements.iter().enumerate() {
                            let this_r = if i == 0 { r } else { r_max };
                            let mut idx = *leaf_idx;
                            for child in children {
                                let child_value = elem.as_group().and_then(|g| g.get(child.name()));
                                shred_node(schema, child, child_value, d + 1, this_r, &mut idx, buffer)?;
                            }
                        }
                        // all branches advance leaf_idx by the same amount; reuse the last one
                        let mut idx = *leaf_idx;
                        for child in children {
                            skip_subtree(child, &mut idx);
                        }
                        *leaf_idx = idx;
                        Ok(())
                    }
                }
                (Optional, None) | (Optional, Some(Value::Null)) => {
                    shred_absent_subtree(schema, children, d, r, leaf_idx, buffer)
                }
                (Optional, Some(v)) => {
                    reject_array(v, name)?;
                    let fields = v
                        .as_group()
                        .ok_or_else(|| schema_err!("field {:?} must be a group", name))?;
                    for child in children {
                        let child_value = fields.get(child.name());
                        shred_node(schema, child, child_value, d + 1, r, leaf_idx, buffer)?;
                    }
                    Ok(())
                }
                (Required, None) | (Required, Some(Value::Null)) => {
                    Err(schema_err!("required group {:?} is missing", name))
                }
                (Required, Some(v)) => {
                    reject_array(v, name)?;
                    let fields = v
                        .as_group()
                        .ok_or_else(|| schema_err!("field {:?} must be a group", name))?;
                    for child in children {
                        let child_value = fields.get(child.name());
                        shred_node(schema, child, child_value, d, r, leaf_idx, buffer)?;
                    }
                    Ok(())
                }
            }
        }
    }
}

/// Propagates an absent optional/repeated ancestor down to every leaf
/// beneath it, emitting one placeholder each at the same `(d, r)` —
/// spec.md §4.2 rules 3 and 4.
fn shred_absent_subtree(
    schema: &Schema,
    nodes: &[SchemaNode],
    d: i16,
    r: i16,
    leaf_idx: &mut usize,
    buffer: &mut WriteBuffer,
) -> Result<()> {
    for node in nodes {
        match node {
            SchemaNode::Leaf { .. } => {
                emit_leaf(schema, *leaf_idx, None, d, r, buffer);
                *leaf_idx += 1;
            }
            SchemaNode::Group { children, .. } => {
                shred_absent_subtree(schema, children, d, r, leaf_idx, buffer)?;
            }
        }
    }
    Ok(())
}

fn skip_subtree(node: &SchemaNode, leaf_idx: &mut usize) {
    match node {
        SchemaNode::Leaf { .. } => *leaf_idx += 1,
        SchemaNode::Group { children, .. } => {
            for c in children {
                skip_subtree(c, leaf_idx);
            }
        }
    }
}

fn emit_leaf(
    schema: &Schema,
    idx: usize,
    value: Option<Value>,
    d: i16,
    r: i16,
    buffer: &mut WriteBuffer,
) {
    let descriptor = schema.leaf(idx);
    let col = &mut buffer.columns[idx];
    col.d_levels.push(d);
    col.r_levels.push(r);
    if d == descriptor.d_level_max {
        let v = value.expect("d == dLevelMax implies a value is present");
        col.stats.observe(&v, descriptor.physical_type);
        col.values.push(v);
    } else {
        col.stats.observe_null();
    }
}

fn coerce_to_list<'a>(v: &'a Value, field_name: &str) -> Result<std::borrow::Cow<'a, [Value]>> {
    // Open question in spec.md §9: a scalar bound to a repeated field is
    // coerced into a one-element array rather than rejected.
    match v {
        Value::List(elems) => Ok(std::borrow::Cow::Borrowed(elems)),
        Value::Null => Ok(std::borrow::Cow::Owned(vec![])),
        other => {
            let _ = field_name;
            Ok(std::borrow::Cow::Owned(vec![other.clone()]))
        }
    }
}

fn reject_array(v: &Value, field_name: &str) -> Result<()> {
    if matches!(v, Value::List(_)) {
        return Err(schema_err!(
            "field {:?} is not repeated but received an array",
            field_name
        ));
    }
    Ok(())
}
