//! The in-memory record representation the shredder consumes and the
//! assembler produces. spec.md does not fix a host-language record
//! shape ("arbitrary nested records"); this crate fixes one concretely,
//! grounded on the shape `parquet2::schema::types::PhysicalType`
//! enumerates plus an ordered-group/list wrapper for nesting.

use std::collections::BTreeMap;

/// One field or element of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Int96([u32; 3]),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    FixedLenBytes(Vec<u8>),
    /// An ordered group of named fields (a struct / Parquet group).
    Group(BTreeMap<String, Value>),
    /// A repeated field's contents. An absent repeated field is
    /// [`Value::Null`], not an empty `List` — spec.md §9 canonicalizes
    /// "zero-length repeated" and "absent" to the same observable state,
    /// so callers assemble either one as `Null`. A present-but-empty
    /// list round-trips through this crate as `Null` too.
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_group(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Group(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn group(fields: impl IntoIterator<Item = (&'static str, Value)>) -> Self {
        Value::Group(fields.into_iter().map(|(k, v)| (k.to_owned(), v)).collect())
    }

    pub fn utf8(s: impl Into<String>) -> Self {
        Value::Bytes(s.into().into_bytes())
    }

    pub fn as_utf8(&self) -> Option<&str> {
        match self {
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }
}
