//! Per-column statistics accumulated while shredding, per spec.md
//! §4.7: null count, distinct count, and min/max over the non-null
//! values actually written. Grounded on
//! `parquet2::statistics::PrimitiveStatistics` (one builder per
//! physical type there; this crate keeps a single builder that
//! switches on [`PhysicalType`] since `Value` is already a closed
//! dynamically-typed enum).
//!
//! Open question (spec.md §9): whether distinct_count is advisory or
//! required. This crate always computes it exactly from the values
//! seen in the row group being built, so it is never left `None`.

use crate::schema::PhysicalType;
use crate::value::Value;
use std::collections::HashSet;

/// Byte-ordered comparison key for a value, used both for min/max
/// tracking and for distinct counting. Mirrors the ordering PLAIN
/// encoding plus unsigned byte comparison gives each physical type:
/// signed integers and floats are compared numerically, byte arrays
/// lexicographically.
fn sort_key(value: &Value) -> Vec<u8> {
    match value {
        Value::Boolean(b) => vec![*b as u8],
        Value::Int32(v) => ((*v as u32) ^ (1 << 31)).to_be_bytes().to_vec(),
        Value::Int64(v) => ((*v as u64) ^ (1 << 63)).to_be_bytes().to_vec(),
        Value::Int96(v) => v.iter().flat_map(|w| w.to_be_bytes()).collect(),
        Value::Float(v) => float_sort_key(v.to_bits() as u64, 32),
        Value::Double(v) => float_sort_key(v.to_bits(), 64),
        Value::Bytes(b) | Value::FixedLenBytes(b) => b.clone(),
        Value::Null | Value::Group(_) | Value::List(_) => {
            unreachable!("statistics only observe leaf scalars")
        }
    }
}

/// Maps an IEEE-754 bit pattern to a big-endian byte sequence that
/// sorts the same way the floating point values themselves do:
/// positive numbers get their sign bit set, negative numbers get every
/// bit flipped (so larger magnitude negatives sort first).
fn float_sort_key(bits: u64, width: u32) -> Vec<u8> {
    let sign_mask = 1u64 << (width - 1);
    let mapped = if bits & sign_mask == 0 {
        bits | sign_mask
    } else {
        !bits & (u64::MAX >> (64 - width))
    };
    mapped.to_be_bytes()[(8 - width / 8) as usize..].to_vec()
}

#[derive(Debug, Clone, Default)]
pub struct StatisticsBuilder {
    null_count: i64,
    distinct: HashSet<Vec<u8>>,
    min: Option<Value>,
    min_key: Vec<u8>,
    max: Option<Value>,
    max_key: Vec<u8>,
}

impl StatisticsBuilder {
    pub fn observe_null(&mut self) {
        self.null_count += 1;
    }

    pub fn observe(&mut self, value: &Value, _physical_type: PhysicalType) {
        let key = sort_key(value);
        self.distinct.insert(key.clone());

        if self.min.is_none() || key < self.min_key {
            self.min_key = key.clone();
            self.min = Some(value.clone());
        }
        if self.max.is_none() || key > self.max_key {
            self.max_key = key;
            self.max = Some(value.clone());
        }
    }

    pub fn finish(&self) -> ColumnStatistics {
        ColumnStatistics {
            null_count: self.null_count,
            distinct_count: self.distinct.len() as i64,
            min: self.min.clone(),
            max: self.max.clone(),
        }
    }
}

/// The finished, immutable statistics for one column chunk, per
/// spec.md §4.7 and §4.8's `ColumnMetaData.statistics`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStatistics {
    pub null_count: i64,
    pub distinct_count: i64,
    pub min: Option<Value>,
    pub max: Option<Value>,
}
