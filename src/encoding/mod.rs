//! Low-level byte codecs: spec.md §4.4 (level encoding) and §4.5
//! (value encoding).

pub mod bitpacking;
pub mod hybrid_rle;
pub mod plain;
pub mod uleb128;
