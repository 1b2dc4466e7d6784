//! The schema model: spec.md §4.1.

pub mod node;
pub mod thrift;
pub mod types;

pub use node::{group, ColumnDescriptor, FieldDef, Schema, SchemaNode};
pub use types::{Compression, Encoding, LogicalType, PhysicalType, Repetition};
