#![forbid(unsafe_code)]
//! Core of a Parquet columnar-storage library: a schema model, a
//! Dremel shredder, a Dremel assembler, and the page/column-chunk/file
//! codec layer that connects them.

#[macro_use]
pub mod error;
pub mod assemble;
pub mod compression;
pub mod encoding;
pub mod metadata;
pub mod page;
pub mod reader;
pub mod schema;
pub mod shred;
pub mod statistics;
pub mod value;
pub mod writer;

pub use error::{Error, Result};
pub use reader::FileReader;
pub use schema::{FieldDef, Schema};
pub use value::Value;
pub use writer::{FileWriter, WriteOptions};
