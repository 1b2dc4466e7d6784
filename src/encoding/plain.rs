//! `PLAIN` value encoding, spec.md §4.5: fixed-width little-endian for
//! numeric types, bit-packed (8 per byte, LSB-first) for booleans,
//! 4-byte little-endian length prefix plus raw bytes for
//! `BYTE_ARRAY`, and raw fixed-width bytes for
//! `FIXED_LEN_BYTE_ARRAY`. Grounded on `parquet2`'s per-type
//! `serialization`/`types` encoders, collapsed into one pair of
//! functions operating on a whole column's worth of [`Value`]s at
//! once (needed for boolean bit-packing, which spans values).

use crate::error::{corrupt_err, schema_err, Result};
use crate::schema::PhysicalType;
use crate::value::Value;

pub fn encode(values: &[Value], physical_type: PhysicalType) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match physical_type {
        PhysicalType::Boolean => {
            for chunk in values.chunks(8) {
                let mut byte = 0u8;
                for (i, v) in chunk.iter().enumerate() {
                    if as_bool(v)? {
                        byte |= 1 << i;
                    }
                }
                out.push(byte);
            }
        }
        PhysicalType::Int32 => {
            for v in values {
                out.extend_from_slice(&as_i32(v)?.to_le_bytes());
            }
        }
        PhysicalType::Int64 => {
            for v in values {
                out.extend_from_slice(&as_i64(v)?.to_le_bytes());
            }
        }
        PhysicalType::Int96 => {
            for v in values {
                for word in as_i96(v)? {
                    out.extend_from_slice(&word.to_le_bytes());
                }
            }
        }
        PhysicalType::Float => {
            for v in values {
                out.extend_from_slice(&as_f32(v)?.to_le_bytes());
            }
        }
        PhysicalType::Double => {
            for v in values {
                out.extend_from_slice(&as_f64(v)?.to_le_bytes());
            }
        }
        PhysicalType::ByteArray => {
            for v in values {
                let bytes = as_bytes(v)?;
                out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                out.extend_from_slice(bytes);
            }
        }
        PhysicalType::FixedLenByteArray => {
            for v in values {
                out.extend_from_slice(as_bytes(v)?);
            }
        }
    }
    Ok(out)
}

pub fn decode(bytes: &[u8], physical_type: PhysicalType, type_length: Option<i32>, count: usize) -> Result<Vec<Value>> {
    let mut out = Vec::with_capacity(count);
    let mut pos = 0usize;
    match physical_type {
        PhysicalType::Boolean => {
            for i in 0..count {
                let byte = *bytes.get(i / 8).ok_or_else(too_short)?;
                out.push(Value::Boolean((byte >> (i % 8)) & 1 == 1));
            }
        }
        PhysicalType::Int32 => {
            for _ in 0..count {
                let word = take::<4>(bytes, &mut pos)?;
                out.push(Value::Int32(i32::from_le_bytes(word)));
            }
        }
        PhysicalType::Int64 => {
            for _ in 0..count {
                let word = take::<8>(bytes, &mut pos)?;
                out.push(Value::Int64(i64::from_le_bytes(word)));
            }
        }
        PhysicalType::Int96 => {
            for _ in 0..count {
                let mut words = [0u32; 3];
                for w in &mut words {
                    *w = u32::from_le_bytes(take::<4>(bytes, &mut pos)?);
                }
                out.push(Value::Int96(words));
            }
        }
        PhysicalType::Float => {
            for _ in 0..count {
                let word = take::<4>(bytes, &mut pos)?;
                out.push(Value::Float(f32::from_le_bytes(word)));
            }
        }
        PhysicalType::Double => {
            for _ in 0..count {
                let word = take::<8>(bytes, &mut pos)?;
                out.push(Value::Double(f64::from_le_bytes(word)));
            }
        }
        PhysicalType::ByteArray => {
            for _ in 0..count {
                let len = u32::from_le_bytes(take::<4>(bytes, &mut pos)?) as usize;
                let slice = bytes.get(pos..pos + len).ok_or_else(too_short)?;
                pos += len;
                out.push(Value::Bytes(slice.to_vec()));
            }
        }
        PhysicalType::FixedLenByteArray => {
            let len = type_length.ok_or_else(|| corrupt_err!("FIXED_LEN_BYTE_ARRAY column has no typeLength"))? as usize;
            for _ in 0..count {
                let slice = bytes.get(pos..pos + len).ok_or_else(too_short)?;
                pos += len;
                out.push(Value::FixedLenBytes(slice.to_vec()));
            }
        }
    }
    Ok(out)
}

fn too_short() -> crate::error::Error {
    corrupt_err!("PLAIN-encoded page ended before its declared value count")
}

fn take<const N: usize>(bytes: &[u8], pos: &mut usize) -> Result<[u8; N]> {
    let slice = bytes.get(*pos..*pos + N).ok_or_else(too_short)?;
    *pos += N;
    Ok(slice.try_into().unwrap())
}

fn as_bool(v: &Value) -> Result<bool> {
    match v {
        Value::Boolean(b) => Ok(*b),
        other => Err(schema_err!("expected a boolean value, found {:?}", other)),
    }
}

fn as_i32(v: &Value) -> Result<i32> {
    match v {
        Value::Int32(x) => Ok(*x),
        other => Err(schema_err!("expected an int32 value, found {:?}", other)),
    }
}

fn as_i64(v: &Value) -> Result<i64> {
    match v {
        Value::Int64(x) => Ok(*x),
        other => Err(schema_err!("expected an int64 value, found {:?}", other)),
    }
}

fn as_i96(v: &Value) -> Result<[u32; 3]> {
    match v {
        Value::Int96(x) => Ok(*x),
        other => Err(schema_err!("expected an int96 value, found {:?}", other)),
    }
}

fn as_f32(v: &Value) -> Result<f32> {
    match v {
        Value::Float(x) => Ok(*x),
        other => Err(schema_err!("expected a float value, found {:?}", other)),
    }
}

fn as_f64(v: &Value) -> Result<f64> {
    match v {
        Value::Double(x) => Ok(*x),
        other => Err(schema_err!("expected a double value, found {:?}", other)),
    }
}

fn as_bytes(v: &Value) -> Result<&[u8]> {
    match v {
        Value::Bytes(b) | Value::FixedLenBytes(b) => Ok(b),
        other => Err(schema_err!("expected a byte array value, found {:?}", other)),
    }
}
