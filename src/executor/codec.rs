//! Schema-aware tuple packing and unpacking
//!
//! Tuples cross the executor boundary as positional strings and are packed
//! into typed bytes at the record-store boundary: INT columns contribute
//! exactly 4 little-endian bytes, VARCHAR columns a u16 LE length prefix
//! followed by that many payload bytes. Records carry no nulls and no type
//! tags; the schema is the exclusive discriminator.

use crate::catalog::{DataType, TableSchema};
use crate::error::{Error, Result};

/// Pack positional string values into record bytes under a schema.
///
/// Missing trailing values pack as 0 / the empty string. VARCHAR payloads
/// longer than the declared column length are truncated.
pub fn pack_record(schema: &TableSchema, values: &[String]) -> Result<Vec<u8>> {
    let mut record = Vec::new();

    for (i, column) in schema.columns().iter().enumerate() {
        let value = values.get(i).map(String::as_str).unwrap_or("");
        match column.data_type {
            DataType::Int => {
                let parsed: i32 = if value.is_empty() {
                    0
                } else {
                    value
                        .trim()
                        .parse()
                        .map_err(|_| Error::InvalidInteger(value.to_string()))?
                };
                record.extend_from_slice(&parsed.to_le_bytes());
            }
            DataType::Varchar(max) => {
                let bytes = value.as_bytes();
                let len = bytes.len().min(max).min(u16::MAX as usize);
                record.extend_from_slice(&(len as u16).to_le_bytes());
                record.extend_from_slice(&bytes[..len]);
            }
        }
    }

    Ok(record)
}

/// Unpack record bytes into positional string values under a schema.
pub fn unpack_record(schema: &TableSchema, record: &[u8]) -> Result<Vec<String>> {
    let mut values = Vec::with_capacity(schema.column_count());
    let mut offset = 0usize;

    for column in schema.columns() {
        match column.data_type {
            DataType::Int => {
                if offset + 4 > record.len() {
                    return Err(Error::SchemaMismatch(column.name.clone()));
                }
                let value = i32::from_le_bytes([
                    record[offset],
                    record[offset + 1],
                    record[offset + 2],
                    record[offset + 3],
                ]);
                values.push(value.to_string());
                offset += 4;
            }
            DataType::Varchar(_) => {
                if offset + 2 > record.len() {
                    return Err(Error::SchemaMismatch(column.name.clone()));
                }
                let len = u16::from_le_bytes([record[offset], record[offset + 1]]) as usize;
                offset += 2;
                if offset + len > record.len() {
                    return Err(Error::SchemaMismatch(column.name.clone()));
                }
                values.push(String::from_utf8_lossy(&record[offset..offset + len]).into_owned());
                offset += len;
            }
        }
    }

    Ok(values)
}
