//! Column data types for pagecask
//!
//! The engine supports exactly two column types: 32-bit integers and
//! length-bounded byte strings. The schema is the sole authority for how
//! values of these types are laid out on disk.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric code for INT in `.schema` files.
pub const TYPE_CODE_INT: u8 = 0;
/// Numeric code for VARCHAR in `.schema` files.
pub const TYPE_CODE_VARCHAR: u8 = 1;

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 32-bit little-endian integer
    Int,
    /// Variable-length byte string with a declared maximum payload size
    Varchar(usize),
}

impl DataType {
    /// Declared byte length: 4 for INT, the maximum payload size for VARCHAR.
    pub fn length(&self) -> usize {
        match self {
            DataType::Int => 4,
            DataType::Varchar(n) => *n,
        }
    }

    /// Numeric code used in `.schema` files.
    pub fn type_code(&self) -> u8 {
        match self {
            DataType::Int => TYPE_CODE_INT,
            DataType::Varchar(_) => TYPE_CODE_VARCHAR,
        }
    }

    /// Reconstruct a type from its `.schema` file code and declared length.
    pub fn from_code(code: u8, length: usize) -> Result<Self> {
        match code {
            TYPE_CODE_INT => Ok(DataType::Int),
            TYPE_CODE_VARCHAR => Ok(DataType::Varchar(length)),
            other => Err(Error::UnsupportedTypeCode(other)),
        }
    }

    /// Parse a type label as it appears in the statement tree:
    /// `"INT"` or `"VARCHAR(N)"` with a positive `N`.
    pub fn parse_label(label: &str) -> Result<Self> {
        if label == "INT" {
            return Ok(DataType::Int);
        }
        if let Some(n) = label
            .strip_prefix("VARCHAR(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let n: usize = n
                .trim()
                .parse()
                .map_err(|_| Error::MalformedTypeLabel(label.to_string()))?;
            if n == 0 {
                return Err(Error::MalformedTypeLabel(label.to_string()));
            }
            return Ok(DataType::Varchar(n));
        }
        Err(Error::MalformedTypeLabel(label.to_string()))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "INT"),
            DataType::Varchar(n) => write!(f, "VARCHAR({})", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_length() {
        assert_eq!(DataType::Int.length(), 4);
        assert_eq!(DataType::Varchar(16).length(), 16);
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(DataType::parse_label("INT").unwrap(), DataType::Int);
        assert_eq!(
            DataType::parse_label("VARCHAR(32)").unwrap(),
            DataType::Varchar(32)
        );

        assert!(DataType::parse_label("VARCHAR(0)").is_err());
        assert!(DataType::parse_label("VARCHAR(x)").is_err());
        assert!(DataType::parse_label("TEXT").is_err());
        assert!(DataType::parse_label("int").is_err());
    }

    #[test]
    fn test_code_round_trip() {
        for dt in [DataType::Int, DataType::Varchar(100)] {
            assert_eq!(DataType::from_code(dt.type_code(), dt.length()).unwrap(), dt);
        }
        assert!(DataType::from_code(7, 4).is_err());
    }
}
