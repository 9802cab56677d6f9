//! Schema definitions for pagecask
//!
//! A table schema is an ordered list of typed columns. The first column is
//! the *index column*: its value drives the table's hash bucket index.
//! Schemas are persisted as small text files next to the table data
//! (one `<table>.schema` per table).

use super::types::DataType;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;

/// Column definition in a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: DataType,
}

impl Column {
    /// Create a new column
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Table schema - the ordered sequence of columns of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    columns: Vec<Column>,
}

impl TableSchema {
    /// Create a schema from a list of columns.
    ///
    /// Fails on an empty column list and on duplicate column names.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::InvalidSchema("a table needs at least one column".to_string()));
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(Error::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Self { columns })
    }

    /// Get all columns
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get column by index
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// The index column: always the first column of the schema.
    pub fn index_column(&self) -> &Column {
        &self.columns[0]
    }

    /// Get column names in schema order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Encode to the `.schema` file format: a column-count line followed by
    /// one `name type_code length` line per column.
    pub fn to_schema_file(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.columns.len());
        for column in &self.columns {
            let _ = writeln!(
                out,
                "{} {} {}",
                column.name,
                column.data_type.type_code(),
                column.data_type.length()
            );
        }
        out
    }

    /// Decode the `.schema` file format produced by [`to_schema_file`].
    ///
    /// [`to_schema_file`]: TableSchema::to_schema_file
    pub fn from_schema_file(text: &str) -> Result<Self> {
        let mut tokens = text.split_whitespace();
        let count: usize = tokens
            .next()
            .ok_or_else(|| Error::InvalidSchema("empty schema file".to_string()))?
            .parse()
            .map_err(|_| Error::InvalidSchema("bad column count".to_string()))?;

        let mut columns = Vec::with_capacity(count);
        for _ in 0..count {
            let name = tokens
                .next()
                .ok_or_else(|| Error::InvalidSchema("truncated schema file".to_string()))?;
            let code: u8 = tokens
                .next()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| Error::InvalidSchema("bad type code".to_string()))?;
            let length: usize = tokens
                .next()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| Error::InvalidSchema("bad column length".to_string()))?;
            columns.push(Column::new(name, DataType::from_code(code, length)?));
        }
        Self::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_schema() -> TableSchema {
        TableSchema::new(vec![
            Column::new("id", DataType::Int),
            Column::new("name", DataType::Varchar(16)),
        ])
        .unwrap()
    }

    #[test]
    fn test_schema_lookup() {
        let schema = users_schema();
        assert_eq!(schema.column_count(), 2);
        assert_eq!(schema.column_index("name"), Some(1));
        assert_eq!(schema.column_index("missing"), None);
        assert_eq!(schema.index_column().name, "id");
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = TableSchema::new(vec![
            Column::new("a", DataType::Int),
            Column::new("a", DataType::Varchar(8)),
        ]);
        assert!(matches!(result, Err(Error::DuplicateColumn(name)) if name == "a"));
    }

    #[test]
    fn test_empty_schema_rejected() {
        assert!(TableSchema::new(Vec::new()).is_err());
    }

    #[test]
    fn test_schema_file_round_trip() {
        let schema = users_schema();
        let text = schema.to_schema_file();
        assert_eq!(text, "2\nid 0 4\nname 1 16\n");
        assert_eq!(TableSchema::from_schema_file(&text).unwrap(), schema);
    }

    #[test]
    fn test_schema_file_errors() {
        assert!(TableSchema::from_schema_file("").is_err());
        assert!(TableSchema::from_schema_file("1\nid 0").is_err());
        assert!(TableSchema::from_schema_file("1\nid 9 4").is_err());
    }
}
