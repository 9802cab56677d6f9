//! Error types for pagecask
//!
//! This module defines all error types used throughout the engine.

use thiserror::Error;

/// The main error type for pagecask
#[derive(Error, Debug)]
pub enum Error {
    // ========== Storage Preconditions ==========
    #[error("Storage error: storage is not open")]
    StorageNotOpen,

    #[error("Storage error: table '{0}' not found")]
    TableNotFound(String),

    #[error("Storage error: table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("Storage error: record {record_id:#010x} not found in table '{table}'")]
    RecordNotFound { table: String, record_id: u32 },

    #[error("Storage error: slot {slot} out of bounds on page {page} (slot count {slot_count})")]
    SlotOutOfBounds { page: u16, slot: u16, slot_count: u16 },

    #[error("Storage error: invalid record id {0:#010x}")]
    InvalidRecordId(u32),

    // ========== Capacity ==========
    #[error("Storage error: page {0} has no room for the updated record")]
    PageFull(u16),

    #[error("Storage error: table '{0}' exceeds the page addressing limit")]
    TableFull(String),

    #[error("Storage error: record of {0} bytes does not fit in a page")]
    RecordTooLarge(usize),

    // ========== Corruption ==========
    #[error("Corruption: record at page {page} offset {offset} overflows the page")]
    RecordOverflowsPage { page: u16, offset: u16 },

    #[error("Corruption: {0}")]
    Corrupted(String),

    // ========== Schema Errors ==========
    #[error("Schema error: duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("Schema error: {0}")]
    InvalidSchema(String),

    #[error("Schema error: record too short for column '{0}'")]
    SchemaMismatch(String),

    #[error("Schema error: unsupported type code {0}")]
    UnsupportedTypeCode(u8),

    #[error("Schema error: malformed type label '{0}'")]
    MalformedTypeLabel(String),

    // ========== Parse Errors ==========
    #[error("Parse error: unknown statement")]
    UnknownStatement,

    #[error("Parse error: {0}")]
    Parse(String),

    // ========== Executor Errors ==========
    #[error("Execution error: unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Execution error: invalid integer literal '{0}'")]
    InvalidInteger(String),

    #[error("Execution error: {0}")]
    Execution(String),

    // ========== I/O Errors ==========
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for pagecask operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TableNotFound("users".to_string());
        assert_eq!(err.to_string(), "Storage error: table 'users' not found");

        let err = Error::RecordNotFound {
            table: "users".to_string(),
            record_id: 0x0001_0002,
        };
        assert_eq!(
            err.to_string(),
            "Storage error: record 0x00010002 not found in table 'users'"
        );

        let err = Error::MalformedTypeLabel("VARCHAR(x)".to_string());
        assert_eq!(
            err.to_string(),
            "Schema error: malformed type label 'VARCHAR(x)'"
        );
    }
}
