//! Error types for PageStore
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for PageStore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Store is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Page Errors
    // -------------------------------------------------------------------------
    #[error("Cannot read page {table}.{page}: {reason}")]
    PageUnreadable {
        table: String,
        page: u64,
        reason: String,
    },

    #[error("Page {table}.{page} is not an array of records")]
    PageNotArray { table: String, page: u64 },

    #[error("Page {table}.{page} has a malformed entry (expected {{id, data}})")]
    PageMalformed { table: String, page: u64 },

    #[error("Page {table}.{page} holds id {id} more than once")]
    DuplicateId { table: String, page: u64, id: i64 },

    // -------------------------------------------------------------------------
    // Sequence Errors
    // -------------------------------------------------------------------------
    #[error("Sequence file is not a mapping of table names to integers")]
    SequenceMalformed,

    #[error("Sequence of table '{0}' cannot issue another id")]
    SequenceExhausted(String),

    // -------------------------------------------------------------------------
    // Merge Errors
    // -------------------------------------------------------------------------
    #[error("Cannot insert id {id} into {table}.{page}: id already exists")]
    InsertConflict { table: String, page: u64, id: i64 },

    #[error("Cannot update id {id} in {table}.{page}: id does not exist")]
    UpdateMissing { table: String, page: u64, id: i64 },

    // -------------------------------------------------------------------------
    // Lookup / Decode Errors
    // -------------------------------------------------------------------------
    #[error("Record {id} not found in {table}.{page}")]
    NotFound { table: String, page: u64, id: i64 },

    #[error("Field '{field}' must be {expected} in {record}")]
    FieldRequired {
        field: String,
        expected: &'static str,
        record: String,
    },

    // -------------------------------------------------------------------------
    // Recovery Errors
    // -------------------------------------------------------------------------
    #[error("Backup written by commit cannot be read back by restore")]
    RestoreNotWorking,

    #[error("Restore failed: {0}")]
    Restore(#[from] RestoreError),
}

/// Failures while parsing or replaying `backup.db`
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("Backup is not readable JSON: {0}")]
    Unreadable(String),

    #[error("Backup is not a JSON object")]
    NotAnObject,

    #[error("Backup sequence cannot be turned back into bytes")]
    SequenceToBytes,

    #[error("Backup has no 'data' section")]
    MissingData,

    #[error("Backup 'data' section is not an object")]
    DataNotAnObject,

    #[error("Backup pages of table '{0}' are not an object")]
    TableNotAnObject(String),

    #[error("Backup table '{table}' has a page key '{key}' that is not a number")]
    PageKeyNotANumber { table: String, key: String },

    #[error("Backup page {table}.{page} cannot be turned back into bytes")]
    PageToBytes { table: String, page: u64 },

    #[error("Backed-up sequence is not readable JSON: {0}")]
    SequenceUnreadable(String),

    #[error("Backed-up sequence cannot be written: {0}")]
    SequenceWrite(String),

    #[error("Backed-up page {table}.{page} is not readable JSON: {content}")]
    PageUnreadable {
        table: String,
        page: u64,
        content: String,
    },

    #[error("Backed-up page {table}.{page} cannot be written: {reason}")]
    PageWrite {
        table: String,
        page: u64,
        reason: String,
    },
}
