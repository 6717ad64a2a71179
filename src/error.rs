//! Error types for JournalKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using JournalError
pub type Result<T> = std::result::Result<T, JournalError>;

/// Unified error type for JournalKV operations
#[derive(Debug, Error)]
pub enum JournalError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Invalid journal header: {0}")]
    InvalidHeader(String),

    #[error("Unsupported journal format version: {0}")]
    UnsupportedVersion(u16),

    #[error("Journal writer failed: {0}")]
    WriterFailed(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Write queue is closed")]
    QueueClosed,

    #[error("Write queue worker panicked")]
    WriterPanicked,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<tempfile::PersistError> for JournalError {
    fn from(err: tempfile::PersistError) -> Self {
        JournalError::Io(err.error)
    }
}
